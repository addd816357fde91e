use std::cell::Cell;

use crate::{errors::errors::ErrorImpl, Span};

use super::{
    ast::{Expr, FunctionArena, FunctionId},
    types::{Type, TypeCell},
};

/// Radix an integer literal was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Binary,
    Octal,
    Decimal,
    Hexadecimal,
}

impl Radix {
    pub fn base(&self) -> u32 {
        match self {
            Radix::Binary => 2,
            Radix::Octal => 8,
            Radix::Decimal => 10,
            Radix::Hexadecimal => 16,
        }
    }
}

/// Integer literal, kept as written so any width can be materialized later.
#[derive(Debug, Clone, PartialEq)]
pub struct IntLiteral {
    pub text: String,
    pub radix: Radix,
    pub span: Span,
}

impl IntLiteral {
    pub fn new(text: &str, radix: Radix, span: Span) -> Self {
        IntLiteral {
            text: text.to_string(),
            radix,
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatLiteral {
    pub text: String,
    pub span: Span,
}

impl FloatLiteral {
    pub fn new(text: &str, span: Span) -> Self {
        FloatLiteral {
            text: text.to_string(),
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoolLiteral {
    pub value: bool,
    pub span: Span,
}

impl BoolLiteral {
    pub fn new(value: bool, span: Span) -> Self {
        BoolLiteral { value, span }
    }
}

/// Reference to a named value or callable as written in the source.
#[derive(Debug)]
pub struct Symbol {
    pub name: String,
    pub result_type: TypeCell,
    pub span: Span,
}

impl Symbol {
    pub fn new(name: &str, span: Span) -> Self {
        Symbol {
            name: name.to_string(),
            result_type: TypeCell::unknown(),
            span,
        }
    }
}

/// Function call.
///
/// `callee` is bound by the generator once an overload has been selected.
/// While bound, the call's result type is the callee's result type.
#[derive(Debug)]
pub struct Call {
    pub callee_name: String,
    pub arguments: Vec<Expr>,
    callee: Cell<Option<FunctionId>>,
    result_type: TypeCell,
    pub span: Span,
}

impl Call {
    pub fn new(callee_name: &str, arguments: Vec<Expr>, span: Span) -> Self {
        Call {
            callee_name: callee_name.to_string(),
            arguments,
            callee: Cell::new(None),
            result_type: TypeCell::unknown(),
            span,
        }
    }

    pub fn callee(&self) -> Option<FunctionId> {
        self.callee.get()
    }

    /// Binds the resolved callee. The id must name a definition in `arena`.
    pub fn bind_callee(&self, arena: &FunctionArena, id: FunctionId) -> Result<(), ErrorImpl> {
        if !arena.contains(id) {
            return Err(ErrorImpl::InvalidFunctionReference { id: id.0 });
        }

        self.callee.set(Some(id));
        Ok(())
    }

    pub fn result_type(&self, arena: &FunctionArena) -> Type {
        match self.callee.get().and_then(|id| arena.get(id)) {
            Some(function) => function.function_type.result_type(),
            None => self.result_type.get(),
        }
    }

    /// Records an inferred result type for this call.
    ///
    /// With a bound callee whose result type is still unknown, the type is
    /// pushed onto the callee, so both nodes read the same type afterwards.
    /// Without a callee the call keeps the type itself.
    pub fn set_result_type(&self, arena: &FunctionArena, type_: Type) -> Result<(), ErrorImpl> {
        if type_.is_unknown() {
            return Err(ErrorImpl::InvalidResolution);
        }

        match self.callee.get().and_then(|id| arena.get(id)) {
            Some(function) => {
                if function.function_type.result_type_is_unknown() {
                    function.function_type.result.resolve(type_)?;
                }
                Ok(())
            }
            None => self.result_type.resolve(type_),
        }
    }
}

//! Type system definitions for the AST.
//!
//! This module defines the type system used in the language, including:
//!
//! - Primitive types (integers, floats, booleans, bytes, characters)
//! - Composite types (arrays, function signatures)
//! - The `Unknown` placeholder for types that are inferred later
//! - `TypeCell`, the mutable slot a node keeps its (possibly unresolved) type in
//!
//! Types start out as `Unknown` wherever the source did not annotate them and
//! are resolved in place during code generation. A resolved slot never goes
//! back to `Unknown`.

use std::{cell::RefCell, fmt::Display};

use crate::{errors::errors::ErrorImpl, Span};

/// An AST-level type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Unknown,
    Int,
    Float,
    Bool,
    Byte,
    Char,
    Array(Box<Type>),
    Function(Signature),
    /// A user type name with no machine representation yet.
    Named(String),
}

impl Type {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Unknown => write!(f, "?"),
            Type::Int => write!(f, "Int"),
            Type::Float => write!(f, "Float"),
            Type::Bool => write!(f, "Bool"),
            Type::Byte => write!(f, "Byte"),
            Type::Char => write!(f, "Char"),
            Type::Array(element) => write!(f, "[{}]", element),
            Type::Function(signature) => write!(f, "{}", signature),
            Type::Named(name) => write!(f, "{}", name),
        }
    }
}

/// The value form of a function type: parameter types and the result type.
///
/// Two callables with equal signatures are the same overload.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub parameters: Vec<Type>,
    pub result: Box<Type>,
}

impl Signature {
    pub fn new(parameters: Vec<Type>, result: Type) -> Self {
        Signature {
            parameters,
            result: Box::new(result),
        }
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "func (")?;
        for (i, parameter) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", parameter)?;
        }
        write!(f, ") {}", self.result)
    }
}

/// A type slot owned by a node.
///
/// The only way to change the stored type is `resolve`, which refuses to
/// store `Unknown`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeCell(RefCell<Type>);

impl TypeCell {
    pub fn new(type_: Type) -> Self {
        TypeCell(RefCell::new(type_))
    }

    pub fn unknown() -> Self {
        TypeCell::new(Type::Unknown)
    }

    pub fn get(&self) -> Type {
        self.0.borrow().clone()
    }

    pub fn is_unknown(&self) -> bool {
        self.0.borrow().is_unknown()
    }

    /// Replaces the stored type with `concrete`.
    ///
    /// Re-resolving an already concrete slot overwrites it.
    pub fn resolve(&self, concrete: Type) -> Result<(), ErrorImpl> {
        if concrete.is_unknown() {
            return Err(ErrorImpl::InvalidResolution);
        }

        *self.0.borrow_mut() = concrete;
        Ok(())
    }
}

impl Default for TypeCell {
    fn default() -> Self {
        TypeCell::unknown()
    }
}

/// A named, typed function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub type_: Type,
}

impl Parameter {
    pub fn new(name: &str, type_: Type) -> Self {
        Parameter {
            name: name.to_string(),
            type_,
        }
    }
}

/// Function-type descriptor: ordered parameters plus a result type that may
/// still be `Unknown`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub parameters: Vec<Parameter>,
    pub result: TypeCell,
    pub span: Span,
}

impl FunctionType {
    pub fn new(parameters: Vec<Parameter>, result: Type, span: Span) -> Self {
        FunctionType {
            parameters,
            result: TypeCell::new(result),
            span,
        }
    }

    pub fn result_type(&self) -> Type {
        self.result.get()
    }

    pub fn result_type_is_unknown(&self) -> bool {
        self.result.is_unknown()
    }

    /// Snapshot of the current parameter and result types.
    pub fn signature(&self) -> Signature {
        Signature::new(
            self.parameters.iter().map(|p| p.type_.clone()).collect(),
            self.result.get(),
        )
    }
}

use crate::Span;

use super::{
    ast::{Expr, FunctionArena},
    types::{FunctionType, Type},
};

/// Sequence of expressions whose value is the value of the last one.
#[derive(Debug)]
pub struct Block {
    pub expressions: Vec<Expr>,
    pub span: Span,
}

impl Block {
    pub fn new(expressions: Vec<Expr>, span: Span) -> Self {
        Block { expressions, span }
    }

    pub fn result_type(&self, arena: &FunctionArena) -> Type {
        self.expressions
            .last()
            .map(|expr| expr.result_type(arena))
            .unwrap_or(Type::Unknown)
    }
}

/// Function definition with a body.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub function_type: FunctionType,
    pub body: Block,
    pub span: Span,
}

impl Function {
    pub fn new(name: &str, function_type: FunctionType, body: Block, span: Span) -> Self {
        Function {
            name: name.to_string(),
            function_type,
            body,
            span,
        }
    }
}

/// Declaration of a function defined outside the module (e.g. in libc).
#[derive(Debug)]
pub struct ExternalFunction {
    pub name: String,
    pub function_type: FunctionType,
    pub span: Span,
}

impl ExternalFunction {
    pub fn new(name: &str, function_type: FunctionType, span: Span) -> Self {
        ExternalFunction {
            name: name.to_string(),
            function_type,
            span,
        }
    }
}

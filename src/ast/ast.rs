use std::fmt::Display;

use crate::Position;

use super::{
    expressions::{BoolLiteral, Call, FloatLiteral, IntLiteral, Symbol},
    statements::{Block, ExternalFunction, Function},
    types::{FunctionType, Type},
};

/// Handle to a `Function` stored in a `FunctionArena`.
///
/// Calls refer to their resolved callee through this id, never through a
/// reference, so binding a callee does not tie lifetimes together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub usize);

impl Display for FunctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owner of every function definition in a tree.
#[derive(Debug, Default)]
pub struct FunctionArena {
    functions: Vec<Function>,
}

impl FunctionArena {
    pub fn new() -> Self {
        FunctionArena::default()
    }

    pub fn alloc(&mut self, function: Function) -> FunctionId {
        self.functions.push(function);
        FunctionId(self.functions.len() - 1)
    }

    pub fn get(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.0)
    }

    pub fn contains(&self, id: FunctionId) -> bool {
        id.0 < self.functions.len()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Expression Kinds
///
/// The closed set of node kinds the generator understands. Nested function
/// definitions are stored in the arena and referenced by id.
#[derive(Debug)]
pub enum Expr {
    IntLiteral(IntLiteral),
    FloatLiteral(FloatLiteral),
    BoolLiteral(BoolLiteral),
    Block(Block),
    Call(Call),
    Function(FunctionId),
    ExternalFunction(ExternalFunction),
    FunctionType(FunctionType),
    Symbol(Symbol),
}

impl Expr {
    /// Returns the node's current result type, which may be `Unknown`.
    pub fn result_type(&self, arena: &FunctionArena) -> Type {
        match self {
            Expr::IntLiteral(_) => Type::Int,
            Expr::FloatLiteral(_) => Type::Float,
            Expr::BoolLiteral(_) => Type::Bool,
            Expr::Block(block) => block.result_type(arena),
            Expr::Call(call) => call.result_type(arena),
            Expr::Function(id) => arena
                .get(*id)
                .map(|function| Type::Function(function.function_type.signature()))
                .unwrap_or(Type::Unknown),
            Expr::ExternalFunction(external) => {
                Type::Function(external.function_type.signature())
            }
            Expr::FunctionType(function_type) => Type::Function(function_type.signature()),
            Expr::Symbol(symbol) => symbol.result_type.get(),
        }
    }

    /// Start position of the node, used to place diagnostics.
    pub fn position(&self, arena: &FunctionArena) -> Position {
        let span = match self {
            Expr::IntLiteral(literal) => &literal.span,
            Expr::FloatLiteral(literal) => &literal.span,
            Expr::BoolLiteral(literal) => &literal.span,
            Expr::Block(block) => &block.span,
            Expr::Call(call) => &call.span,
            Expr::Function(id) => match arena.get(*id) {
                Some(function) => &function.span,
                None => return Position::null(),
            },
            Expr::ExternalFunction(external) => &external.span,
            Expr::FunctionType(function_type) => &function_type.span,
            Expr::Symbol(symbol) => &symbol.span,
        };
        span.start.clone()
    }
}

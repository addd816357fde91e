use std::fmt::Display;

use thiserror::Error;

use crate::Position;

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_kind(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::EmptyBlock => "EmptyBlock",
            ErrorImpl::UnresolvedSymbol { .. } => "UnresolvedSymbol",
            ErrorImpl::AmbiguousOverload { .. } => "AmbiguousOverload",
            ErrorImpl::DuplicateSignature { .. } => "DuplicateSignature",
            ErrorImpl::TypeTranslationFailed { .. } => "TypeTranslationFailed",
            ErrorImpl::InvalidResolution => "InvalidResolution",
            ErrorImpl::BackendRejected { .. } => "BackendRejected",
            ErrorImpl::NotCallable { .. } => "NotCallable",
            ErrorImpl::ResultTypeMismatch { .. } => "ResultTypeMismatch",
            ErrorImpl::InvalidFunctionReference { .. } => "InvalidFunctionReference",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::EmptyBlock => ErrorTip::Suggestion(String::from(
                "A block needs at least one expression to produce a value",
            )),
            ErrorImpl::UnresolvedSymbol { symbol, arguments } => ErrorTip::Suggestion(format!(
                "No function `{}` taking {} argument(s) is visible here",
                symbol, arguments
            )),
            ErrorImpl::AmbiguousOverload { symbol, candidates } => ErrorTip::Suggestion(format!(
                "{} overloads of `{}` match equally well",
                candidates, symbol
            )),
            ErrorImpl::DuplicateSignature { function } => ErrorTip::Suggestion(format!(
                "Function `{}` is already declared with this signature",
                function
            )),
            ErrorImpl::TypeTranslationFailed { type_ } => {
                ErrorTip::Suggestion(format!("Type `{}` has no machine representation", type_))
            }
            ErrorImpl::InvalidResolution => ErrorTip::None,
            ErrorImpl::BackendRejected { .. } => ErrorTip::None,
            ErrorImpl::NotCallable { symbol, type_name } => ErrorTip::Suggestion(format!(
                "`{}` is a {} and cannot be called",
                symbol, type_name
            )),
            ErrorImpl::ResultTypeMismatch {
                function,
                expected,
                received,
            } => ErrorTip::Suggestion(format!(
                "Function `{}` declares result `{}` but its body produces `{}`",
                function, expected, received
            )),
            ErrorImpl::InvalidFunctionReference { .. } => ErrorTip::None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.internal_error)
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("empty block")]
    EmptyBlock,
    #[error("unresolved symbol {symbol:?} with {arguments} argument(s)")]
    UnresolvedSymbol { symbol: String, arguments: usize },
    #[error("ambiguous call to {symbol:?}: {candidates} equally good candidates")]
    AmbiguousOverload { symbol: String, candidates: usize },
    #[error("function {function:?} already declared with the same signature")]
    DuplicateSignature { function: String },
    #[error("unable to translate type {type_} to a machine type")]
    TypeTranslationFailed { type_: String },
    #[error("cannot resolve a type to unknown")]
    InvalidResolution,
    #[error("backend rejected: {message}")]
    BackendRejected { message: String },
    #[error("{symbol:?} of type {type_name} is not callable")]
    NotCallable { symbol: String, type_name: String },
    #[error("result type of {function:?} does not match: expected {expected}, received {received}")]
    ResultTypeMismatch {
        function: String,
        expected: String,
        received: String,
    },
    #[error("no function definition with id {id}")]
    InvalidFunctionReference { id: usize },
}

//! Code generation module for the compiler.
//!
//! This module contains the LLVM-based code generator that walks the AST
//! and builds an LLVM module. It handles:
//!
//! - Lexical scopes and overload sets for callables
//! - Overload selection for calls
//! - Type conversion from AST types to LLVM types
//! - Generation of expressions, function definitions and external declarations

pub mod compiler;
pub mod expr;
pub mod overload;
pub mod scope;
pub mod stmt;
pub mod types;

#[cfg(test)]
mod tests;

/// AST (Abstract Syntax Tree) module
/// Contains all definitions related to the AST structure
///
/// Submodules:
/// - ast: The expression node set and the function arena
/// - expressions: Literals, calls and symbol references
/// - statements: Blocks, function definitions and external declarations
/// - types: Type representations, including the `Unknown` placeholder
pub mod ast;
pub mod expressions;
pub mod statements;
pub mod types;

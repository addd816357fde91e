//! Error types and error handling for the compiler.
//!
//! This module defines the error types used throughout semantic analysis
//! and code generation. It includes:
//!
//! - Error structures with source position information
//! - Specific error variants for every failure the generator reports
//! - Error formatting and display functionality
//! - Helpful error messages and suggestions

pub mod errors;

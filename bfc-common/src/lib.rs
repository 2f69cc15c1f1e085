//! Brainfuck-to-Spool Compiler - Common Types and Utilities
//!
//! This crate contains the shared types used across all components of the
//! compiler: source coordinates and the cross-phase error type.

pub mod error;
pub mod source_loc;

pub use error::CompilerError;
pub use source_loc::Loc;

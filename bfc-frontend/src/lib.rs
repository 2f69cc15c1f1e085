//! Brainfuck-to-Spool Compiler - Frontend
//!
//! This crate provides the frontend components of the compiler:
//! - Grid: the source text as a 2-D character grid
//! - Parser: bracket matching and AST construction
//! - AST: instruction kinds and node definitions
//! - Visitor: the generic traversal protocol backends implement
//! - Formatter: renders an AST back to the eight-symbol notation

pub mod ast;
pub mod formatter;
pub mod grid;
pub mod parser;
pub mod visitor;

pub use ast::{Kind, LoopNode, Node};
pub use grid::CharGrid;
pub use parser::{parse, SyntaxError};
pub use visitor::{visit_program, walk, Visitor};

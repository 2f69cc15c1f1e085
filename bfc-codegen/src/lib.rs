//! Brainfuck-to-Spool Compiler - Model-Based Code Generation
//!
//! This crate lowers a parsed node tree into a Spool artifact. The numeric
//! domain of a tape cell, the source and sink of code points, and the tape
//! itself are pluggable models; the driver walks the tree through the
//! visitor protocol and asks the chosen tape model for the instruction
//! sequence of each construct. Every loop compiles into its own
//! head/body procedure pair, so generated procedures stay small no matter
//! how deep the nesting goes.

pub mod driver;
pub mod model;

pub use driver::ModelCompiler;
pub use model::{
    argument_io, interactive_io, select_cell, CellModel, IoModel, TapeModel, UnboundedTape,
};

use bfc_common::CompilerError;
use bfc_frontend::{visit_program, Node};
use spool_asm::{Artifact, AsmError, Assembler};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// How the generated program performs input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    /// Code points come from the program's command-line arguments
    Argument,
    /// Code points are read from the live input stream
    Interactive,
}

/// The configuration surface the CLI supplies
#[derive(Debug, Clone)]
pub struct CompileConfig {
    pub cell_min: i64,
    pub cell_max: i64,
    pub eof: i32,
    pub io: IoMode,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            cell_min: i64::MIN,
            cell_max: i64::MAX,
            eof: 0,
            io: IoMode::Argument,
        }
    }
}

/// Compile a parsed program into a Spool artifact
pub fn compile(nodes: &[Node], config: &CompileConfig) -> Result<Artifact, CompilerError> {
    let mut asm = Assembler::new();

    let cell = select_cell(config.cell_min, config.cell_max);
    let io = match config.io {
        IoMode::Argument => argument_io(&mut asm, config.eof)?,
        IoMode::Interactive => interactive_io(&mut asm, config.eof)?,
    };
    let tape = UnboundedTape::new(&mut asm, cell, io)?;

    let entry = asm.begin_proc("main").map_err(asm_err)?;
    asm.set_entry(entry);

    let ctx = Rc::new(driver::CompileCtx {
        asm: RefCell::new(asm),
        model: Box::new(tape),
        loop_index: Cell::new(0),
    });
    let mut root = ModelCompiler::new(Rc::clone(&ctx), entry);
    visit_program(&mut root, nodes)?;
    drop(root);

    let ctx = Rc::try_unwrap(ctx)
        .map_err(|_| CompilerError::codegen("internal: compile context still shared"))?;
    ctx.asm.into_inner().finish().map_err(asm_err)
}

pub(crate) fn asm_err(err: AsmError) -> CompilerError {
    CompilerError::codegen(err.to_string())
}

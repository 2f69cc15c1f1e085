//! Spool VM assembler
//!
//! The Spool VM is a small stack machine: a shared operand stack, per-frame
//! local slots, artifact-scoped global slots, growable value lists, named
//! procedures, and a handful of I/O primitives. This crate defines the
//! instruction set, an assembler that builds procedures (several may be
//! open at once) with label resolution, and the binary artifact format.

pub mod artifact;
pub mod assembler;
pub mod error;
pub mod inst;

pub use artifact::{Artifact, GlobalDecl, Init, Proc};
pub use assembler::{Assembler, ProcBody};
pub use error::AsmError;
pub use inst::{Cond, GlobalId, Inst, LabelRef, ProcId};

//! Assembler and artifact errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AsmError {
    #[error("duplicate global slot '{name}'")]
    DuplicateGlobal { name: String },

    #[error("duplicate procedure '{name}'")]
    DuplicateProc { name: String },

    #[error("procedure '{name}': label {label} was never bound")]
    UnboundLabel { name: String, label: u32 },

    #[error("procedure '{name}' was never finished")]
    UnfinishedProc { name: String },

    #[error("procedure '{name}' finished twice")]
    AlreadyFinished { name: String },

    #[error("no entry procedure was declared")]
    MissingEntry,

    #[error("malformed artifact at byte {offset}: {message}")]
    Malformed { offset: usize, message: String },
}

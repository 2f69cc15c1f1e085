//! Error handling for the Brainfuck-to-Spool compiler
//!
//! This module defines the error type shared by all compilation phases.
//! There is no recovery path: every variant aborts the compilation.

use crate::source_loc::Loc;
use thiserror::Error;

/// Main compiler error type that encompasses all phases of compilation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilerError {
    /// Unbalanced brackets. Carries every offending location and a
    /// caret-annotated rendering of the source.
    #[error("Syntax error: {message}\n{rendering}")]
    Syntax {
        message: String,
        locations: Vec<Loc>,
        rendering: String,
    },

    #[error("Code generation error: {message}")]
    Codegen { message: String },

    #[error("IO error: {message}")]
    Io { message: String },
}

impl CompilerError {
    pub fn codegen(message: impl Into<String>) -> Self {
        CompilerError::Codegen {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CompilerError {
    fn from(err: std::io::Error) -> Self {
        CompilerError::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let err = CompilerError::Syntax {
            message: "Unbalanced brackets".to_string(),
            locations: vec![Loc::new(0, 0)],
            rendering: "[\n^\n".to_string(),
        };
        let text = format!("{}", err);
        assert!(text.contains("Unbalanced brackets"));
        assert!(text.contains('^'));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.bf");
        let err: CompilerError = io.into();
        assert!(matches!(err, CompilerError::Io { .. }));
    }
}

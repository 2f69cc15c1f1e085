//! AST definitions for the eight-symbol notation
//!
//! Loops nest; everything else is a leaf carrying its source location.
//! `[` and `]` are structural and never appear as leaf kinds.

use bfc_common::Loc;
use serde::{Deserialize, Serialize};

/// The six simple instruction kinds, each mapped from one source character.
/// Every other character is a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kind {
    /// `>`: move the pointer right
    Advance,
    /// `<`: move the pointer left
    Retreat,
    /// `+`: increment the current cell
    Increment,
    /// `-`: decrement the current cell
    Decrement,
    /// `,`: read one code point into the current cell
    Input,
    /// `.`: write the current cell as a code point
    Output,
}

impl Kind {
    pub fn from_char(ch: char) -> Option<Kind> {
        match ch {
            '>' => Some(Kind::Advance),
            '<' => Some(Kind::Retreat),
            '+' => Some(Kind::Increment),
            '-' => Some(Kind::Decrement),
            ',' => Some(Kind::Input),
            '.' => Some(Kind::Output),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Kind::Advance => '>',
            Kind::Retreat => '<',
            Kind::Increment => '+',
            Kind::Decrement => '-',
            Kind::Input => ',',
            Kind::Output => '.',
        }
    }
}

/// A loop: `[` ... `]` with its body in source order.
///
/// `end` is populated once the matching `]` is seen; after a successful
/// parse it is always present. An empty body is legal syntax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopNode {
    pub start: Loc,
    pub end: Option<Loc>,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Simple { loc: Loc, kind: Kind },
    Loop(LoopNode),
}

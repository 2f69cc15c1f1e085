//! Source location tracking for error reporting
//!
//! Brainfuck sources are treated as a 2-D character grid, so a location is
//! a (column, row) pair into that grid rather than a byte offset.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A coordinate in the source grid (column and row are 0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Loc {
    pub col: u32,
    pub row: u32,
}

impl Loc {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 1-based for humans, matching editor conventions
        write!(f, "{}:{}", self.row + 1, self.col + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loc_display() {
        let loc = Loc::new(4, 0);
        assert_eq!(format!("{}", loc), "1:5");
    }

    #[test]
    fn test_loc_equality() {
        assert_eq!(Loc::new(2, 3), Loc::new(2, 3));
        assert_ne!(Loc::new(3, 2), Loc::new(2, 3));
    }
}

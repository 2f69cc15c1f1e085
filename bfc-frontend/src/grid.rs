//! The source text as a 2-D character grid
//!
//! Locations are (column, row) coordinates into this grid. The grid is used
//! both for row-major iteration during parsing and for rendering
//! caret-annotated excerpts in syntax errors.

use bfc_common::Loc;

pub struct CharGrid {
    rows: Vec<Vec<char>>,
    /// length of the longest row
    width: usize,
}

impl CharGrid {
    /// Build a grid from raw source text. Line endings are normalized by
    /// stripping carriage returns before splitting on newlines.
    pub fn new(source: &str) -> Self {
        let normalized = source.replace('\r', "");
        let rows: Vec<Vec<char>> = normalized.split('\n').map(|r| r.chars().collect()).collect();
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        Self { rows, width }
    }

    pub fn get(&self, col: usize, row: usize) -> Option<char> {
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Row-major, column-major-within-row iteration over every character
    pub fn cells(&self) -> impl Iterator<Item = (Loc, char)> + '_ {
        self.rows.iter().enumerate().flat_map(|(row, chars)| {
            chars
                .iter()
                .enumerate()
                .map(move |(col, &ch)| (Loc::new(col as u32, row as u32), ch))
        })
    }

    /// Render the source with a `^` under every location matching `flagged`.
    /// A pointer line is emitted only under rows that contain at least one
    /// caret, padded with underscores out to the grid width.
    pub fn annotate(&self, flagged: impl Fn(Loc) -> bool) -> String {
        let mut out = String::new();
        for (row, chars) in self.rows.iter().enumerate() {
            let mut pointers = vec![' '; self.width];
            let mut any = false;
            for col in 0..chars.len() {
                if flagged(Loc::new(col as u32, row as u32)) {
                    pointers[col] = '^';
                    any = true;
                }
            }
            out.extend(chars.iter());
            out.push('\n');
            if any {
                for (col, p) in pointers.iter_mut().enumerate() {
                    if !flagged(Loc::new(col as u32, row as u32)) {
                        *p = '_';
                    }
                }
                out.extend(pointers.iter());
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_grid_shape() {
        let grid = CharGrid::new("+-\n[]]\n");
        assert_eq!(grid.row_count(), 3); // trailing newline yields an empty row
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.get(0, 0), Some('+'));
        assert_eq!(grid.get(2, 1), Some(']'));
        assert_eq!(grid.get(2, 0), None);
    }

    #[test]
    fn test_crlf_normalization() {
        let grid = CharGrid::new("+\r\n-");
        assert_eq!(grid.get(0, 0), Some('+'));
        assert_eq!(grid.get(0, 1), Some('-'));
        assert_eq!(grid.row_count(), 2);
    }

    #[test]
    fn test_cells_are_row_major() {
        let grid = CharGrid::new("ab\nc");
        let cells: Vec<(Loc, char)> = grid.cells().collect();
        assert_eq!(
            cells,
            vec![
                (Loc::new(0, 0), 'a'),
                (Loc::new(1, 0), 'b'),
                (Loc::new(0, 1), 'c'),
            ]
        );
    }

    #[test]
    fn test_annotate_carets_and_padding() {
        let grid = CharGrid::new("[]]\n++");
        let rendering = grid.annotate(|loc| loc == Loc::new(2, 0));
        assert_eq!(rendering, "[]]\n__^\n++\n");
    }

    #[test]
    fn test_annotate_pads_to_grid_width() {
        // caret row is shorter than the widest row; pointers pad out
        let grid = CharGrid::new("]\n++++");
        let rendering = grid.annotate(|loc| loc == Loc::new(0, 0));
        assert_eq!(rendering, "]\n^___\n++++\n");
    }
}

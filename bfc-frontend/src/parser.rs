//! Bracket matching and AST construction
//!
//! Parsing is two O(n) scans over the grid: the first collects every
//! unmatched bracket location, the second (run only when the first found
//! none) builds the node tree with a stack of open scopes.

use crate::ast::{Kind, LoopNode, Node};
use crate::grid::CharGrid;
use bfc_common::{CompilerError, Loc};
use log::debug;
use thiserror::Error;

/// Unbalanced brackets: every offending location plus a caret-annotated
/// rendering of the source.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unbalanced brackets\n{rendering}")]
pub struct SyntaxError {
    pub unmatched: Vec<Loc>,
    pub rendering: String,
}

impl From<SyntaxError> for CompilerError {
    fn from(err: SyntaxError) -> Self {
        CompilerError::Syntax {
            message: "Unbalanced brackets".to_string(),
            locations: err.unmatched.clone(),
            rendering: err.rendering,
        }
    }
}

/// Parse source text into a node tree.
///
/// Fails with a [`SyntaxError`] carrying every unmatched bracket location
/// when the brackets are unbalanced; unrecognized characters are comments
/// and are dropped silently.
pub fn parse(source: &str) -> Result<Vec<Node>, SyntaxError> {
    let grid = CharGrid::new(source);
    bracket_check(&grid)?;
    let nodes = build_tree(&grid);
    debug!("parsed {} top-level nodes", nodes.len());
    Ok(nodes)
}

fn bracket_check(grid: &CharGrid) -> Result<(), SyntaxError> {
    let mut opens: Vec<Loc> = Vec::new();
    let mut failed: Vec<Loc> = Vec::new();
    for (loc, ch) in grid.cells() {
        match ch {
            '[' => opens.push(loc),
            ']' => {
                if opens.pop().is_none() {
                    failed.push(loc);
                }
            }
            _ => {}
        }
    }
    // anything left open is unmatched too
    failed.extend(opens.into_iter().rev());

    if failed.is_empty() {
        Ok(())
    } else {
        let rendering = grid.annotate(|loc| failed.contains(&loc));
        Err(SyntaxError {
            unmatched: failed,
            rendering,
        })
    }
}

/// Second scan; only runs on balanced input, so every `]` closes a loop.
fn build_tree(grid: &CharGrid) -> Vec<Node> {
    let mut scopes: Vec<Vec<Node>> = vec![Vec::new()];
    let mut opens: Vec<Loc> = Vec::new();

    for (loc, ch) in grid.cells() {
        match ch {
            '[' => {
                opens.push(loc);
                scopes.push(Vec::new());
            }
            ']' => {
                if let (Some(body), Some(start)) = (scopes.pop(), opens.pop()) {
                    let node = Node::Loop(LoopNode {
                        start,
                        end: Some(loc),
                        body,
                    });
                    if let Some(scope) = scopes.last_mut() {
                        scope.push(node);
                    }
                }
            }
            other => {
                if let Some(kind) = Kind::from_char(other) {
                    if let Some(scope) = scopes.last_mut() {
                        scope.push(Node::Simple { loc, kind });
                    }
                }
            }
        }
    }

    scopes.pop().unwrap_or_default()
}

//! Renders a node tree back to the eight-symbol notation
//!
//! Comments and layout are not preserved; re-parsing the result yields a
//! structurally identical tree.

use crate::ast::Node;

pub fn format_nodes(nodes: &[Node]) -> String {
    let mut out = String::new();
    write_nodes(&mut out, nodes);
    out
}

fn write_nodes(out: &mut String, nodes: &[Node]) {
    for node in nodes {
        match node {
            Node::Simple { kind, .. } => out.push(kind.to_char()),
            Node::Loop(loop_node) => {
                out.push('[');
                write_nodes(out, &loop_node.body);
                out.push(']');
            }
        }
    }
}

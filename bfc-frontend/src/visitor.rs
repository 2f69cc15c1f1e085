//! The generic traversal protocol
//!
//! Backends implement [`Visitor`]; the traversal itself lives here and
//! knows nothing about code generation. `enter_loop` returns the visitor
//! used for that loop's body - the same one or a new one carrying scoped
//! state - and the returned visitor's `start`/`end` bracket the body.

use crate::ast::{Kind, LoopNode, Node};
use bfc_common::{CompilerError, Loc};

pub trait Visitor: Sized {
    fn start(&mut self) -> Result<(), CompilerError>;

    fn visit_advance(&mut self, loc: Loc) -> Result<(), CompilerError>;

    fn visit_retreat(&mut self, loc: Loc) -> Result<(), CompilerError>;

    fn visit_increment(&mut self, loc: Loc) -> Result<(), CompilerError>;

    fn visit_decrement(&mut self, loc: Loc) -> Result<(), CompilerError>;

    fn visit_input(&mut self, loc: Loc) -> Result<(), CompilerError>;

    fn visit_output(&mut self, loc: Loc) -> Result<(), CompilerError>;

    /// Called at a loop node; returns the visitor that traverses the body
    fn enter_loop(&mut self, node: &LoopNode) -> Result<Self, CompilerError>;

    fn end(&mut self) -> Result<(), CompilerError>;
}

/// Dispatch each node by kind; loops recurse through `enter_loop` with the
/// returned visitor's `start`/`end` around the body.
pub fn walk<V: Visitor>(visitor: &mut V, nodes: &[Node]) -> Result<(), CompilerError> {
    for node in nodes {
        match node {
            Node::Simple { loc, kind } => match kind {
                Kind::Advance => visitor.visit_advance(*loc)?,
                Kind::Retreat => visitor.visit_retreat(*loc)?,
                Kind::Increment => visitor.visit_increment(*loc)?,
                Kind::Decrement => visitor.visit_decrement(*loc)?,
                Kind::Input => visitor.visit_input(*loc)?,
                Kind::Output => visitor.visit_output(*loc)?,
            },
            Node::Loop(loop_node) => {
                let mut inner = visitor.enter_loop(loop_node)?;
                inner.start()?;
                walk(&mut inner, &loop_node.body)?;
                inner.end()?;
            }
        }
    }
    Ok(())
}

/// Traverse a whole program: the root visitor's `start`, the node list,
/// then its `end`.
pub fn visit_program<V: Visitor>(visitor: &mut V, nodes: &[Node]) -> Result<(), CompilerError> {
    visitor.start()?;
    walk(visitor, nodes)?;
    visitor.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records traversal events, tagging each with its nesting depth
    struct Tracer {
        depth: usize,
        events: Rc<RefCell<Vec<String>>>,
    }

    impl Tracer {
        fn log(&self, text: &str) {
            self.events.borrow_mut().push(format!("{}{}", self.depth, text));
        }
    }

    impl Visitor for Tracer {
        fn start(&mut self) -> Result<(), CompilerError> {
            self.log("start");
            Ok(())
        }

        fn visit_advance(&mut self, _loc: Loc) -> Result<(), CompilerError> {
            self.log(">");
            Ok(())
        }

        fn visit_retreat(&mut self, _loc: Loc) -> Result<(), CompilerError> {
            self.log("<");
            Ok(())
        }

        fn visit_increment(&mut self, _loc: Loc) -> Result<(), CompilerError> {
            self.log("+");
            Ok(())
        }

        fn visit_decrement(&mut self, _loc: Loc) -> Result<(), CompilerError> {
            self.log("-");
            Ok(())
        }

        fn visit_input(&mut self, _loc: Loc) -> Result<(), CompilerError> {
            self.log(",");
            Ok(())
        }

        fn visit_output(&mut self, _loc: Loc) -> Result<(), CompilerError> {
            self.log(".");
            Ok(())
        }

        fn enter_loop(&mut self, _node: &LoopNode) -> Result<Self, CompilerError> {
            self.log("loop");
            Ok(Tracer {
                depth: self.depth + 1,
                events: Rc::clone(&self.events),
            })
        }

        fn end(&mut self) -> Result<(), CompilerError> {
            self.log("end");
            Ok(())
        }
    }

    #[test]
    fn test_loop_body_uses_the_returned_visitor() {
        let nodes = parse("+[>-]<").unwrap();
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut tracer = Tracer {
            depth: 0,
            events: Rc::clone(&events),
        };
        visit_program(&mut tracer, &nodes).unwrap();
        assert_eq!(
            *events.borrow(),
            vec![
                "0start", "0+", "0loop", "1start", "1>", "1-", "1end", "0<", "0end"
            ]
        );
    }

    #[test]
    fn test_nested_loops_nest_visitors() {
        let nodes = parse("[[]]").unwrap();
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut tracer = Tracer {
            depth: 0,
            events: Rc::clone(&events),
        };
        visit_program(&mut tracer, &nodes).unwrap();
        assert_eq!(
            *events.borrow(),
            vec![
                "0start", "0loop", "1start", "1loop", "2start", "2end", "1end", "0end"
            ]
        );
    }
}

//! The model-based code generation driver
//!
//! Implements the visitor protocol against a tape model. Straight-line
//! instructions go to the current emission target; each loop gets a fresh
//! index from the shared counter and compiles into two procedures of its
//! own - `loop<n>`, the test-and-call head, and `loop<n>_body` - so every
//! generated procedure stays small regardless of program size or nesting
//! depth, and no jump offset ever spans a nested structure.

use crate::asm_err;
use crate::model::TapeModel;
use bfc_common::{CompilerError, Loc};
use bfc_frontend::{LoopNode, Visitor};
use log::trace;
use spool_asm::{Assembler, Inst, ProcId};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// State shared by every compiler in one compilation: the assembler, the
/// chosen model, and the monotonically increasing loop index.
pub struct CompileCtx {
    pub asm: RefCell<Assembler>,
    pub model: Box<dyn TapeModel>,
    pub loop_index: Cell<u32>,
}

/// One emission scope. The root compiler targets the entry procedure; each
/// loop gets a child compiler targeting that loop's body procedure.
pub struct ModelCompiler {
    ctx: Rc<CompileCtx>,
    target: ProcId,
    /// the loop-head procedure, absent only on the root
    head: Option<ProcId>,
}

impl ModelCompiler {
    pub fn new(ctx: Rc<CompileCtx>, entry: ProcId) -> Self {
        Self {
            ctx,
            target: entry,
            head: None,
        }
    }

    fn next_loop_index(&self) -> u32 {
        let n = self.ctx.loop_index.get() + 1;
        self.ctx.loop_index.set(n);
        n
    }
}

impl Visitor for ModelCompiler {
    /// The root emits the program preamble. A loop compiler emits its
    /// entire head procedure: test the current cell, call the body while
    /// it is non-zero, return once it hits zero.
    fn start(&mut self) -> Result<(), CompilerError> {
        let mut asm = self.ctx.asm.borrow_mut();
        match self.head {
            None => {
                self.ctx.model.emit_init(asm.proc_mut(self.target));
            }
            Some(head) => {
                let f = asm.proc_mut(head);
                let top = f.new_label();
                let exit = f.new_label();
                f.bind(top);
                self.ctx.model.emit_get(f);
                self.ctx.model.cell().emit_is_zero(f, exit);
                f.emit(Inst::Call(self.target));
                f.emit(Inst::Jump(top));
                f.bind(exit);
                f.emit(Inst::Ret);
                asm.finish_proc(head).map_err(asm_err)?;
            }
        }
        Ok(())
    }

    fn visit_advance(&mut self, _loc: Loc) -> Result<(), CompilerError> {
        let mut asm = self.ctx.asm.borrow_mut();
        self.ctx.model.emit_advance(asm.proc_mut(self.target));
        Ok(())
    }

    fn visit_retreat(&mut self, _loc: Loc) -> Result<(), CompilerError> {
        let mut asm = self.ctx.asm.borrow_mut();
        self.ctx.model.emit_retreat(asm.proc_mut(self.target));
        Ok(())
    }

    fn visit_increment(&mut self, _loc: Loc) -> Result<(), CompilerError> {
        let mut asm = self.ctx.asm.borrow_mut();
        self.ctx.model.emit_increment(asm.proc_mut(self.target));
        Ok(())
    }

    fn visit_decrement(&mut self, _loc: Loc) -> Result<(), CompilerError> {
        let mut asm = self.ctx.asm.borrow_mut();
        self.ctx.model.emit_decrement(asm.proc_mut(self.target));
        Ok(())
    }

    fn visit_input(&mut self, _loc: Loc) -> Result<(), CompilerError> {
        let mut asm = self.ctx.asm.borrow_mut();
        self.ctx.model.emit_input(asm.proc_mut(self.target));
        Ok(())
    }

    fn visit_output(&mut self, _loc: Loc) -> Result<(), CompilerError> {
        let mut asm = self.ctx.asm.borrow_mut();
        self.ctx.model.emit_output(asm.proc_mut(self.target));
        Ok(())
    }

    /// Allocate the loop's index, call its not-yet-written head from the
    /// current target, open the head/body pair, and hand back a compiler
    /// bound to the body.
    fn enter_loop(&mut self, _node: &LoopNode) -> Result<Self, CompilerError> {
        let n = self.next_loop_index();
        let mut asm = self.ctx.asm.borrow_mut();
        let head = asm.begin_proc(&format!("loop{}", n)).map_err(asm_err)?;
        let body = asm
            .begin_proc(&format!("loop{}_body", n))
            .map_err(asm_err)?;
        asm.proc_mut(self.target).emit(Inst::Call(head));
        trace!("loop {} compiles into procs {:?}/{:?}", n, head, body);
        drop(asm);
        Ok(ModelCompiler {
            ctx: Rc::clone(&self.ctx),
            target: body,
            head: Some(head),
        })
    }

    /// A loop compiler closes its body with a return. The root runs the
    /// model's finalization and halts the program.
    fn end(&mut self) -> Result<(), CompilerError> {
        let mut asm = self.ctx.asm.borrow_mut();
        if self.head.is_some() {
            asm.proc_mut(self.target).emit(Inst::Ret);
        } else {
            self.ctx.model.emit_end(asm.proc_mut(self.target));
            asm.proc_mut(self.target).emit(Inst::Halt);
        }
        asm.finish_proc(self.target).map_err(asm_err)
    }
}

#[cfg(test)]
mod tests {
    use crate::{compile, CompileConfig, IoMode};
    use bfc_frontend::parse;
    use pretty_assertions::assert_eq;
    use spool_asm::{Inst, ProcId};

    fn config32() -> CompileConfig {
        CompileConfig {
            cell_min: i32::MIN as i64,
            cell_max: i32::MAX as i64,
            eof: 0,
            io: IoMode::Argument,
        }
    }

    #[test]
    fn test_every_loop_gets_a_head_body_pair() {
        let nodes = parse("[]").unwrap();
        let artifact = compile(&nodes, &config32()).unwrap();

        let names: Vec<&str> = artifact.procs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["main", "loop1", "loop1_body"]);
        // main calls the head, the head calls the body
        assert!(artifact.procs[0].code.contains(&Inst::Call(ProcId(1))));
        assert!(artifact.procs[1].code.contains(&Inst::Call(ProcId(2))));
        // the body of an empty loop is a bare return
        assert_eq!(artifact.procs[2].code, vec![Inst::Ret]);
    }

    #[test]
    fn test_sibling_loops_get_distinct_indices() {
        let nodes = parse("[][]").unwrap();
        let artifact = compile(&nodes, &config32()).unwrap();
        let names: Vec<&str> = artifact.procs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["main", "loop1", "loop1_body", "loop2", "loop2_body"]
        );
    }

    #[test]
    fn test_nested_loops_compile_into_the_body_proc() {
        let nodes = parse("[[]]").unwrap();
        let artifact = compile(&nodes, &config32()).unwrap();
        // the inner loop's call site is inside loop1_body, not main
        assert!(artifact.procs[2].code.contains(&Inst::Call(ProcId(3))));
        assert!(!artifact.procs[0].code.contains(&Inst::Call(ProcId(3))));
    }

    #[test]
    fn test_head_shape() {
        let nodes = parse("[]").unwrap();
        let artifact = compile(&nodes, &config32()).unwrap();
        let head = &artifact.procs[1].code;
        // test, call body, jump back, return
        assert!(head.iter().any(|i| matches!(i, Inst::BrI(_, _))));
        assert!(head.contains(&Inst::Call(ProcId(2))));
        assert!(head.iter().any(|i| matches!(i, Inst::Jump(_))));
        assert_eq!(*head.last().unwrap(), Inst::Ret);
    }

    #[test]
    fn test_main_ends_with_halt() {
        let nodes = parse("+").unwrap();
        let artifact = compile(&nodes, &config32()).unwrap();
        assert_eq!(*artifact.procs[0].code.last().unwrap(), Inst::Halt);
        assert_eq!(artifact.entry, 0);
    }

    #[test]
    fn test_globals_for_tape_and_argument_io() {
        let nodes = parse("").unwrap();
        let artifact = compile(&nodes, &config32()).unwrap();
        let names: Vec<&str> = artifact.globals.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["input", "input_pos", "pointer", "left_tape", "right_tape"]
        );
    }
}

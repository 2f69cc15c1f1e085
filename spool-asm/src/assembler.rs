//! Procedure assembler with two-phase label resolution
//!
//! Several procedures may be open at the same time; code generation for
//! nested loops interleaves emission into a parent body, a loop head, and a
//! loop body. Branch operands name labels while a procedure is open and are
//! rewritten to absolute instruction indices when the artifact is finished.

use crate::artifact::{Artifact, GlobalDecl, Init, Proc};
use crate::error::AsmError;
use crate::inst::{GlobalId, Inst, LabelRef, ProcId};

/// One procedure under construction
#[derive(Debug)]
pub struct ProcBody {
    name: String,
    code: Vec<Inst>,
    labels: Vec<Option<u32>>,
    finished: bool,
}

impl ProcBody {
    fn new(name: String) -> Self {
        Self {
            name,
            code: Vec::new(),
            labels: Vec::new(),
            finished: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Append one instruction at the current emission point
    pub fn emit(&mut self, inst: Inst) {
        debug_assert!(!self.finished, "emit into finished procedure {}", self.name);
        self.code.push(inst);
    }

    /// Create a fresh, unbound label
    pub fn new_label(&mut self) -> LabelRef {
        self.labels.push(None);
        LabelRef((self.labels.len() - 1) as u32)
    }

    /// Bind a label to the current emission point
    pub fn bind(&mut self, label: LabelRef) {
        debug_assert!(!self.finished, "bind in finished procedure {}", self.name);
        self.labels[label.0 as usize] = Some(self.code.len() as u32);
    }

    fn resolve(&self, label: LabelRef) -> Result<LabelRef, AsmError> {
        match self.labels.get(label.0 as usize).copied().flatten() {
            Some(index) => Ok(LabelRef(index)),
            None => Err(AsmError::UnboundLabel {
                name: self.name.clone(),
                label: label.0,
            }),
        }
    }
}

/// Builds one Spool artifact: global slots plus named procedures
#[derive(Debug, Default)]
pub struct Assembler {
    globals: Vec<GlobalDecl>,
    procs: Vec<ProcBody>,
    entry: Option<ProcId>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a persistent storage slot scoped to the whole artifact
    pub fn declare_global(&mut self, name: &str, init: Init) -> Result<GlobalId, AsmError> {
        if self.globals.iter().any(|g| g.name == name) {
            return Err(AsmError::DuplicateGlobal {
                name: name.to_string(),
            });
        }
        self.globals.push(GlobalDecl {
            name: name.to_string(),
            init,
        });
        Ok(GlobalId((self.globals.len() - 1) as u16))
    }

    /// Open a new, empty procedure. Its index is valid as a call target
    /// immediately, before any code is emitted into it.
    pub fn begin_proc(&mut self, name: &str) -> Result<ProcId, AsmError> {
        if self.procs.iter().any(|p| p.name == name) {
            return Err(AsmError::DuplicateProc {
                name: name.to_string(),
            });
        }
        self.procs.push(ProcBody::new(name.to_string()));
        Ok(ProcId((self.procs.len() - 1) as u32))
    }

    /// Mark the procedure the VM starts in
    pub fn set_entry(&mut self, id: ProcId) {
        self.entry = Some(id);
    }

    pub fn proc_mut(&mut self, id: ProcId) -> &mut ProcBody {
        &mut self.procs[id.0 as usize]
    }

    /// Close a procedure; all of its labels must be bound
    pub fn finish_proc(&mut self, id: ProcId) -> Result<(), AsmError> {
        let proc = &mut self.procs[id.0 as usize];
        if proc.finished {
            return Err(AsmError::AlreadyFinished {
                name: proc.name.clone(),
            });
        }
        for (label, target) in proc.labels.iter().enumerate() {
            if target.is_none() {
                return Err(AsmError::UnboundLabel {
                    name: proc.name.clone(),
                    label: label as u32,
                });
            }
        }
        proc.finished = true;
        Ok(())
    }

    /// Validate everything and produce the artifact, rewriting every branch
    /// operand from a label id to an absolute instruction index.
    pub fn finish(self) -> Result<Artifact, AsmError> {
        let entry = self.entry.ok_or(AsmError::MissingEntry)?;
        let mut procs = Vec::with_capacity(self.procs.len());
        for body in &self.procs {
            if !body.finished {
                return Err(AsmError::UnfinishedProc {
                    name: body.name.clone(),
                });
            }
            let mut code = Vec::with_capacity(body.code.len());
            for inst in &body.code {
                code.push(match *inst {
                    Inst::Jump(label) => Inst::Jump(body.resolve(label)?),
                    Inst::BrI(cond, label) => Inst::BrI(cond, body.resolve(label)?),
                    Inst::BrL(cond, label) => Inst::BrL(cond, body.resolve(label)?),
                    other => other,
                });
            }
            procs.push(Proc {
                name: body.name.clone(),
                code,
            });
        }
        Ok(Artifact {
            globals: self.globals,
            procs,
            entry: entry.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inst::Cond;

    #[test]
    fn test_forward_and_backward_labels() {
        let mut asm = Assembler::new();
        let main = asm.begin_proc("main").unwrap();
        let body = asm.proc_mut(main);

        let top = body.new_label();
        let exit = body.new_label();
        body.bind(top); // index 0
        body.emit(Inst::PushI(0));
        body.emit(Inst::PushI(0));
        body.emit(Inst::BrI(Cond::Eq, exit)); // forward
        body.emit(Inst::Jump(top)); // backward
        body.bind(exit); // index 4
        body.emit(Inst::Halt);

        asm.finish_proc(main).unwrap();
        asm.set_entry(main);
        let artifact = asm.finish().unwrap();

        let code = &artifact.procs[0].code;
        assert_eq!(code[2], Inst::BrI(Cond::Eq, LabelRef(4)));
        assert_eq!(code[3], Inst::Jump(LabelRef(0)));
    }

    #[test]
    fn test_unbound_label_is_an_error() {
        let mut asm = Assembler::new();
        let main = asm.begin_proc("main").unwrap();
        let body = asm.proc_mut(main);
        let dangling = body.new_label();
        body.emit(Inst::Jump(dangling));

        let err = asm.finish_proc(main).unwrap_err();
        assert!(matches!(err, AsmError::UnboundLabel { label: 0, .. }));
    }

    #[test]
    fn test_unfinished_proc_is_an_error() {
        let mut asm = Assembler::new();
        let main = asm.begin_proc("main").unwrap();
        asm.set_entry(main);
        let err = asm.finish().unwrap_err();
        assert!(matches!(err, AsmError::UnfinishedProc { .. }));
    }

    #[test]
    fn test_missing_entry_is_an_error() {
        let mut asm = Assembler::new();
        let main = asm.begin_proc("main").unwrap();
        asm.proc_mut(main).emit(Inst::Halt);
        asm.finish_proc(main).unwrap();
        assert_eq!(asm.finish().unwrap_err(), AsmError::MissingEntry);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut asm = Assembler::new();
        asm.declare_global("pointer", Init::I32(0)).unwrap();
        assert!(asm.declare_global("pointer", Init::I32(0)).is_err());
        asm.begin_proc("main").unwrap();
        assert!(asm.begin_proc("main").is_err());
    }

    #[test]
    fn test_procs_open_concurrently() {
        // the loop head/body scheme keeps three procedures open at once
        let mut asm = Assembler::new();
        let main = asm.begin_proc("main").unwrap();
        let head = asm.begin_proc("loop1").unwrap();
        let inner = asm.begin_proc("loop1_body").unwrap();

        asm.proc_mut(main).emit(Inst::Call(head));
        asm.proc_mut(inner).emit(Inst::Ret);
        asm.proc_mut(head).emit(Inst::Call(inner));
        asm.proc_mut(head).emit(Inst::Ret);
        asm.proc_mut(main).emit(Inst::Halt);

        for id in [main, head, inner] {
            asm.finish_proc(id).unwrap();
        }
        asm.set_entry(main);
        let artifact = asm.finish().unwrap();
        assert_eq!(artifact.procs.len(), 3);
        assert_eq!(artifact.procs[0].code[0], Inst::Call(ProcId(1)));
    }
}

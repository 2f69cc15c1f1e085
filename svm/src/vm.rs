//! VM core - fetch/execute loop over a decoded artifact

use crate::input::InputDevice;
use log::debug;
use spool_asm::{Artifact, AsmError, Cond, Init, Inst, Proc};
use std::io::{self, Read, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VmError {
    #[error("operand stack underflow")]
    StackUnderflow,

    #[error("type mismatch: expected {expected}")]
    TypeMismatch { expected: &'static str },

    #[error("undefined local slot {0}")]
    BadLocal(u16),

    #[error("undefined global slot {0}")]
    BadGlobal(u16),

    #[error("undefined procedure {0}")]
    BadProc(u32),

    #[error("dangling list reference {0}")]
    BadList(usize),

    #[error("list index {index} out of bounds (len {len})")]
    ListIndex { index: i32, len: usize },

    #[error("step limit of {0} instructions exceeded")]
    StepLimit(u64),

    #[error("no call frame")]
    NoFrame,

    #[error(transparent)]
    Artifact(#[from] AsmError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// A runtime value. Lists are handles into the VM's list arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    I32(i32),
    I64(i64),
    List(usize),
}

struct Frame {
    proc: usize,
    pc: usize,
    locals: Vec<Value>,
}

/// The Spool Virtual Machine
pub struct Vm {
    procs: Vec<Proc>,
    entry: usize,
    globals: Vec<Value>,
    lists: Vec<Vec<Value>>,
    /// The operand stack, left inspectable for embedders and tests
    pub stack: Vec<Value>,
    frames: Vec<Frame>,
    args: Vec<String>,
    input: InputDevice,
    output: Box<dyn Write>,
    step_limit: Option<u64>,
}

impl Vm {
    /// A VM wired to the process's stdin/stdout
    pub fn new(artifact: Artifact, args: Vec<String>) -> Self {
        Self::with_io(
            artifact,
            args,
            Box::new(io::stdin()),
            Box::new(io::stdout()),
        )
    }

    /// A VM with explicit input/output, for embedding and tests
    pub fn with_io(
        artifact: Artifact,
        args: Vec<String>,
        input: Box<dyn Read>,
        output: Box<dyn Write>,
    ) -> Self {
        let mut lists = Vec::new();
        let globals = artifact
            .globals
            .iter()
            .map(|g| match g.init {
                Init::I32(v) => Value::I32(v),
                Init::I64(v) => Value::I64(v),
                Init::EmptyList => {
                    lists.push(Vec::new());
                    Value::List(lists.len() - 1)
                }
            })
            .collect();
        debug!(
            "loaded artifact: {} procs, {} globals, entry {}",
            artifact.procs.len(),
            artifact.globals.len(),
            artifact.entry
        );
        Self {
            procs: artifact.procs,
            entry: artifact.entry as usize,
            globals,
            lists,
            stack: Vec::new(),
            frames: Vec::new(),
            args,
            input: InputDevice::new(input),
            output,
            step_limit: None,
        }
    }

    /// Abort with [`VmError::StepLimit`] after executing `limit` instructions
    pub fn set_step_limit(&mut self, limit: u64) {
        self.step_limit = Some(limit);
    }

    /// Execute from the entry procedure until it returns or halts
    pub fn run(&mut self) -> Result<(), VmError> {
        self.frames.push(Frame {
            proc: self.entry,
            pc: 0,
            locals: Vec::new(),
        });
        let mut steps: u64 = 0;

        loop {
            let (proc_idx, pc) = match self.frames.last() {
                Some(frame) => (frame.proc, frame.pc),
                None => return Ok(()),
            };
            let code = &self.procs[proc_idx].code;
            if pc >= code.len() {
                // fell off the end: treat as a return
                self.frames.pop();
                continue;
            }
            let inst = code[pc];

            steps += 1;
            if let Some(limit) = self.step_limit {
                if steps > limit {
                    return Err(VmError::StepLimit(limit));
                }
            }

            let mut next_pc = pc + 1;
            match inst {
                Inst::PushI(v) => self.stack.push(Value::I32(v)),
                Inst::PushL(v) => self.stack.push(Value::I64(v)),

                Inst::Dup => {
                    let top = *self.stack.last().ok_or(VmError::StackUnderflow)?;
                    self.stack.push(top);
                }
                Inst::Drop => {
                    self.pop()?;
                }

                Inst::AddI => self.binary_i32(i32::wrapping_add)?,
                Inst::SubI => self.binary_i32(i32::wrapping_sub)?,
                Inst::MulI => self.binary_i32(i32::wrapping_mul)?,
                Inst::NegI => {
                    let a = self.pop_i32()?;
                    self.stack.push(Value::I32(a.wrapping_neg()));
                }
                Inst::AddL => self.binary_i64(i64::wrapping_add)?,
                Inst::SubL => self.binary_i64(i64::wrapping_sub)?,

                Inst::I2L => {
                    let v = self.pop_i32()?;
                    self.stack.push(Value::I64(v as i64));
                }
                Inst::L2I => {
                    let v = self.pop_i64()?;
                    self.stack.push(Value::I32(v as i32));
                }

                Inst::GetGlobal(g) => {
                    let v = *self
                        .globals
                        .get(g.0 as usize)
                        .ok_or(VmError::BadGlobal(g.0))?;
                    self.stack.push(v);
                }
                Inst::SetGlobal(g) => {
                    let v = self.pop()?;
                    let slot = self
                        .globals
                        .get_mut(g.0 as usize)
                        .ok_or(VmError::BadGlobal(g.0))?;
                    *slot = v;
                }

                Inst::GetLocal(i) => {
                    let frame = self.frames.last().ok_or(VmError::NoFrame)?;
                    let v = *frame
                        .locals
                        .get(i as usize)
                        .ok_or(VmError::BadLocal(i))?;
                    self.stack.push(v);
                }
                Inst::SetLocal(i) => {
                    let v = self.pop()?;
                    let frame = self.frames.last_mut().ok_or(VmError::NoFrame)?;
                    if frame.locals.len() <= i as usize {
                        frame.locals.resize(i as usize + 1, Value::I32(0));
                    }
                    frame.locals[i as usize] = v;
                }

                Inst::ListGet => {
                    let index = self.pop_i32()?;
                    let handle = self.pop_list()?;
                    let list = self.list(handle)?;
                    let v = *checked_index(list, index)?;
                    self.stack.push(v);
                }
                Inst::ListSet => {
                    let v = self.pop()?;
                    let index = self.pop_i32()?;
                    let handle = self.pop_list()?;
                    let list = self.list_mut(handle)?;
                    *checked_index_mut(list, index)? = v;
                }
                Inst::ListPush => {
                    let v = self.pop()?;
                    let handle = self.pop_list()?;
                    self.list_mut(handle)?.push(v);
                }
                Inst::ListLen => {
                    let handle = self.pop_list()?;
                    let len = self.list(handle)?.len();
                    self.stack.push(Value::I32(len as i32));
                }

                Inst::Jump(t) => next_pc = t.0 as usize,
                Inst::BrI(cond, t) => {
                    let b = self.pop_i32()?;
                    let a = self.pop_i32()?;
                    if compare(cond, a.cmp(&b)) {
                        next_pc = t.0 as usize;
                    }
                }
                Inst::BrL(cond, t) => {
                    let b = self.pop_i64()?;
                    let a = self.pop_i64()?;
                    if compare(cond, a.cmp(&b)) {
                        next_pc = t.0 as usize;
                    }
                }

                Inst::Call(p) => {
                    if p.0 as usize >= self.procs.len() {
                        return Err(VmError::BadProc(p.0));
                    }
                    if let Some(frame) = self.frames.last_mut() {
                        frame.pc = next_pc;
                    }
                    self.frames.push(Frame {
                        proc: p.0 as usize,
                        pc: 0,
                        locals: Vec::new(),
                    });
                    continue;
                }
                Inst::Ret => {
                    self.frames.pop();
                    continue;
                }
                Inst::Halt => return Ok(()),

                Inst::ArgChars => {
                    let joined = self.args.join(" ");
                    let points: Vec<Value> =
                        joined.chars().map(|c| Value::I32(c as i32)).collect();
                    self.lists.push(points);
                    self.stack.push(Value::List(self.lists.len() - 1));
                }
                Inst::ReadUnit => {
                    let unit = self.input.read_unit()?;
                    self.stack.push(Value::I32(unit));
                }
                Inst::MarkInput => self.input.mark(),
                Inst::ResetInput => self.input.reset(),
                Inst::CloseInput => self.input.close(),
                Inst::PrintChar => {
                    let point = self.pop_i32()?;
                    let ch = u32::try_from(point)
                        .ok()
                        .and_then(char::from_u32)
                        .unwrap_or(char::REPLACEMENT_CHARACTER);
                    let mut buf = [0u8; 4];
                    self.output.write_all(ch.encode_utf8(&mut buf).as_bytes())?;
                    self.output.flush()?;
                }
            }

            if let Some(frame) = self.frames.last_mut() {
                frame.pc = next_pc;
            }
        }
    }

    fn pop(&mut self) -> Result<Value, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    fn pop_i32(&mut self) -> Result<i32, VmError> {
        match self.pop()? {
            Value::I32(v) => Ok(v),
            _ => Err(VmError::TypeMismatch { expected: "i32" }),
        }
    }

    fn pop_i64(&mut self) -> Result<i64, VmError> {
        match self.pop()? {
            Value::I64(v) => Ok(v),
            _ => Err(VmError::TypeMismatch { expected: "i64" }),
        }
    }

    fn pop_list(&mut self) -> Result<usize, VmError> {
        match self.pop()? {
            Value::List(handle) => Ok(handle),
            _ => Err(VmError::TypeMismatch { expected: "list" }),
        }
    }

    fn list(&self, handle: usize) -> Result<&Vec<Value>, VmError> {
        self.lists.get(handle).ok_or(VmError::BadList(handle))
    }

    fn list_mut(&mut self, handle: usize) -> Result<&mut Vec<Value>, VmError> {
        self.lists.get_mut(handle).ok_or(VmError::BadList(handle))
    }

    fn binary_i32(&mut self, op: fn(i32, i32) -> i32) -> Result<(), VmError> {
        let b = self.pop_i32()?;
        let a = self.pop_i32()?;
        self.stack.push(Value::I32(op(a, b)));
        Ok(())
    }

    fn binary_i64(&mut self, op: fn(i64, i64) -> i64) -> Result<(), VmError> {
        let b = self.pop_i64()?;
        let a = self.pop_i64()?;
        self.stack.push(Value::I64(op(a, b)));
        Ok(())
    }
}

fn compare(cond: Cond, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match cond {
        Cond::Eq => ordering == Equal,
        Cond::Ne => ordering != Equal,
        Cond::Lt => ordering == Less,
        Cond::Le => ordering != Greater,
        Cond::Gt => ordering == Greater,
        Cond::Ge => ordering != Less,
    }
}

fn checked_index(list: &[Value], index: i32) -> Result<&Value, VmError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| list.get(i))
        .ok_or(VmError::ListIndex {
            index,
            len: list.len(),
        })
}

fn checked_index_mut(list: &mut Vec<Value>, index: i32) -> Result<&mut Value, VmError> {
    let len = list.len();
    usize::try_from(index)
        .ok()
        .and_then(move |i| list.get_mut(i))
        .ok_or(VmError::ListIndex { index, len })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spool_asm::{Assembler, GlobalId, LabelRef, ProcId};

    fn run_vm(artifact: Artifact, args: Vec<String>, input: &str) -> Vm {
        let mut vm = Vm::with_io(
            artifact,
            args,
            Box::new(io::Cursor::new(input.as_bytes().to_vec())),
            Box::new(Vec::new()),
        );
        vm.set_step_limit(1_000_000);
        vm.run().unwrap();
        vm
    }

    fn single_proc(code: Vec<Inst>) -> Artifact {
        let mut asm = Assembler::new();
        let main = asm.begin_proc("main").unwrap();
        for inst in code {
            asm.proc_mut(main).emit(inst);
        }
        asm.finish_proc(main).unwrap();
        asm.set_entry(main);
        asm.finish().unwrap()
    }

    #[test]
    fn test_wrapping_arithmetic() {
        let artifact = single_proc(vec![
            Inst::PushI(i32::MAX),
            Inst::PushI(1),
            Inst::AddI,
            Inst::Halt,
        ]);
        let vm = run_vm(artifact, vec![], "");
        assert_eq!(vm.stack, vec![Value::I32(i32::MIN)]);
    }

    #[test]
    fn test_branch_pops_right_then_left() {
        // 3 < 5 is true, so the branch is taken
        let mut asm = Assembler::new();
        let main = asm.begin_proc("main").unwrap();
        let body = asm.proc_mut(main);
        let taken = body.new_label();
        body.emit(Inst::PushI(3));
        body.emit(Inst::PushI(5));
        body.emit(Inst::BrI(Cond::Lt, taken));
        body.emit(Inst::PushI(-1));
        body.bind(taken);
        body.emit(Inst::PushI(7));
        body.emit(Inst::Halt);
        asm.finish_proc(main).unwrap();
        asm.set_entry(main);

        let vm = run_vm(asm.finish().unwrap(), vec![], "");
        assert_eq!(vm.stack, vec![Value::I32(7)]);
    }

    #[test]
    fn test_call_and_ret_share_the_operand_stack() {
        let mut asm = Assembler::new();
        let main = asm.begin_proc("main").unwrap();
        let helper = asm.begin_proc("helper").unwrap();
        asm.proc_mut(helper).emit(Inst::PushI(11));
        asm.proc_mut(helper).emit(Inst::Ret);
        asm.proc_mut(main).emit(Inst::Call(ProcId(1)));
        asm.proc_mut(main).emit(Inst::PushI(1));
        asm.proc_mut(main).emit(Inst::AddI);
        asm.proc_mut(main).emit(Inst::Halt);
        asm.finish_proc(main).unwrap();
        asm.finish_proc(helper).unwrap();
        asm.set_entry(main);

        let vm = run_vm(asm.finish().unwrap(), vec![], "");
        assert_eq!(vm.stack, vec![Value::I32(12)]);
    }

    #[test]
    fn test_globals_and_lists() {
        let mut asm = Assembler::new();
        let tape = asm.declare_global("tape", spool_asm::Init::EmptyList).unwrap();
        let main = asm.begin_proc("main").unwrap();
        let body = asm.proc_mut(main);
        body.emit(Inst::GetGlobal(tape));
        body.emit(Inst::PushI(42));
        body.emit(Inst::ListPush);
        body.emit(Inst::GetGlobal(tape));
        body.emit(Inst::PushI(0));
        body.emit(Inst::ListGet);
        body.emit(Inst::GetGlobal(tape));
        body.emit(Inst::ListLen);
        body.emit(Inst::Halt);
        asm.finish_proc(main).unwrap();
        asm.set_entry(main);

        let vm = run_vm(asm.finish().unwrap(), vec![], "");
        assert_eq!(vm.stack, vec![Value::I32(42), Value::I32(1)]);
    }

    #[test]
    fn test_arg_chars_joins_with_spaces() {
        let artifact = single_proc(vec![Inst::ArgChars, Inst::ListLen, Inst::Halt]);
        let vm = run_vm(artifact, vec!["ab".to_string(), "c".to_string()], "");
        // "ab c" -> 4 code points
        assert_eq!(vm.stack, vec![Value::I32(4)]);
    }

    #[test]
    fn test_read_unit_reports_eof() {
        let artifact = single_proc(vec![Inst::ReadUnit, Inst::ReadUnit, Inst::Halt]);
        let vm = run_vm(artifact, vec![], "A");
        assert_eq!(vm.stack, vec![Value::I32(65), Value::I32(-1)]);
    }

    #[test]
    fn test_step_limit() {
        let mut asm = Assembler::new();
        let main = asm.begin_proc("main").unwrap();
        let body = asm.proc_mut(main);
        let top = body.new_label();
        body.bind(top);
        body.emit(Inst::Jump(top));
        asm.finish_proc(main).unwrap();
        asm.set_entry(main);

        let mut vm = Vm::with_io(
            asm.finish().unwrap(),
            vec![],
            Box::new(io::empty()),
            Box::new(Vec::new()),
        );
        vm.set_step_limit(1000);
        assert!(matches!(vm.run(), Err(VmError::StepLimit(1000))));
    }

    #[test]
    fn test_stack_underflow() {
        let artifact = single_proc(vec![Inst::AddI, Inst::Halt]);
        let mut vm = Vm::with_io(
            artifact,
            vec![],
            Box::new(io::empty()),
            Box::new(Vec::new()),
        );
        assert!(matches!(vm.run(), Err(VmError::StackUnderflow)));
    }

    #[test]
    fn test_local_slots() {
        let artifact = single_proc(vec![
            Inst::PushI(5),
            Inst::SetLocal(1),
            Inst::GetLocal(1),
            Inst::GetLocal(1),
            Inst::AddI,
            Inst::Halt,
        ]);
        let vm = run_vm(artifact, vec![], "");
        assert_eq!(vm.stack, vec![Value::I32(10)]);
    }

    #[test]
    fn test_undeclared_global_is_an_error() {
        let artifact = single_proc(vec![Inst::GetGlobal(GlobalId(3)), Inst::Halt]);
        let mut vm = Vm::with_io(
            artifact,
            vec![],
            Box::new(io::empty()),
            Box::new(Vec::new()),
        );
        assert!(matches!(vm.run(), Err(VmError::BadGlobal(3))));
    }

    #[test]
    fn test_jump_target_survives_roundtrip() {
        // targets in a finished artifact are absolute instruction indices
        let artifact = Artifact {
            globals: vec![],
            procs: vec![spool_asm::Proc {
                name: "main".to_string(),
                code: vec![Inst::Jump(LabelRef(2)), Inst::PushI(1), Inst::Halt],
            }],
            entry: 0,
        };
        let bytes = artifact.to_bytes();
        let decoded = Artifact::from_bytes(&bytes).unwrap();
        let vm = run_vm(decoded, vec![], "");
        assert!(vm.stack.is_empty());
    }
}

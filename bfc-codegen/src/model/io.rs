//! I/O models: where code points come from and where they go

use super::IoModel;
use crate::asm_err;
use bfc_common::CompilerError;
use spool_asm::{Assembler, Cond, GlobalId, Inst, ProcBody, ProcId};

pub fn argument_io(asm: &mut Assembler, eof: i32) -> Result<Box<dyn IoModel>, CompilerError> {
    Ok(Box::new(ArgumentIo::new(asm, eof)?))
}

pub fn interactive_io(asm: &mut Assembler, eof: i32) -> Result<Box<dyn IoModel>, CompilerError> {
    Ok(Box::new(InteractiveIo::new(asm, eof)?))
}

/// Output is the same for both models: push the code point, print the
/// character it encodes, unbuffered per call.
fn emit_print(f: &mut ProcBody, value: &mut dyn FnMut(&mut ProcBody)) {
    value(f);
    f.emit(Inst::PrintChar);
}

/// Input from the program's command-line arguments.
///
/// At startup all arguments are joined with single spaces and decoded into
/// a list of code points; a cursor walks the list and parks at the end,
/// after which every read yields the EOF sentinel.
pub struct ArgumentIo {
    eof: i32,
    input: GlobalId,
    cursor: GlobalId,
}

impl ArgumentIo {
    pub fn new(asm: &mut Assembler, eof: i32) -> Result<Self, CompilerError> {
        let input = asm.declare_global("input", spool_asm::Init::EmptyList).map_err(asm_err)?;
        let cursor = asm.declare_global("input_pos", spool_asm::Init::I32(0)).map_err(asm_err)?;
        Ok(Self { eof, input, cursor })
    }
}

impl IoModel for ArgumentIo {
    fn emit_init(&self, f: &mut ProcBody) {
        f.emit(Inst::ArgChars);
        f.emit(Inst::SetGlobal(self.input));
    }

    fn emit_input(&self, f: &mut ProcBody) {
        let have = f.new_label();
        let done = f.new_label();

        f.emit(Inst::GetGlobal(self.input));
        f.emit(Inst::ListLen);
        f.emit(Inst::GetGlobal(self.cursor));
        f.emit(Inst::BrI(Cond::Gt, have));
        f.emit(Inst::PushI(self.eof));
        f.emit(Inst::Jump(done));

        f.bind(have);
        f.emit(Inst::GetGlobal(self.input));
        f.emit(Inst::GetGlobal(self.cursor));
        f.emit(Inst::ListGet);
        f.emit(Inst::GetGlobal(self.cursor));
        f.emit(Inst::PushI(1));
        f.emit(Inst::AddI);
        f.emit(Inst::SetGlobal(self.cursor));
        f.bind(done);
    }

    fn emit_output(&self, f: &mut ProcBody, value: &mut dyn FnMut(&mut ProcBody)) {
        emit_print(f, value);
    }

    fn emit_end(&self, _f: &mut ProcBody) {}
}

/// Input from the live input stream, one logical code point per read.
///
/// The stream yields UTF-16 units. A generated helper procedure reads one
/// unit, and on a high surrogate marks the stream, reads a second unit and
/// either combines the pair or rewinds; end of stream maps to the EOF
/// sentinel. The stream is closed when the program ends.
pub struct InteractiveIo {
    read_point: ProcId,
}

impl InteractiveIo {
    pub fn new(asm: &mut Assembler, eof: i32) -> Result<Self, CompilerError> {
        let read_point = asm.begin_proc("read_point").map_err(asm_err)?;
        emit_read_point(asm.proc_mut(read_point), eof);
        asm.finish_proc(read_point).map_err(asm_err)?;
        Ok(Self { read_point })
    }
}

impl IoModel for InteractiveIo {
    fn emit_init(&self, _f: &mut ProcBody) {}

    fn emit_input(&self, f: &mut ProcBody) {
        f.emit(Inst::Call(self.read_point));
    }

    fn emit_output(&self, f: &mut ProcBody, value: &mut dyn FnMut(&mut ProcBody)) {
        emit_print(f, value);
    }

    fn emit_end(&self, f: &mut ProcBody) {
        f.emit(Inst::CloseInput);
    }
}

/// The body of the `read_point` helper. Local 0 holds the first unit,
/// local 1 the second.
fn emit_read_point(f: &mut ProcBody, eof: i32) {
    let plain = f.new_label();
    let low_check = f.new_label();
    let invalid = f.new_label();
    let have = f.new_label();

    f.emit(Inst::ReadUnit);
    f.emit(Inst::SetLocal(0));

    // not a high surrogate (or end of stream): take the plain path
    f.emit(Inst::GetLocal(0));
    f.emit(Inst::PushI(0));
    f.emit(Inst::BrI(Cond::Lt, plain));
    f.emit(Inst::GetLocal(0));
    f.emit(Inst::PushI(0xD800));
    f.emit(Inst::BrI(Cond::Lt, plain));
    f.emit(Inst::GetLocal(0));
    f.emit(Inst::PushI(0xDBFF));
    f.emit(Inst::BrI(Cond::Gt, plain));

    // high surrogate: peek one more unit
    f.emit(Inst::MarkInput);
    f.emit(Inst::ReadUnit);
    f.emit(Inst::SetLocal(1));
    f.emit(Inst::GetLocal(1));
    f.emit(Inst::PushI(0));
    f.emit(Inst::BrI(Cond::Ge, low_check));
    f.emit(Inst::GetLocal(0)); // stream ended after the high half
    f.emit(Inst::Ret);

    f.bind(low_check);
    f.emit(Inst::GetLocal(1));
    f.emit(Inst::PushI(0xDC00));
    f.emit(Inst::BrI(Cond::Lt, invalid));
    f.emit(Inst::GetLocal(1));
    f.emit(Inst::PushI(0xDFFF));
    f.emit(Inst::BrI(Cond::Gt, invalid));

    // combine: ((hi - D800) * 400h) + (lo - DC00) + 10000h
    f.emit(Inst::GetLocal(0));
    f.emit(Inst::PushI(0xD800));
    f.emit(Inst::SubI);
    f.emit(Inst::PushI(0x400));
    f.emit(Inst::MulI);
    f.emit(Inst::GetLocal(1));
    f.emit(Inst::PushI(0xDC00));
    f.emit(Inst::SubI);
    f.emit(Inst::AddI);
    f.emit(Inst::PushI(0x10000));
    f.emit(Inst::AddI);
    f.emit(Inst::Ret);

    // not a low surrogate: rewind and hand back the first unit alone
    f.bind(invalid);
    f.emit(Inst::ResetInput);
    f.emit(Inst::GetLocal(0));
    f.emit(Inst::Ret);

    f.bind(plain);
    f.emit(Inst::GetLocal(0));
    f.emit(Inst::PushI(0));
    f.emit(Inst::BrI(Cond::Ge, have));
    f.emit(Inst::PushI(eof));
    f.emit(Inst::Ret);

    f.bind(have);
    f.emit(Inst::GetLocal(0));
    f.emit(Inst::Ret);
}

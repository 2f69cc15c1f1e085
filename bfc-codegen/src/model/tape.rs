//! The unbounded bidirectional tape
//!
//! Two growable lists back the tape: `right_tape` covers positions >= 0 and
//! `left_tape` covers positions < 0 (position p lives at index -p - 1).
//! Every pointer move is followed by a widen step that appends exactly one
//! default cell to the side the pointer just entered, if needed, so a read
//! or write at the pointer always lands on an existing cell.

use super::{CellModel, IoModel, TapeModel};
use crate::asm_err;
use bfc_common::CompilerError;
use spool_asm::{Assembler, Cond, GlobalId, Init, Inst, ProcBody};

pub struct UnboundedTape {
    cell: Box<dyn CellModel>,
    io: Box<dyn IoModel>,
    pointer: GlobalId,
    left: GlobalId,
    right: GlobalId,
}

impl UnboundedTape {
    pub fn new(
        asm: &mut Assembler,
        cell: Box<dyn CellModel>,
        io: Box<dyn IoModel>,
    ) -> Result<Self, CompilerError> {
        let pointer = asm.declare_global("pointer", Init::I32(0)).map_err(asm_err)?;
        let left = asm
            .declare_global("left_tape", Init::EmptyList)
            .map_err(asm_err)?;
        let right = asm
            .declare_global("right_tape", Init::EmptyList)
            .map_err(asm_err)?;
        Ok(Self {
            cell,
            io,
            pointer,
            left,
            right,
        })
    }

    /// Push the left-tape index for the (negative) pointer: -p - 1
    fn emit_left_index(&self, f: &mut ProcBody) {
        f.emit(Inst::GetGlobal(self.pointer));
        f.emit(Inst::NegI);
        f.emit(Inst::PushI(-1));
        f.emit(Inst::AddI);
    }

    /// Write a freshly computed value into the cell at the pointer;
    /// `value` emits the code that pushes it.
    fn emit_set(&self, f: &mut ProcBody, value: impl Fn(&mut ProcBody)) {
        let left_side = f.new_label();
        let done = f.new_label();

        f.emit(Inst::GetGlobal(self.pointer));
        f.emit(Inst::PushI(0));
        f.emit(Inst::BrI(Cond::Lt, left_side));

        f.emit(Inst::GetGlobal(self.right));
        f.emit(Inst::GetGlobal(self.pointer));
        value(f);
        f.emit(Inst::ListSet);
        f.emit(Inst::Jump(done));

        f.bind(left_side);
        f.emit(Inst::GetGlobal(self.left));
        self.emit_left_index(f);
        value(f);
        f.emit(Inst::ListSet);
        f.bind(done);
    }

    /// Grow the side the pointer is on by one default cell when the
    /// pointer has stepped past its current length
    fn emit_widen(&self, f: &mut ProcBody) {
        let left_side = f.new_label();
        let done = f.new_label();

        f.emit(Inst::GetGlobal(self.pointer));
        f.emit(Inst::PushI(0));
        f.emit(Inst::BrI(Cond::Lt, left_side));

        let covered_right = f.new_label();
        f.emit(Inst::GetGlobal(self.right));
        f.emit(Inst::ListLen);
        f.emit(Inst::GetGlobal(self.pointer));
        f.emit(Inst::BrI(Cond::Gt, covered_right));
        f.emit(Inst::GetGlobal(self.right));
        self.cell.emit_default(f);
        f.emit(Inst::ListPush);
        f.bind(covered_right);
        f.emit(Inst::Jump(done));

        f.bind(left_side);
        let covered_left = f.new_label();
        f.emit(Inst::GetGlobal(self.left));
        f.emit(Inst::ListLen);
        self.emit_left_index(f);
        f.emit(Inst::BrI(Cond::Gt, covered_left));
        f.emit(Inst::GetGlobal(self.left));
        self.cell.emit_default(f);
        f.emit(Inst::ListPush);
        f.bind(covered_left);
        f.bind(done);
    }
}

impl TapeModel for UnboundedTape {
    fn cell(&self) -> &dyn CellModel {
        &*self.cell
    }

    fn emit_init(&self, f: &mut ProcBody) {
        // both sides start with a single default cell
        f.emit(Inst::GetGlobal(self.left));
        self.cell.emit_default(f);
        f.emit(Inst::ListPush);

        f.emit(Inst::GetGlobal(self.right));
        self.cell.emit_default(f);
        f.emit(Inst::ListPush);

        self.io.emit_init(f);
    }

    fn emit_advance(&self, f: &mut ProcBody) {
        f.emit(Inst::GetGlobal(self.pointer));
        f.emit(Inst::PushI(1));
        f.emit(Inst::AddI);
        f.emit(Inst::SetGlobal(self.pointer));
        self.emit_widen(f);
    }

    fn emit_retreat(&self, f: &mut ProcBody) {
        f.emit(Inst::GetGlobal(self.pointer));
        f.emit(Inst::PushI(-1));
        f.emit(Inst::AddI);
        f.emit(Inst::SetGlobal(self.pointer));
        self.emit_widen(f);
    }

    fn emit_increment(&self, f: &mut ProcBody) {
        self.emit_set(f, |f| {
            self.emit_get(f);
            self.cell.emit_increment(f);
        });
    }

    fn emit_decrement(&self, f: &mut ProcBody) {
        self.emit_set(f, |f| {
            self.emit_get(f);
            self.cell.emit_decrement(f);
        });
    }

    fn emit_input(&self, f: &mut ProcBody) {
        self.emit_set(f, |f| {
            self.io.emit_input(f);
            self.cell.emit_from_codepoint(f);
        });
    }

    fn emit_output(&self, f: &mut ProcBody) {
        self.io.emit_output(f, &mut |f| {
            self.emit_get(f);
            self.cell.emit_to_codepoint(f);
        });
    }

    fn emit_get(&self, f: &mut ProcBody) {
        let left_side = f.new_label();
        let done = f.new_label();

        f.emit(Inst::GetGlobal(self.pointer));
        f.emit(Inst::PushI(0));
        f.emit(Inst::BrI(Cond::Lt, left_side));

        f.emit(Inst::GetGlobal(self.right));
        f.emit(Inst::GetGlobal(self.pointer));
        f.emit(Inst::ListGet);
        f.emit(Inst::Jump(done));

        f.bind(left_side);
        f.emit(Inst::GetGlobal(self.left));
        self.emit_left_index(f);
        f.emit(Inst::ListGet);
        f.bind(done);
    }

    fn emit_end(&self, f: &mut ProcBody) {
        self.io.emit_end(f);
    }
}

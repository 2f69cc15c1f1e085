//! Cell models: the numeric domain of one tape cell

use super::CellModel;
use spool_asm::{Cond, Inst, LabelRef, ProcBody};

/// Pick the cell model for a declared range.
///
/// The two full-width ranges get native wrapping arithmetic; anything else
/// is a bounded cell with branch-clamped wraparound.
pub fn select_cell(min: i64, max: i64) -> Box<dyn CellModel> {
    if min == i32::MIN as i64 && max == i32::MAX as i64 {
        Box::new(IntCell)
    } else if min == i64::MIN && max == i64::MAX {
        Box::new(LongCell)
    } else {
        Box::new(BoundedCell::new(min, max))
    }
}

/// 32-bit signed wrapping cells. The cell already is a code point, so both
/// conversions are the identity; clipping to valid code points happens at
/// the I/O boundary, not here.
pub struct IntCell;

impl CellModel for IntCell {
    fn emit_default(&self, f: &mut ProcBody) {
        f.emit(Inst::PushI(0));
    }

    fn emit_increment(&self, f: &mut ProcBody) {
        f.emit(Inst::PushI(1));
        f.emit(Inst::AddI);
    }

    fn emit_decrement(&self, f: &mut ProcBody) {
        f.emit(Inst::PushI(-1));
        f.emit(Inst::AddI);
    }

    fn emit_to_codepoint(&self, _f: &mut ProcBody) {}

    fn emit_from_codepoint(&self, _f: &mut ProcBody) {}

    fn emit_is_zero(&self, f: &mut ProcBody, if_zero: LabelRef) {
        f.emit(Inst::PushI(0));
        f.emit(Inst::BrI(Cond::Eq, if_zero));
    }
}

/// 64-bit signed wrapping cells
pub struct LongCell;

impl CellModel for LongCell {
    fn emit_default(&self, f: &mut ProcBody) {
        f.emit(Inst::PushL(0));
    }

    fn emit_increment(&self, f: &mut ProcBody) {
        f.emit(Inst::PushL(1));
        f.emit(Inst::AddL);
    }

    fn emit_decrement(&self, f: &mut ProcBody) {
        f.emit(Inst::PushL(-1));
        f.emit(Inst::AddL);
    }

    fn emit_to_codepoint(&self, f: &mut ProcBody) {
        f.emit(Inst::L2I);
    }

    fn emit_from_codepoint(&self, f: &mut ProcBody) {
        f.emit(Inst::I2L);
    }

    fn emit_is_zero(&self, f: &mut ProcBody, if_zero: LabelRef) {
        f.emit(Inst::PushL(0));
        f.emit(Inst::BrL(Cond::Eq, if_zero));
    }
}

/// Cells over an arbitrary inclusive range.
///
/// Increment and decrement compute in 64-bit and clamp with a single
/// branch each way; the range need not be a power of two, so this is a
/// compare-and-wrap, not a modulo. `from_codepoint` normalizes by
/// repeatedly adding or subtracting the range width until the value lies
/// within [min, max].
pub struct BoundedCell {
    min: i64,
    max: i64,
}

impl BoundedCell {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    fn width(&self) -> i64 {
        self.max.wrapping_sub(self.min).wrapping_add(1)
    }
}

impl CellModel for BoundedCell {
    fn emit_default(&self, f: &mut ProcBody) {
        f.emit(Inst::PushL(0));
    }

    fn emit_increment(&self, f: &mut ProcBody) {
        f.emit(Inst::PushL(1));
        f.emit(Inst::AddL);

        let wrap = f.new_label();
        let done = f.new_label();
        f.emit(Inst::Dup);
        f.emit(Inst::PushL(self.max));
        f.emit(Inst::BrL(Cond::Gt, wrap));
        f.emit(Inst::Jump(done));
        f.bind(wrap);
        f.emit(Inst::Drop);
        f.emit(Inst::PushL(self.min));
        f.bind(done);
    }

    fn emit_decrement(&self, f: &mut ProcBody) {
        f.emit(Inst::PushL(-1));
        f.emit(Inst::AddL);

        let wrap = f.new_label();
        let done = f.new_label();
        f.emit(Inst::Dup);
        f.emit(Inst::PushL(self.min));
        f.emit(Inst::BrL(Cond::Lt, wrap));
        f.emit(Inst::Jump(done));
        f.bind(wrap);
        f.emit(Inst::Drop);
        f.emit(Inst::PushL(self.max));
        f.bind(done);
    }

    fn emit_to_codepoint(&self, f: &mut ProcBody) {
        f.emit(Inst::L2I);
    }

    fn emit_from_codepoint(&self, f: &mut ProcBody) {
        f.emit(Inst::I2L);

        // raise below-range values by whole widths
        let raise = f.new_label();
        let raised = f.new_label();
        f.bind(raise);
        f.emit(Inst::Dup);
        f.emit(Inst::PushL(self.min));
        f.emit(Inst::BrL(Cond::Ge, raised));
        f.emit(Inst::PushL(self.width()));
        f.emit(Inst::AddL);
        f.emit(Inst::Jump(raise));
        f.bind(raised);

        // lower above-range values by whole widths
        let lower = f.new_label();
        let lowered = f.new_label();
        f.bind(lower);
        f.emit(Inst::Dup);
        f.emit(Inst::PushL(self.max));
        f.emit(Inst::BrL(Cond::Le, lowered));
        f.emit(Inst::PushL(self.width()));
        f.emit(Inst::SubL);
        f.emit(Inst::Jump(lower));
        f.bind(lowered);
    }

    fn emit_is_zero(&self, f: &mut ProcBody, if_zero: LabelRef) {
        // valid configurations straddle zero, so a plain equality test
        f.emit(Inst::PushL(0));
        f.emit(Inst::BrL(Cond::Eq, if_zero));
    }
}

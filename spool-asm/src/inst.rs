//! Spool instruction set definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a global slot declared on the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalId(pub u16);

/// Index of a procedure within the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcId(pub u32);

/// A branch target.
///
/// While a procedure is open in the [`Assembler`](crate::Assembler) this
/// names a label created by `new_label`; in a finished artifact it is the
/// absolute instruction index within the procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelRef(pub u32);

/// Comparison condition for the branch instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cond {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Cond::Eq => 0,
            Cond::Ne => 1,
            Cond::Lt => 2,
            Cond::Le => 3,
            Cond::Gt => 4,
            Cond::Ge => 5,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Cond::Eq),
            1 => Some(Cond::Ne),
            2 => Some(Cond::Lt),
            3 => Some(Cond::Le),
            4 => Some(Cond::Gt),
            5 => Some(Cond::Ge),
            _ => None,
        }
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cond::Eq => write!(f, "EQ"),
            Cond::Ne => write!(f, "NE"),
            Cond::Lt => write!(f, "LT"),
            Cond::Le => write!(f, "LE"),
            Cond::Gt => write!(f, "GT"),
            Cond::Ge => write!(f, "GE"),
        }
    }
}

/// Spool VM Instructions
///
/// Arithmetic is wrapping at its width. The branch instructions pop the
/// right operand first, then the left, and branch when `left cond right`
/// holds. List instructions address a VM-owned growable list value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Inst {
    // Constants
    PushI(i32),                   // push a 32-bit value
    PushL(i64),                   // push a 64-bit value

    // Stack
    Dup,                          // duplicate the top value
    Drop,                         // discard the top value

    // Arithmetic (wrapping)
    AddI,                         // pop b, a; push a + b (i32)
    SubI,                         // pop b, a; push a - b (i32)
    MulI,                         // pop b, a; push a * b (i32)
    NegI,                         // pop a; push -a (i32)
    AddL,                         // pop b, a; push a + b (i64)
    SubL,                         // pop b, a; push a - b (i64)

    // Conversions
    I2L,                          // widen i32 -> i64
    L2I,                          // narrow i64 -> i32 (truncating)

    // Globals and locals
    GetGlobal(GlobalId),
    SetGlobal(GlobalId),
    GetLocal(u16),
    SetLocal(u16),

    // Lists
    ListGet,                      // pop index, list; push list[index]
    ListSet,                      // pop value, index, list; list[index] = value
    ListPush,                     // pop value, list; append value
    ListLen,                      // pop list; push its length (i32)

    // Control flow
    Jump(LabelRef),
    BrI(Cond, LabelRef),          // pop b, a (i32); branch if a cond b
    BrL(Cond, LabelRef),          // pop b, a (i64); branch if a cond b
    Call(ProcId),
    Ret,                          // return to the caller
    Halt,                         // stop the program

    // I/O primitives
    ArgChars,                     // push a list of the argument code points
    ReadUnit,                     // push the next UTF-16 input unit, -1 at end
    MarkInput,                    // remember the input position (one unit deep)
    ResetInput,                   // rewind input to the marked position
    CloseInput,                   // close the input stream
    PrintChar,                    // pop a code point; write its character
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::PushI(v) => write!(f, "PUSHI {}", v),
            Inst::PushL(v) => write!(f, "PUSHL {}", v),
            Inst::Dup => write!(f, "DUP"),
            Inst::Drop => write!(f, "DROP"),
            Inst::AddI => write!(f, "ADDI"),
            Inst::SubI => write!(f, "SUBI"),
            Inst::MulI => write!(f, "MULI"),
            Inst::NegI => write!(f, "NEGI"),
            Inst::AddL => write!(f, "ADDL"),
            Inst::SubL => write!(f, "SUBL"),
            Inst::I2L => write!(f, "I2L"),
            Inst::L2I => write!(f, "L2I"),
            Inst::GetGlobal(g) => write!(f, "GETG {}", g.0),
            Inst::SetGlobal(g) => write!(f, "SETG {}", g.0),
            Inst::GetLocal(l) => write!(f, "GETL {}", l),
            Inst::SetLocal(l) => write!(f, "SETL {}", l),
            Inst::ListGet => write!(f, "LGET"),
            Inst::ListSet => write!(f, "LSET"),
            Inst::ListPush => write!(f, "LPUSH"),
            Inst::ListLen => write!(f, "LLEN"),
            Inst::Jump(t) => write!(f, "JUMP {}", t.0),
            Inst::BrI(c, t) => write!(f, "BRI.{} {}", c, t.0),
            Inst::BrL(c, t) => write!(f, "BRL.{} {}", c, t.0),
            Inst::Call(p) => write!(f, "CALL {}", p.0),
            Inst::Ret => write!(f, "RET"),
            Inst::Halt => write!(f, "HALT"),
            Inst::ArgChars => write!(f, "ARGCHARS"),
            Inst::ReadUnit => write!(f, "READUNIT"),
            Inst::MarkInput => write!(f, "MARK"),
            Inst::ResetInput => write!(f, "RESET"),
            Inst::CloseInput => write!(f, "CLOSEIN"),
            Inst::PrintChar => write!(f, "PRINTCH"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_display() {
        assert_eq!(format!("{}", Inst::PushI(42)), "PUSHI 42");
        assert_eq!(format!("{}", Inst::BrI(Cond::Lt, LabelRef(3))), "BRI.LT 3");
        assert_eq!(format!("{}", Inst::Call(ProcId(1))), "CALL 1");
        assert_eq!(format!("{}", Inst::Halt), "HALT");
    }

    #[test]
    fn test_cond_roundtrip() {
        for cond in [Cond::Eq, Cond::Ne, Cond::Lt, Cond::Le, Cond::Gt, Cond::Ge] {
            assert_eq!(Cond::from_u8(cond.to_u8()), Some(cond));
        }
        assert_eq!(Cond::from_u8(6), None);
    }
}

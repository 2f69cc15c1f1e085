//! Spool virtual machine
//!
//! Loads a compiled artifact and executes it: a shared operand stack,
//! per-frame local slots, global slots, a list arena, and pluggable
//! input/output for embedding in tests.

pub mod input;
pub mod vm;

pub use input::InputDevice;
pub use vm::{Value, Vm, VmError};

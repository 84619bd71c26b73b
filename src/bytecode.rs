//! The instruction encoding and the builder that assembles it.

pub mod builder;
pub mod instruction;

pub use builder::{BytecodeBuilder, BytecodeModule, FuncId};
pub use instruction::{Instruction, Opcode, MAX_CONSTS_PER_FUNC, MAX_FUNC_REGS};

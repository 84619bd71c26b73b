//! A register-based bytecode VM core for embedding a small scripting
//! language in a host application.
//!
//! The pieces: a [`bytecode`] builder that assembles fixed-width
//! instruction words, a [`Program`] that owns the heap and loaded code,
//! and a [`Vm`] that interprets it. Host applications drive the VM by
//! loading a [`bytecode::BytecodeModule`] into a `Program`, registering
//! any host callables it needs, and calling named functions through
//! [`Vm::call_vm_function`].

pub mod bytecode;
mod error;
mod program;
mod value;
mod vm;

#[cfg(test)]
mod tests;

pub use error::{Error, Result};
pub use program::{Program, ProgramBuilder};
pub use value::{vals_equal, CFunc, CFuncPtr, Value};
pub use vm::Vm;

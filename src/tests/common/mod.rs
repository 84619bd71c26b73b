//! Shared scaffolding for hand-assembling bytecode in tests.
//!
//! There's no compiler in this crate, so tests play that role themselves:
//! build a [`BytecodeBuilder`] module by hand, load it into a fresh
//! [`Program`], and drive it with a [`Vm`].

use crate::bytecode::BytecodeBuilder;
use crate::{Program, Vm};

/// Assembles a module via `build`, loads it into a fresh program, and
/// returns a `Vm` ready to call into it.
pub(crate) fn vm_with(build: impl FnOnce(&mut BytecodeBuilder)) -> Vm {
    let mut builder = BytecodeBuilder::new();
    build(&mut builder);
    let module = builder.finish();
    let mut program = Program::new();
    program
        .load(module)
        .expect("a hand-assembled test module should always load");
    Vm::new(program)
}

//! Call frame bookkeeping.

use crate::value::object::ObjRef;

/// One entry in the VM's call stack.
///
/// Host callables never get a frame: they don't reenter the dispatch loop,
/// so there's nothing for `LDC` or the constant half of an operand lookup
/// to resolve against in their absence. Every pushed frame backs a live
/// bytecode function.
#[derive(Clone, Copy)]
pub(crate) struct Frame {
    pub(crate) func: ObjRef,
    pub(crate) base: usize,
    /// Where to resume in the caller, or `None` for the entry frame
    /// (`call_vm_function`'s own top-level call, which returns out of
    /// `run` entirely rather than resuming a caller's bytecode).
    pub(crate) ret_addr: Option<usize>,
}

//! Heap object header and the non-owning handle that points at it.
//!
//! Objects live in a single intrusive singly-linked list owned by the
//! [`Program`](crate::program::Program) — the same shape as the host crate's
//! `Ptr<T>` (see `object/ptr.rs`), minus the refcount. Nothing here owns an
//! object; the program's object list is the sole owner, which is what makes
//! a tracing collector possible instead of requiring refcounting.

use std::cell::Cell;
use std::ptr::NonNull;

use crate::value::array::Arr;
use crate::value::function::Func;
use crate::value::string::Str;
use crate::value::Value;

pub(crate) struct Object {
    /// Next node in the program's object list. Rewritten during sweep.
    pub(crate) next: Cell<Option<NonNull<Object>>>,
    pub(crate) gc_mark: Cell<bool>,
    pub(crate) kind: ObjectKind,
}

pub(crate) enum ObjectKind {
    Str(Str),
    Array(Arr),
    Func(Func),
}

/// A non-owning handle to a heap object. `Copy`, compared by address.
///
/// Dereferencing is only sound while the program that allocated the object
/// is alive and a collection hasn't swept it — the same contract the host
/// crate's `Ptr<T>` documents for its raw pointer.
#[derive(Clone, Copy)]
pub struct ObjRef(pub(crate) NonNull<Object>);

impl ObjRef {
    pub(crate) fn as_ref(&self) -> &Object {
        unsafe { self.0.as_ref() }
    }

    pub(crate) fn ptr_eq(&self, other: &ObjRef) -> bool {
        self.0 == other.0
    }
}

impl PartialEq for ObjRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl std::fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjRef({:p})", self.0.as_ptr())
    }
}

fn f64_to_index(idx: f64) -> Option<usize> {
    if !idx.is_finite() {
        return None;
    }
    let truncated = idx.trunc();
    if truncated < 0.0 || truncated > usize::MAX as f64 {
        return None;
    }
    Some(truncated as usize)
}

/// `GETEL`'s element-read; truncates a fractional index toward zero, the
/// same as the original VM's implicit `(int)` cast.
pub(crate) fn array_get(arr: ObjRef, idx: f64) -> Option<Value> {
    let i = f64_to_index(idx)?;
    match &arr.as_ref().kind {
        ObjectKind::Array(a) => a.get(i),
        _ => None,
    }
}

/// `SETEL`'s element-write. Returns `false` on an out-of-range index.
pub(crate) fn array_set(arr: ObjRef, idx: f64, val: Value) -> bool {
    let Some(i) = f64_to_index(idx) else {
        return false;
    };
    match &arr.as_ref().kind {
        ObjectKind::Array(a) => a.set(i, val),
        _ => false,
    }
}

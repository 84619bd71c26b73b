//! The mark-sweep collector.
//!
//! Roots are the VM's live register windows (passed in by the caller),
//! the program's anchor stack, and every function ever loaded (a
//! function's own constant pool is never garbage — see
//! `Program::all_funcs_slice`'s docs). Marking follows container objects
//! (arrays, functions) through an intrusive grey worklist threaded via each
//! container's own `gc_next_container` cell, so the mark phase never needs
//! to allocate — important since a collection can be what an allocator is
//! retrying after in the first place.

use std::ptr::NonNull;

use crate::program::Program;
use crate::value::object::{Object, ObjRef, ObjectKind};
use crate::value::Value;

fn push_grey(head: &mut Option<NonNull<Object>>, obj: ObjRef) {
    let is_container = match &obj.as_ref().kind {
        ObjectKind::Array(a) => {
            a.gc_next_container.set(*head);
            true
        }
        ObjectKind::Func(f) => {
            f.gc_next_container.set(*head);
            true
        }
        ObjectKind::Str(_) => false,
    };
    if is_container {
        *head = Some(obj.0);
    }
}

fn pop_grey(head: &mut Option<NonNull<Object>>) -> Option<ObjRef> {
    let ptr = (*head)?;
    let obj = ObjRef(ptr);
    let next = match unsafe { &ptr.as_ref().kind } {
        ObjectKind::Array(a) => a.gc_next_container.take(),
        ObjectKind::Func(f) => f.gc_next_container.take(),
        ObjectKind::Str(_) => None,
    };
    *head = next;
    Some(obj)
}

fn mark_object(obj: ObjRef, grey: &mut Option<NonNull<Object>>) {
    let header = obj.as_ref();
    if header.gc_mark.get() {
        return;
    }
    header.gc_mark.set(true);
    if matches!(header.kind, ObjectKind::Array(_) | ObjectKind::Func(_)) {
        push_grey(grey, obj);
    }
}

fn mark_value(v: Value, grey: &mut Option<NonNull<Object>>) {
    if let Some(obj) = v.heap_ref() {
        mark_object(obj, grey);
    }
}

pub(crate) fn collect(program: &Program, live_stack: &[Value]) {
    let mut grey: Option<NonNull<Object>> = None;

    for v in live_stack {
        mark_value(*v, &mut grey);
    }
    for v in program.anchors_slice() {
        mark_value(v, &mut grey);
    }
    for func in program.all_funcs_slice() {
        mark_object(func, &mut grey);
    }

    while let Some(obj) = pop_grey(&mut grey) {
        match &obj.as_ref().kind {
            ObjectKind::Array(a) => {
                for item in a.iter_values() {
                    mark_value(item, &mut grey);
                }
            }
            ObjectKind::Func(f) => {
                for c in f.consts.iter() {
                    mark_value(*c, &mut grey);
                }
            }
            ObjectKind::Str(_) => {}
        }
    }

    program.sweep();
}

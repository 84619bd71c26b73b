//! Heap array payload.
//!
//! Grounded on the host crate's `object/list.rs` (`RefCell<Vec<Value>>`
//! backing a shared, mutable-through-a-handle array), adapted to the
//! fixed-size-only growth contract this VM specifies: capacity only ever
//! grows in blocks of [`GROWTH_BLOCK`], matching the original C
//! `fh_grow_array`'s 16-element rounding.

use std::cell::{Cell, RefCell};
use std::ptr::NonNull;

use crate::error::Error;
use crate::value::object::Object;
use crate::value::Value;

const GROWTH_BLOCK: usize = 16;

fn round_up(n: usize, block: usize) -> usize {
    if n == 0 {
        0
    } else {
        (n + block - 1) / block * block
    }
}

pub(crate) struct Arr {
    items: RefCell<Vec<Value>>,
    /// Grey-worklist link, used only while a collection is walking
    /// container objects; `None` outside of a collection cycle.
    pub(crate) gc_next_container: Cell<Option<NonNull<Object>>>,
}

impl Arr {
    pub(crate) fn new() -> Self {
        Self {
            items: RefCell::new(Vec::new()),
            gc_next_container: Cell::new(None),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub(crate) fn get(&self, i: usize) -> Option<Value> {
        self.items.borrow().get(i).copied()
    }

    pub(crate) fn set(&self, i: usize, v: Value) -> bool {
        let mut items = self.items.borrow_mut();
        match items.get_mut(i) {
            Some(slot) => {
                *slot = v;
                true
            }
            None => false,
        }
    }

    /// Extend the array by `n` null-filled slots, rounding the backing
    /// capacity up to a multiple of [`GROWTH_BLOCK`].
    pub(crate) fn grow(&self, n: usize) -> Result<(), Error> {
        let mut items = self.items.borrow_mut();
        let old_len = items.len();
        let new_len = old_len
            .checked_add(n)
            .ok_or_else(|| Error::resource("array size overflow"))?;
        if new_len > items.capacity() {
            let new_cap = round_up(new_len, GROWTH_BLOCK);
            items.reserve_exact(new_cap - items.len());
        }
        items.resize(new_len, Value::Null);
        Ok(())
    }

    pub(crate) fn iter_values(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }
}

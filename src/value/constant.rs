//! Builder-side constant pool entries.
//!
//! Grounded on the host crate's `value/constant.rs` `Constant` enum, pared
//! down to what this VM's data model actually needs: a number or a string.
//!
//! `HostFunc` is an addition beyond the two kinds the distilled spec names.
//! Nothing in this crate compiles source text to bytecode, so there is no
//! pass that resolves a call to a registered host function into a constant
//! pool slot the way a real front end would; callers building modules by
//! hand need a way to put a [`CFunc`] value directly into a function's
//! constant pool, so `LDC` can load it like any other constant.
use crate::value::CFunc;

#[derive(Clone)]
pub enum Constant {
    Number(f64),
    String(Box<[u8]>),
    HostFunc(CFunc),
}

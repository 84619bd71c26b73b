//! The program container: heap, constant-promoted bytecode, and the
//! name tables a host uses to drive it.
//!
//! Grounded on the original C `fh_program`/`fh_bc` pairing (one struct
//! owning the object list, the anchor stack, and the loaded code), recast
//! as an owning Rust struct along the lines of the host crate's `Context`
//! (`ctx.rs`) — a single container everything else borrows from.

use std::cell::{Cell, RefCell};
use std::ptr::NonNull;

use indexmap::IndexMap;

use crate::bytecode::{BytecodeModule, Instruction};
use crate::error::Error;
use crate::value::array::Arr;
use crate::value::function::Func;
use crate::value::object::{Object, ObjRef, ObjectKind};
use crate::value::string::Str;
use crate::value::constant::Constant;
use crate::value::{CFunc, CFuncPtr, Value};
use crate::vm::gc;

/// Resource-limit knobs, set once via [`ProgramBuilder`] and fixed for the
/// program's lifetime.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ProgramConfig {
    pub(crate) initial_stack_capacity: usize,
    pub(crate) stack_growth: usize,
    pub(crate) gc_threshold: usize,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            initial_stack_capacity: 64,
            stack_growth: 1024,
            gc_threshold: 4096,
        }
    }
}

/// Builds a [`Program`] with non-default resource limits.
pub struct ProgramBuilder {
    config: ProgramConfig,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            config: ProgramConfig::default(),
        }
    }

    /// How many value slots the VM's register stack starts with.
    pub fn initial_stack_capacity(mut self, n: usize) -> Self {
        self.config.initial_stack_capacity = n;
        self
    }

    /// The block size the register stack grows by once it's too small for
    /// a call.
    pub fn stack_growth(mut self, n: usize) -> Self {
        self.config.stack_growth = n;
        self
    }

    /// Live object count at which `Program::should_collect` starts
    /// returning `true`. Collection is never triggered automatically —
    /// see `Program::should_collect`'s docs.
    pub fn gc_threshold(mut self, n: usize) -> Self {
        self.config.gc_threshold = n;
        self
    }

    pub fn build(self) -> Program {
        Program::with_config(self.config)
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns every heap object, the loaded instruction stream, and the name
/// tables used to look up callable functions.
///
/// Not `Sync`, and effectively not meant to be sent across threads either:
/// object handles are raw non-owning pointers with no synchronization, so
/// a `Program` (and the `Vm` that drives it) is a single-threaded,
/// cooperative-only structure.
pub struct Program {
    objects: Cell<Option<NonNull<Object>>>,
    object_count: Cell<usize>,
    code: Vec<Instruction>,
    anchors: RefCell<Vec<Value>>,
    /// Every function materialized by `load`, named or not — a function's
    /// constant pool (and anything it reaches) is always alive, the same
    /// way a module's code is never garbage in most language runtimes.
    all_funcs: RefCell<Vec<ObjRef>>,
    functions: RefCell<IndexMap<String, ObjRef>>,
    host_funcs: IndexMap<String, CFunc>,
    last_error: RefCell<Option<String>>,
    config: ProgramConfig,
    /// Set by the VM around a host callable invocation, so a collection
    /// triggered from inside host code can still see the register stack
    /// as roots even though the host callable signature only passes it a
    /// `&mut Program`. Cleared once the call returns.
    live_roots: Cell<Option<(NonNull<Value>, usize)>>,
}

// SAFETY markers are intentionally absent: Program holds raw pointers with
// no synchronization and must stay single-threaded, so it does not
// implement Send or Sync.

impl Program {
    pub fn new() -> Self {
        ProgramBuilder::new().build()
    }

    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::new()
    }

    fn with_config(config: ProgramConfig) -> Self {
        Self {
            objects: Cell::new(None),
            object_count: Cell::new(0),
            code: Vec::new(),
            anchors: RefCell::new(Vec::new()),
            all_funcs: RefCell::new(Vec::new()),
            functions: RefCell::new(IndexMap::new()),
            host_funcs: IndexMap::new(),
            last_error: RefCell::new(None),
            config,
            live_roots: Cell::new(None),
        }
    }

    pub(crate) fn config(&self) -> ProgramConfig {
        self.config
    }

    pub(crate) fn code(&self) -> &[Instruction] {
        &self.code
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    pub fn take_last_error(&self) -> Option<String> {
        self.last_error.borrow_mut().take()
    }

    pub(crate) fn set_error(&self, msg: impl Into<String>) {
        *self.last_error.borrow_mut() = Some(msg.into());
    }

    // -- object allocation -------------------------------------------------

    pub(crate) fn alloc_object(&self, kind: ObjectKind) -> ObjRef {
        let obj = Box::new(Object {
            next: Cell::new(self.objects.get()),
            gc_mark: Cell::new(false),
            kind,
        });
        let ptr = NonNull::new(Box::into_raw(obj)).expect("Box::into_raw is never null");
        self.objects.set(Some(ptr));
        self.object_count.set(self.object_count.get() + 1);
        ObjRef(ptr)
    }

    pub fn object_count(&self) -> usize {
        self.object_count.get()
    }

    /// Whether live object count has crossed the configured GC threshold.
    ///
    /// This never triggers a collection by itself — nothing in this crate
    /// calls it automatically. An embedder (or a host callable that
    /// allocates heavily) is expected to check it and call
    /// [`Program::collect`] or [`crate::vm::Vm::collect`] at a point where
    /// it knows which values are still live, the same way the original
    /// design note leaves collector scheduling to the implementer.
    pub fn should_collect(&self) -> bool {
        self.object_count.get() >= self.config.gc_threshold
    }

    /// Runs a mark-sweep collection using the anchor stack, every loaded
    /// function's constant pool, and whatever register stack the VM most
    /// recently registered via `set_live_roots` (empty if none is
    /// currently registered).
    pub fn collect(&self) {
        gc::collect(self, self.live_roots());
    }

    pub(crate) fn set_live_roots(&self, stack: &[Value]) {
        let ptr = NonNull::new(stack.as_ptr() as *mut Value);
        self.live_roots.set(ptr.map(|p| (p, stack.len())));
    }

    pub(crate) fn clear_live_roots(&self) {
        self.live_roots.set(None);
    }

    fn live_roots(&self) -> &[Value] {
        match self.live_roots.get() {
            Some((ptr, len)) => unsafe { std::slice::from_raw_parts(ptr.as_ptr(), len) },
            None => &[],
        }
    }

    pub(crate) fn anchors_slice(&self) -> Vec<Value> {
        self.anchors.borrow().clone()
    }

    pub(crate) fn all_funcs_slice(&self) -> Vec<ObjRef> {
        self.all_funcs.borrow().clone()
    }

    // -- the C-anchor stack --------------------------------------------

    pub(crate) fn anchor_len(&self) -> usize {
        self.anchors.borrow().len()
    }

    pub(crate) fn push_anchor(&self, v: Value) {
        self.anchors.borrow_mut().push(v);
    }

    pub(crate) fn truncate_anchors(&self, n: usize) {
        self.anchors.borrow_mut().truncate(n);
    }

    // -- value constructors ------------------------------------------------

    pub fn new_number(&self, n: f64) -> Value {
        Value::Number(n)
    }

    pub fn new_c_func(&self, f: CFuncPtr) -> Value {
        Value::CFunc(CFunc(f))
    }

    /// Copies `s` onto the heap with a synthesized trailing NUL.
    pub fn new_string(&self, s: &str) -> Value {
        let mut bytes = Vec::with_capacity(s.len() + 1);
        bytes.extend_from_slice(s.as_bytes());
        bytes.push(0);
        self.new_string_value(bytes.into_boxed_slice())
    }

    /// Copies exactly `bytes` onto the heap; no NUL is appended.
    pub fn new_string_n(&self, bytes: &[u8]) -> Value {
        self.new_string_value(bytes.to_vec().into_boxed_slice())
    }

    fn new_string_value(&self, bytes: Box<[u8]>) -> Value {
        let obj = self.alloc_object(ObjectKind::Str(Str::new(bytes)));
        let v = Value::String(obj);
        self.push_anchor(v);
        v
    }

    /// A new, empty array, anchored so it survives a collection triggered
    /// before the caller stores it anywhere reachable.
    pub fn new_array(&self) -> Value {
        let obj = self.alloc_object(ObjectKind::Array(Arr::new()));
        let v = Value::Array(obj);
        self.push_anchor(v);
        v
    }

    /// Extends an array value by `n` null-filled slots. Fails if `v` is not
    /// an array.
    pub fn grow_array(&self, v: Value, n: usize) -> Result<(), Error> {
        match v {
            Value::Array(r) => match &r.as_ref().kind {
                ObjectKind::Array(a) => a.grow(n),
                _ => unreachable!("Array value pointing at a non-Array object"),
            },
            _ => Err(Error::ty("grow_array called on a non-array value")),
        }
    }

    // -- named host functions -----------------------------------------------

    /// Registers a name for calling `call_vm_function`-style by embedders
    /// that don't want to thread a `Value::CFunc` through a constant pool.
    pub fn register_host_func(&mut self, name: impl Into<String>, f: CFuncPtr) {
        self.host_funcs.insert(name.into(), CFunc(f));
    }

    pub fn get_host_func(&self, name: &str) -> Option<CFunc> {
        self.host_funcs.get(name).copied()
    }

    // -- bytecode loading ----------------------------------------------------

    /// Materializes a [`BytecodeModule`] into this program: appends its
    /// instructions to the shared code buffer, promotes each function's
    /// constants to heap `Value`s, and enters named functions into the
    /// name table.
    pub fn load(&mut self, module: BytecodeModule) -> Result<(), Error> {
        let base = self.code.len();
        self.code.extend(module.instr);

        for f in module.funcs {
            let mut consts = Vec::with_capacity(f.consts.len());
            for c in f.consts {
                consts.push(self.materialize_const(c));
            }
            let func = Func {
                name: f.name.clone(),
                code_start: base + f.pc,
                n_params: f.n_params,
                n_regs: f.n_regs,
                consts: consts.into_boxed_slice(),
                gc_next_container: Cell::new(None),
            };
            let obj = self.alloc_object(ObjectKind::Func(func));
            self.all_funcs.borrow_mut().push(obj);
            if let Some(name) = f.name {
                self.functions.borrow_mut().insert(name, obj);
            }
        }
        Ok(())
    }

    fn materialize_const(&self, c: Constant) -> Value {
        match c {
            Constant::Number(n) => Value::Number(n),
            Constant::String(bytes) => {
                let obj = self.alloc_object(ObjectKind::Str(Str::new(bytes)));
                Value::String(obj)
            }
            Constant::HostFunc(f) => Value::CFunc(f),
        }
    }

    pub fn get_func(&self, name: &str) -> Option<ObjRef> {
        self.functions.borrow().get(name).copied()
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        let mut cur = self.objects.get();
        while let Some(ptr) = cur {
            let next = unsafe { ptr.as_ref() }.next.get();
            drop(unsafe { Box::from_raw(ptr.as_ptr()) });
            cur = next;
        }
    }
}

impl Program {
    /// Single-pass mark-sweep sweep: walks the intrusive object list,
    /// clearing and keeping marked nodes, unlinking and freeing the rest.
    pub(crate) fn sweep(&self) {
        let mut prev: Option<NonNull<Object>> = None;
        let mut cur = self.objects.get();
        while let Some(ptr) = cur {
            let obj = unsafe { ptr.as_ref() };
            let next = obj.next.get();
            if obj.gc_mark.get() {
                obj.gc_mark.set(false);
                prev = Some(ptr);
            } else {
                match prev {
                    Some(p) => unsafe { p.as_ref() }.next.set(next),
                    None => self.objects.set(next),
                }
                self.object_count.set(self.object_count.get() - 1);
                drop(unsafe { Box::from_raw(ptr.as_ptr()) });
            }
            cur = next;
        }
    }
}

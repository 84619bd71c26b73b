//! The interpreter: call/return protocol and the instruction dispatch loop.
//!
//! Grounded on the original C `fh_run_vm`'s `changed_stack_frame:`-labeled
//! re-entry point. That label exists in C because `reg_base`/`const_base`
//! are cached raw pointers that must be recomputed after anything that
//! could move the stack. Here the stack is addressed by a plain `usize`
//! frame offset rather than a pointer, so growing `self.stack` (a `Vec`)
//! never invalidates an already-computed `base` — the same discipline,
//! expressed as index arithmetic instead of pointer-reload, which is the
//! natural translation once indices replace pointers.

use crate::bytecode::{Instruction, Opcode, MAX_FUNC_REGS};
use crate::error::Error;
use crate::program::Program;
use crate::value::object::{ObjectKind, ObjRef};
use crate::value::{vals_equal, Value};
use crate::vm::frame::Frame;

mod frame;
pub(crate) mod gc;

/// Drives a [`Program`]'s bytecode. Owns the register stack and call
/// stack; the program itself owns every heap object and the loaded code.
pub struct Vm {
    program: Program,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    pc: usize,
}

impl Vm {
    pub fn new(program: Program) -> Self {
        let cap = program.config().initial_stack_capacity.max(1);
        Self {
            program,
            stack: vec![Value::Null; cap],
            frames: Vec::new(),
            pc: 0,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    pub fn into_program(self) -> Program {
        self.program
    }

    /// Forces a collection, treating the whole register stack as roots in
    /// addition to the program's usual anchor stack and function table.
    pub fn collect(&mut self) {
        self.program.set_live_roots(&self.stack);
        self.program.collect();
        self.program.clear_live_roots();
    }

    fn ensure_stack(&mut self, size: usize) {
        if self.stack.len() < size {
            let growth = self.program.config().stack_growth.max(1);
            let new_len = (size + growth - 1) / growth * growth;
            self.stack.resize(new_len, Value::Null);
        }
    }

    fn fail(&self, err: Error) -> Error {
        self.program.set_error(err.to_string());
        err
    }

    fn func_info(func: ObjRef) -> (usize, u32, u32) {
        match &func.as_ref().kind {
            ObjectKind::Func(fd) => (fd.code_start, fd.n_params, fd.n_regs),
            _ => unreachable!("a Func name table entry pointing at a non-Func object"),
        }
    }

    /// Invokes a named bytecode function with `args`, running it (and
    /// anything it calls) to completion. Not reentrant: must not be called
    /// while another call on this `Vm` is already in progress.
    pub fn call_vm_function(&mut self, name: &str, args: &[Value]) -> Result<Value, Error> {
        assert!(
            self.frames.is_empty(),
            "call_vm_function is not reentrant; the VM is already running"
        );
        let func = self
            .program
            .get_func(name)
            .ok_or_else(|| self.fail(Error::lookup(format!("function `{name}` doesn't exist"))))?;
        let (code_start, n_params, n_regs) = Self::func_info(func);

        let ret_reg = 0usize;
        let args_start = ret_reg + 1;
        self.ensure_stack(args_start + n_regs as usize);
        self.stack[ret_reg] = Value::Null;
        let n_args = args.len().min(n_params as usize);
        for (i, v) in args[..n_args].iter().enumerate() {
            self.stack[args_start + i] = *v;
        }
        for i in n_args..n_regs as usize {
            self.stack[args_start + i] = Value::Null;
        }

        self.frames.push(Frame {
            func,
            base: args_start,
            ret_addr: None,
        });
        self.pc = code_start;
        self.run()?;
        Ok(self.stack[ret_reg])
    }

    /// Resolves a register-or-constant operand: indices up to
    /// `MAX_FUNC_REGS` name a register in the active frame; higher indices
    /// name a constant pool slot.
    fn operand(&self, func: ObjRef, base: usize, index: u32) -> Value {
        if index <= MAX_FUNC_REGS {
            self.stack[base + index as usize]
        } else {
            let k = (index - MAX_FUNC_REGS - 1) as usize;
            match &func.as_ref().kind {
                ObjectKind::Func(fd) => fd.consts[k],
                _ => unreachable!("active frame's func pointing at a non-Func object"),
            }
        }
    }

    fn skip_or_jump(&mut self, taken: bool) {
        if taken {
            self.pc += 1;
        } else {
            let jump_word = self.program.code()[self.pc];
            self.pc = (self.pc as isize + jump_word.rs() as isize + 1) as usize;
        }
    }

    fn run(&mut self) -> Result<(), Error> {
        'dispatch: loop {
            let top = *self.frames.last().expect("run() called with an empty call stack");
            let base = top.base;
            let func_ref = top.func;

            loop {
                let instr: Instruction = self.program.code()[self.pc];
                self.pc += 1;

                let opcode = match instr.checked_opcode() {
                    Some(op) => op,
                    None => return Err(self.fail(Error::internal("invalid opcode bits in instruction word"))),
                };

                match opcode {
                    Opcode::Ldc => {
                        let ra = instr.ra() as usize;
                        let v = match &func_ref.as_ref().kind {
                            ObjectKind::Func(fd) => fd.consts[instr.ru() as usize],
                            _ => unreachable!("active frame's func pointing at a non-Func object"),
                        };
                        self.stack[base + ra] = v;
                    }

                    Opcode::LdNull => {
                        let ra = instr.ra() as usize;
                        self.stack[base + ra] = Value::Null;
                    }

                    Opcode::Mov => {
                        let ra = instr.ra() as usize;
                        let rb = instr.rb() as usize;
                        self.stack[base + ra] = self.stack[base + rb];
                    }

                    Opcode::GetEl => {
                        let ra = instr.ra() as usize;
                        let arr_val = self.operand(func_ref, base, instr.rb());
                        let idx_val = self.operand(func_ref, base, instr.rc());
                        let Value::Array(arr) = arr_val else {
                            return Err(self.fail(Error::ty("invalid element access (non-container object)")));
                        };
                        let Value::Number(idx) = idx_val else {
                            return Err(self.fail(Error::ty("invalid array access (non-numeric index)")));
                        };
                        match crate::value::object::array_get(arr, idx) {
                            Some(item) => self.stack[base + ra] = item,
                            None => return Err(self.fail(Error::bounds("invalid array index"))),
                        }
                    }

                    Opcode::SetEl => {
                        let arr_val = self.stack[base + instr.ra() as usize];
                        let idx_val = self.operand(func_ref, base, instr.rb());
                        let new_val = self.operand(func_ref, base, instr.rc());
                        let Value::Array(arr) = arr_val else {
                            return Err(self.fail(Error::ty("invalid element access (non-container object)")));
                        };
                        let Value::Number(idx) = idx_val else {
                            return Err(self.fail(Error::ty("invalid array access (non-numeric index)")));
                        };
                        if !crate::value::object::array_set(arr, idx, new_val) {
                            return Err(self.fail(Error::bounds("invalid array index")));
                        }
                    }

                    Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
                        let ra = instr.ra() as usize;
                        let lhs = self.operand(func_ref, base, instr.rb());
                        let rhs = self.operand(func_ref, base, instr.rc());
                        let (Value::Number(x), Value::Number(y)) = (lhs, rhs) else {
                            return Err(self.fail(Error::ty("arithmetic on non-numeric values")));
                        };
                        let result = match opcode {
                            Opcode::Add => x + y,
                            Opcode::Sub => x - y,
                            Opcode::Mul => x * y,
                            Opcode::Div => x / y,
                            Opcode::Mod => x % y,
                            _ => unreachable!(),
                        };
                        self.stack[base + ra] = Value::Number(result);
                    }

                    Opcode::Neg => {
                        let ra = instr.ra() as usize;
                        let v = self.operand(func_ref, base, instr.rb());
                        let Value::Number(x) = v else {
                            return Err(self.fail(Error::ty("arithmetic on a non-numeric value")));
                        };
                        self.stack[base + ra] = Value::Number(-x);
                    }

                    Opcode::Not => {
                        let ra = instr.ra() as usize;
                        let v = self.operand(func_ref, base, instr.rb());
                        self.stack[base + ra] = Value::Number(if v.is_truthy() { 0.0 } else { 1.0 });
                    }

                    Opcode::Call => {
                        let call_reg = instr.ra() as usize;
                        let argc = instr.rb() as usize;
                        let callee = self.stack[base + call_reg];
                        let ret_reg = base + call_reg;

                        match callee {
                            Value::Func(func) => {
                                let (code_start, n_params, n_regs) = Self::func_info(func);
                                self.ensure_stack(ret_reg + 1 + n_regs as usize);
                                let args_start = ret_reg + 1;
                                let n_args = argc.min(n_params as usize);
                                for i in n_args..n_params as usize {
                                    self.stack[args_start + i] = Value::Null;
                                }
                                for i in n_params as usize..n_regs as usize {
                                    self.stack[args_start + i] = Value::Null;
                                }
                                self.frames.push(Frame {
                                    func,
                                    base: args_start,
                                    ret_addr: Some(self.pc),
                                });
                                self.pc = code_start;
                                continue 'dispatch;
                            }
                            Value::CFunc(host) => {
                                self.ensure_stack(ret_reg + 1 + argc);
                                let anchor_mark = self.program.anchor_len();
                                self.program.set_live_roots(&self.stack);
                                let args = self.stack[ret_reg + 1..ret_reg + 1 + argc].to_vec();
                                let mut ret_val = Value::Null;
                                let call_result = (host.0)(&mut self.program, &mut ret_val, &args);
                                self.program.clear_live_roots();
                                self.program.truncate_anchors(anchor_mark);
                                match call_result {
                                    Ok(()) => self.stack[ret_reg] = ret_val,
                                    Err(e) => return Err(self.fail(e)),
                                }
                            }
                            _ => return Err(self.fail(Error::ty("call to non-function value"))),
                        }
                    }

                    Opcode::Jmp => {
                        self.pc = (self.pc as isize + instr.rs() as isize) as usize;
                    }

                    Opcode::Test => {
                        let ra = instr.ra() as usize;
                        let invert = instr.rb() != 0;
                        let taken = self.stack[base + ra].is_truthy() ^ invert;
                        self.skip_or_jump(taken);
                    }

                    Opcode::CmpEq | Opcode::CmpLt | Opcode::CmpLe => {
                        let invert = instr.ra() != 0;
                        let lhs = self.operand(func_ref, base, instr.rb());
                        let rhs = self.operand(func_ref, base, instr.rc());
                        let taken = match opcode {
                            Opcode::CmpEq => vals_equal(&lhs, &rhs),
                            Opcode::CmpLt | Opcode::CmpLe => {
                                let (Value::Number(x), Value::Number(y)) = (lhs, rhs) else {
                                    return Err(self.fail(Error::ty("comparison between non-numeric values")));
                                };
                                if opcode == Opcode::CmpLt {
                                    x < y
                                } else {
                                    x <= y
                                }
                            }
                            _ => unreachable!(),
                        } ^ invert;
                        self.skip_or_jump(taken);
                    }

                    Opcode::Ret => {
                        let has_val = instr.rb() != 0;
                        let result = if has_val {
                            self.stack[base + instr.ra() as usize]
                        } else {
                            Value::Null
                        };
                        let frame = self.frames.pop().expect("RET with an empty call stack");
                        self.stack[frame.base - 1] = result;
                        match frame.ret_addr {
                            Some(addr) => {
                                self.pc = addr;
                                continue 'dispatch;
                            }
                            None => return Ok(()),
                        }
                    }
                }
            }
        }
    }
}

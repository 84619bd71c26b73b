use crate::bytecode::{Instruction, Opcode};
use crate::Value;

use super::common::vm_with;

#[test]
fn cmp_lt_branches_around_a_negate() {
    // fn abs(a) {
    //   if a < 0 { a = -a }
    //   return a
    // }
    let mut vm = vm_with(|b| {
        let f = b.add_func("abs", 1, 1);
        let zero = b.add_const_number(f, 0.0);
        let zero_operand = crate::bytecode::MAX_FUNC_REGS + 1 + zero;

        // CMP_LT taken (a < 0 is true) skips the jump and falls into NEG;
        // otherwise the jump steps over NEG straight to RET.
        let cmp_offset = b.add_instr(Instruction::new(Opcode::CmpLt, 0, 0, zero_operand));
        let jump_offset = b.add_instr(Instruction::with_rs(Opcode::Jmp, 0, 0));
        b.add_instr(Instruction::new(Opcode::Neg, 0, 0, 0));
        let ret_offset = b.add_instr(Instruction::new(Opcode::Ret, 0, 1, 0));

        let displacement = ret_offset as i32 - (jump_offset as i32 + 1);
        b.patch_instr(jump_offset, Instruction::with_rs(Opcode::Jmp, 0, displacement));
        let _ = cmp_offset;
    });

    assert_eq!(vm.call_vm_function("abs", &[Value::Number(-4.0)]).unwrap().as_number(), Some(4.0));
    assert_eq!(vm.call_vm_function("abs", &[Value::Number(4.0)]).unwrap().as_number(), Some(4.0));
    assert_eq!(vm.call_vm_function("abs", &[Value::Number(0.0)]).unwrap().as_number(), Some(0.0));
}

#[test]
fn test_opcode_inverts_on_request() {
    // fn is_falsy(a) {
    //   if a { return 0 }
    //   return 1
    // }
    let mut vm = vm_with(|b| {
        let f = b.add_func("is_falsy", 1, 1);
        let one = b.add_const_number(f, 1.0);
        let zero = b.add_const_number(f, 0.0);

        // TEST r0, invert=1: taken (skip the jump) when a is falsy, which
        // falls straight into the "return 1" branch below.
        b.add_instr(Instruction::new(Opcode::Test, 0, 1, 0));
        let jump_offset = b.add_instr(Instruction::with_rs(Opcode::Jmp, 0, 0));
        b.add_instr(Instruction::with_ru(Opcode::Ldc, 0, one));
        b.add_instr(Instruction::new(Opcode::Ret, 0, 1, 0));
        let truthy_branch = b.add_instr(Instruction::with_ru(Opcode::Ldc, 0, zero));
        b.add_instr(Instruction::new(Opcode::Ret, 0, 1, 0));

        let displacement = truthy_branch as i32 - (jump_offset as i32 + 1);
        b.patch_instr(jump_offset, Instruction::with_rs(Opcode::Jmp, 0, displacement));
    });

    assert_eq!(vm.call_vm_function("is_falsy", &[Value::Number(0.0)]).unwrap().as_number(), Some(1.0));
    assert_eq!(vm.call_vm_function("is_falsy", &[Value::Null]).unwrap().as_number(), Some(1.0));
    assert_eq!(vm.call_vm_function("is_falsy", &[Value::Number(5.0)]).unwrap().as_number(), Some(0.0));
}

#[test]
fn cmp_eq_and_jmp_select_between_two_branches() {
    // fn choose(a, b) {
    //   if a == b { return a }
    //   return b
    // }
    let mut vm = vm_with(|b| {
        let f = b.add_func("choose", 2, 2);
        let cmp_offset = b.add_instr(Instruction::new(Opcode::CmpEq, 0, 0, 1));
        let jump_to_else = b.add_instr(Instruction::with_rs(Opcode::Jmp, 0, 0));
        let ret_a = b.add_instr(Instruction::new(Opcode::Ret, 0, 1, 0));
        let ret_b = b.add_instr(Instruction::new(Opcode::Ret, 1, 1, 0));

        let displacement = ret_b as i32 - (jump_to_else as i32 + 1);
        b.patch_instr(jump_to_else, Instruction::with_rs(Opcode::Jmp, 0, displacement));
        let _ = cmp_offset;
        let _ = ret_a;
        let _ = f;
    });

    let result = vm
        .call_vm_function("choose", &[Value::Number(3.0), Value::Number(3.0)])
        .unwrap();
    assert_eq!(result.as_number(), Some(3.0));

    let result = vm
        .call_vm_function("choose", &[Value::Number(3.0), Value::Number(9.0)])
        .unwrap();
    assert_eq!(result.as_number(), Some(9.0));
}

#[test]
fn unconditional_jmp_skips_forward() {
    // fn skip(a) {
    //   goto after
    //   a = -1   (unreachable)
    // after:
    //   return a
    // }
    let mut vm = vm_with(|b| {
        b.add_func("skip", 1, 1);
        let jump_offset = b.add_instr(Instruction::with_rs(Opcode::Jmp, 0, 0));
        b.add_instr(Instruction::new(Opcode::Neg, 0, 0, 0));
        let ret_offset = b.add_instr(Instruction::new(Opcode::Ret, 0, 1, 0));

        let displacement = ret_offset as i32 - (jump_offset as i32 + 1);
        b.patch_instr(jump_offset, Instruction::with_rs(Opcode::Jmp, 0, displacement));
    });

    let result = vm.call_vm_function("skip", &[Value::Number(7.0)]).unwrap();
    assert_eq!(result.as_number(), Some(7.0));
}

use crate::bytecode::{Instruction, Opcode};

use super::common::vm_with;

#[test]
fn unreachable_object_is_freed_by_a_forced_collection() {
    let mut vm = vm_with(|_| {});
    vm.program_mut().new_string("temporary");
    let before = vm.program().object_count();

    vm.program_mut().truncate_anchors(0);
    vm.collect();

    assert_eq!(vm.program().object_count(), before - 1);
}

#[test]
fn object_reachable_only_via_the_anchor_stack_survives() {
    let mut vm = vm_with(|_| {});
    vm.program_mut().new_string("anchored");
    let before = vm.program().object_count();

    vm.collect();

    assert_eq!(vm.program().object_count(), before);
}

#[test]
fn object_reachable_only_via_the_register_stack_survives() {
    // fn identity(a) { return a }
    let mut vm = vm_with(|b| {
        b.add_func("identity", 1, 1);
        b.add_instr(Instruction::new(Opcode::Ret, 0, 1, 0));
    });

    let s = vm.program_mut().new_string("kept");
    vm.call_vm_function("identity", &[s]).unwrap();
    // The string is no longer anchored, but the call left it sitting in a
    // stale register slot that a forced collection still treats as a root.
    vm.program_mut().truncate_anchors(0);

    let before = vm.program().object_count();
    vm.collect();

    assert_eq!(vm.program().object_count(), before);
}

#[test]
fn object_reachable_transitively_through_an_array_survives() {
    let mut vm = vm_with(|_| {});
    let arr = vm.program_mut().new_array();
    vm.program_mut().grow_array(arr, 1).unwrap();
    let s = vm.program_mut().new_string("nested");
    arr.array_set(0, s);

    // Keep the array's own anchor entry, drop the string's.
    vm.program_mut().truncate_anchors(1);

    let before = vm.program().object_count();
    vm.collect();

    assert_eq!(vm.program().object_count(), before);
    assert_eq!(arr.array_get(0).unwrap().as_bytes(), Some(b"nested".as_slice()));
}

#[test]
fn array_and_its_elements_are_freed_once_unreachable() {
    let mut vm = vm_with(|_| {});
    let arr = vm.program_mut().new_array();
    vm.program_mut().grow_array(arr, 1).unwrap();
    let s = vm.program_mut().new_string("gone");
    arr.array_set(0, s);

    let before = vm.program().object_count();
    vm.program_mut().truncate_anchors(0);
    vm.collect();

    assert_eq!(vm.program().object_count(), before - 2);
}

#[test]
fn a_function_is_always_rooted_through_the_program_even_unanchored() {
    let mut vm = vm_with(|b| {
        b.add_func("noop", 0, 1);
        b.add_instr(Instruction::new(Opcode::Ret, 0, 0, 0));
    });

    let before = vm.program().object_count();
    vm.collect();

    assert_eq!(vm.program().object_count(), before);
    assert!(vm.program().get_func("noop").is_some());
}

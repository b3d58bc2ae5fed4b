// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end interpreter scenarios (spec §8 "End-to-end scenarios",
//! numbered 1-7 matching the spec's table).

mod support;

use slate_vm_runtime::{MethodSlot, Vm};
use slate_vm_types::{Opcode, Value};
use support::FnBuilder;

#[test]
fn scenario_1_constant_and_end() {
    let mut vm = Vm::new();
    let mut f = FnBuilder::new();
    let k = f.constant(Value::number(42.0));
    f.op1(Opcode::Constant, k);
    f.op(Opcode::End);
    let entry = f.finish(&mut vm);

    let result = vm.interpret(entry).unwrap();
    assert_eq!(result, Value::number(42.0));
}

/// Builds `<cond>; JUMP_IF else; CONSTANT 0(1); JUMP end; else: CONSTANT 1(2);
/// end: END`, matching the spec's scenario-2/3 schematic program, for either
/// literal condition opcode.
fn build_branch_program(vm: &mut Vm, cond: Opcode) -> slate_vm_types::ObjRef {
    let mut f = FnBuilder::new();
    f.op(cond);
    let jif = f.jump_placeholder(Opcode::JumpIf);
    let one = f.constant(Value::number(1.0));
    f.op1(Opcode::Constant, one);
    let jmp = f.jump_placeholder(Opcode::Jump);
    f.patch_jump_here(jif);
    let two = f.constant(Value::number(2.0));
    f.op1(Opcode::Constant, two);
    f.patch_jump_here(jmp);
    f.op(Opcode::End);
    f.finish(vm)
}

#[test]
fn scenario_2_jump_if_not_taken_on_true() {
    let mut vm = Vm::new();
    let entry = build_branch_program(&mut vm, Opcode::True);
    assert_eq!(vm.interpret(entry).unwrap(), Value::number(1.0));
}

#[test]
fn scenario_3_jump_if_taken_on_false() {
    let mut vm = Vm::new();
    let entry = build_branch_program(&mut vm, Opcode::False);
    assert_eq!(vm.interpret(entry).unwrap(), Value::number(2.0));
}

#[test]
fn scenario_4_class_new_produces_an_instance_of_that_class() {
    let mut vm = Vm::new();
    let c_global = vm.ensure_global_symbol("C").unwrap();
    let new_sym = vm.methods().find_symbol("new").expect("'new' is interned at VM construction");

    let mut f = FnBuilder::new();
    f.op(Opcode::Class);
    f.op1(Opcode::StoreGlobal, c_global.to_index() as u8);
    f.op(Opcode::Pop);
    f.op1(Opcode::LoadGlobal, c_global.to_index() as u8);
    f.op1(Opcode::Call0, new_sym.to_index() as u8);
    f.op(Opcode::End);
    let entry = f.finish(&mut vm);

    let result = vm.interpret(entry).unwrap();
    let class_obj = vm.find_global("C").unwrap().as_obj();
    let instance = result.as_obj();
    assert_eq!(vm.heap().as_instance(instance).class_obj, class_obj);
}

#[test]
fn scenario_5_user_defined_method_dispatch() {
    let mut vm = Vm::new();

    let mut body = FnBuilder::new();
    let seven = body.constant(Value::number(7.0));
    body.op1(Opcode::Constant, seven);
    body.op(Opcode::End);
    let body_fn = body.finish(&mut vm);

    let c_global = vm.ensure_global_symbol("C").unwrap();
    let m_sym = vm.methods_mut().ensure_symbol("m").unwrap();
    let new_sym = vm.methods().find_symbol("new").unwrap();

    let mut main = FnBuilder::new();
    main.op(Opcode::Class);
    let body_const = main.constant(Value::object(body_fn));
    main.op2(Opcode::Method, m_sym.to_index() as u8, body_const);
    main.op1(Opcode::StoreGlobal, c_global.to_index() as u8);
    main.op(Opcode::Pop);
    main.op1(Opcode::LoadGlobal, c_global.to_index() as u8);
    main.op1(Opcode::Call0, new_sym.to_index() as u8);
    main.op1(Opcode::Call0, m_sym.to_index() as u8);
    main.op(Opcode::End);
    let entry = main.finish(&mut vm);

    let result = vm.interpret(entry).unwrap();
    assert_eq!(result, Value::number(7.0));
}

#[test]
fn scenario_6_subclass_override_does_not_affect_superclass_instances() {
    let mut vm = Vm::new();

    let mut base_body = FnBuilder::new();
    let seven = base_body.constant(Value::number(7.0));
    base_body.op1(Opcode::Constant, seven);
    base_body.op(Opcode::End);
    let base_body_fn = base_body.finish(&mut vm);

    let mut sub_body = FnBuilder::new();
    let nine = sub_body.constant(Value::number(9.0));
    sub_body.op1(Opcode::Constant, nine);
    sub_body.op(Opcode::End);
    let sub_body_fn = sub_body.finish(&mut vm);

    let m_sym = vm.methods_mut().ensure_symbol("m").unwrap();

    let object_class = vm.builtin_classes().object;
    let base_class = vm.new_class(Some(object_class)).unwrap();
    vm.heap_mut().as_class_mut(base_class).methods[m_sym.to_index()] = MethodSlot::Block(base_body_fn);

    // `new_class` flattens a copy of `base_class`'s method table at creation
    // time (spec §4.C "inheritance by flattening"), so binding `m` on the
    // subclass *after* this point overrides only the subclass's own slot.
    let sub_class = vm.new_class(Some(base_class)).unwrap();
    vm.heap_mut().as_class_mut(sub_class).methods[m_sym.to_index()] = MethodSlot::Block(sub_body_fn);

    let base_instance = vm.new_instance(base_class);
    let sub_instance = vm.new_instance(sub_class);

    let mut call_on = |receiver: Value| {
        let mut f = FnBuilder::new();
        let k = f.constant(receiver);
        f.op1(Opcode::Constant, k);
        f.op1(Opcode::Call0, m_sym.to_index() as u8);
        f.op(Opcode::End);
        let entry = f.finish(&mut vm);
        vm.interpret(entry).unwrap()
    };

    assert_eq!(call_on(Value::object(base_instance)), Value::number(7.0));
    assert_eq!(call_on(Value::object(sub_instance)), Value::number(9.0));
}

#[test]
fn scenario_7_pinned_survives_gc_unpinned_does_not() {
    let mut vm = Vm::new();

    let pinned = vm.new_string(b"kept alive");
    vm.pin(Value::object(pinned));

    for i in 0..64 {
        let _garbage = vm.new_string(format!("garbage-{i}").as_bytes());
    }

    let before = vm.heap().total_allocated();
    let stats = vm.collect_garbage();

    assert_eq!(stats.objects_freed, 64);
    assert!(stats.bytes_freed > 0);
    assert_eq!(vm.heap().total_allocated(), before - stats.bytes_freed);
    assert_eq!(vm.heap().as_string(pinned).display(), "kept alive");

    vm.unpin(Value::object(pinned)).unwrap();
}

/// Exercises the `MethodSlot::None` dispatch-failure path directly, rounding
/// out the fatal-error taxonomy (spec §7, §4.D dispatch step 4 `none`).
#[test]
fn dispatch_on_unimplemented_method_is_a_method_not_found_error() {
    let mut vm = Vm::new();
    let unimplemented = vm.methods_mut().ensure_symbol("frobnicate").unwrap();

    let mut f = FnBuilder::new();
    f.op(Opcode::Null);
    f.op1(Opcode::Call0, unimplemented.to_index() as u8);
    f.op(Opcode::End);
    let entry = f.finish(&mut vm);

    let err = vm.interpret(entry).unwrap_err();
    assert!(matches!(err, slate_vm_runtime::VmError::MethodNotFound { .. }));
}

/// `MethodSlot::is_none` sanity check against a symbol nothing ever bound,
/// used by the dispatch-failure test above; kept here since it only needs
/// `Vm`/`MethodSlot`, not the builder.
#[test]
fn fresh_builtin_classes_have_no_user_methods_bound() {
    let vm = Vm::new();
    let b = vm.builtin_classes();
    let sym = vm.methods().find_symbol("new").unwrap();
    // `new` IS bound -- on the metaclass, not the class itself.
    assert!(!matches!(
        vm.heap().as_class(b.object).methods[sym.to_index()],
        MethodSlot::None
    ));
}

/// Exercises the embedding-API path for `Vm::new_function` (spec §6) end to
/// end, independent of `FnBuilder`: allocate the function on the heap first,
/// then fill its bytecode/constants in place through `Heap::as_fn_mut`, the
/// same order a real compiler would use against this crate's public surface.
#[test]
fn new_function_can_be_filled_in_place_via_as_fn_mut() {
    let mut vm = Vm::new();
    let entry = vm.new_function();

    let k = vm.heap_mut().as_fn_mut(entry).add_constant(Value::number(11.0));
    vm.heap_mut().as_fn_mut(entry).emit_byte(Opcode::Constant as u8);
    vm.heap_mut().as_fn_mut(entry).emit_byte(k);
    vm.heap_mut().as_fn_mut(entry).emit_byte(Opcode::End as u8);

    let result = vm.interpret(entry).unwrap();
    assert_eq!(result, Value::number(11.0));
}

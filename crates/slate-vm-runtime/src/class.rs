// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Class/metaclass construction (spec §4.C "Class construction").

use slate_vm_types::{ObjRef, Value, MAX_SYMBOLS};

use crate::error::VmError;
use crate::object::{MethodSlot, Object, ObjClass};
use crate::vm::Vm;

fn new_single_class(
    vm: &mut Vm,
    metaclass: Option<ObjRef>,
    superclass: Option<ObjRef>,
) -> Result<ObjRef, VmError> {
    let class = ObjClass::new(metaclass, superclass, MAX_SYMBOLS);
    Ok(vm.allocate(Object::Class(class)))
}

/// Builds a class and its metaclass together (spec §4.C "Class construction
/// (`new_class(vm, superclass)`)"), steps 1–5 verbatim:
///
/// 1. create the metaclass (itself classless and superclassless),
/// 2. pin it so the class's own allocation can't collect it,
/// 3. create the class, pointing its `metaclass` at the pinned one,
/// 4. unpin the metaclass,
/// 5. flatten-copy the superclass's method table into the new class, if any.
pub fn new_class(vm: &mut Vm, superclass: Option<ObjRef>) -> Result<ObjRef, VmError> {
    let metaclass = new_single_class(vm, None, None)?;
    vm.pin(Value::object(metaclass));

    let class = new_single_class(vm, Some(metaclass), superclass);
    vm.unpin(Value::object(metaclass))?;
    let class = class?;

    if let Some(super_ref) = superclass {
        copy_method_slots(vm, super_ref, class);
    }

    Ok(class)
}

/// Inheritance by flattening (spec §4.C "Method-slot copying"): the
/// subclass's table starts as a full copy of the superclass's. No dynamic
/// superclass traversal ever happens at dispatch time afterward.
fn copy_method_slots(vm: &mut Vm, from: ObjRef, to: ObjRef) {
    let slots: Vec<MethodSlot> = vm.heap().as_class(from).methods.clone();
    vm.heap_mut().as_class_mut(to).methods = slots;
}

/// Installed unconditionally on every freshly created metaclass by
/// `CODE_CLASS`/`CODE_SUBCLASS` (spec §4.D "Class-creation quirk").
/// Allocates an instance whose `classObj` is the receiver, i.e. the class
/// whose metaclass dispatched us. Does not invoke any user-defined
/// initializer (spec §9: "noted as TODO").
pub fn primitive_metaclass_new(vm: &mut Vm, args: &[Value]) -> Result<Value, VmError> {
    let receiver_class = args[0].as_obj();
    let instance = vm.new_instance(receiver_class);
    Ok(Value::object(instance))
}

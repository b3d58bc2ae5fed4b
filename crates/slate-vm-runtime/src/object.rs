// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Heap object payloads that need VM/fiber context: classes, instances, and
//! the method-slot union (spec §3 "Object header", "ObjClass",
//! "ObjInstance"). `ObjString` and `ObjFn`, which need no such context, live
//! in `slate-vm-types` instead (see `SPEC_FULL.md` §2).

use slate_vm_types::{ObjFn, ObjRef, ObjString, Value};

use crate::error::VmError;
use crate::vm::Vm;

/// Signature of a native method body: `(vm, args) -> Value` (spec §3 "Each
/// slot is one of: ... primitive"). `args` includes the receiver at index 0,
/// per the dispatch convention in spec §4.D.
///
/// The spec's own illustrative signature also threads a `fiber` parameter
/// alongside `vm`, but `Fiber` is a field owned by `Vm`, not a sibling of it,
/// so a primitive that needs the operand stack or call frames reaches them
/// through `vm.fiber()` instead. Dropping the parameter here keeps `Vm` the
/// sole owner of `Fiber` at all times, so a GC triggered by a primitive's own
/// allocation always has the live fiber to root from (see `Vm::dispatch_call`).
pub type PrimitiveFn = fn(&mut Vm, &[Value]) -> Result<Value, VmError>;

/// One entry in a class's method table (spec §3, §9 "Dynamic dispatch").
#[derive(Clone, Copy)]
pub enum MethodSlot {
    /// Not implemented; dispatch fails.
    None,
    /// Native function pointer.
    Primitive(PrimitiveFn),
    /// A user-defined bytecode function (an `ObjRef` to an `ObjFn`).
    Block(ObjRef),
}

impl MethodSlot {
    pub fn is_none(&self) -> bool {
        matches!(self, MethodSlot::None)
    }
}

/// A class object (spec §3 "ObjClass").
pub struct ObjClass {
    /// Null only during bootstrap (spec §3 "Metaclass invariant").
    pub metaclass: Option<ObjRef>,
    /// Null for the root `Object` class.
    pub superclass: Option<ObjRef>,
    /// Fixed-capacity method table indexed by method-symbol id.
    pub methods: Vec<MethodSlot>,
}

impl ObjClass {
    pub fn new(metaclass: Option<ObjRef>, superclass: Option<ObjRef>, capacity: usize) -> Self {
        ObjClass {
            metaclass,
            superclass,
            methods: vec![MethodSlot::None; capacity],
        }
    }

    pub fn heap_size(&self) -> usize {
        std::mem::size_of::<ObjClass>() + self.methods.capacity() * std::mem::size_of::<MethodSlot>()
    }
}

/// An instance of a user-defined class (spec §3 "ObjInstance"). Fields are
/// reserved for future extension; this engine implements nothing beyond the
/// class pointer, matching the spec's explicit scope.
pub struct ObjInstance {
    pub class_obj: ObjRef,
}

impl ObjInstance {
    pub fn new(class_obj: ObjRef) -> Self {
        ObjInstance { class_obj }
    }

    pub fn heap_size(&self) -> usize {
        std::mem::size_of::<ObjInstance>()
    }
}

/// The union of everything that can live in a heap slot (spec §3 "Object
/// header (shared prefix)": `type` tag plus payload). Closed over exactly
/// the four variants the spec names, which is what makes `get_class`'s match
/// exhaustive at compile time (see `SPEC_FULL.md` §9).
pub enum Object {
    String(ObjString),
    Function(ObjFn),
    Class(ObjClass),
    Instance(ObjInstance),
}

impl Object {
    pub fn heap_size(&self) -> usize {
        match self {
            Object::String(s) => s.heap_size(),
            Object::Function(f) => f.heap_size(),
            Object::Class(c) => c.heap_size(),
            Object::Instance(i) => i.heap_size(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::String(_) => "string",
            Object::Function(_) => "fn",
            Object::Class(_) => "class",
            Object::Instance(_) => "instance",
        }
    }
}

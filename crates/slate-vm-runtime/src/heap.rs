// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Allocation tracking and mark-and-sweep collection (spec §4.B).
//!
//! The object header's intrusive `next` pointer (spec §3) is realized here
//! as a slot index into a single table, per the arena-plus-index scheme the
//! spec's own design notes sanction (§9): a `GcRef`-shaped [`ObjRef`] is just
//! a `Copy` index, sweep walks the table in slot order instead of following
//! links, and there is no raw pointer anywhere in this module.

use slate_vm_types::{ObjRef, Value};
use tracing::debug;

use crate::config::{HeapConfig, GC_GROWTH_DENOMINATOR, GC_GROWTH_NUMERATOR};
use crate::error::VmError;
use crate::object::{MethodSlot, Object};

struct Slot {
    marked: bool,
    object: Object,
}

/// Outcome of one `collect_garbage` call, surfaced for logging and tests
/// (spec §8 invariant 7: "`totalAllocated` decreases by the sum of freed
/// sizes").
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollectionStats {
    pub objects_freed: usize,
    pub bytes_freed: usize,
}

pub struct Heap {
    slots: Vec<Option<Slot>>,
    free: Vec<u32>,
    total_allocated: usize,
    next_gc: usize,
    pinned: Vec<Value>,
    config: HeapConfig,
}

impl Heap {
    pub fn new(config: HeapConfig) -> Self {
        let next_gc = config.initial_next_gc;
        Heap {
            slots: Vec::new(),
            free: Vec::new(),
            total_allocated: 0,
            next_gc,
            pinned: Vec::new(),
            config,
        }
    }

    pub fn total_allocated(&self) -> usize {
        self.total_allocated
    }

    pub fn next_gc(&self) -> usize {
        self.next_gc
    }

    pub fn object_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// True once the allocation policy (spec §4.B) says a collection should
    /// run before the next allocation proceeds.
    pub fn should_collect(&self) -> bool {
        self.config.stress_gc || self.total_allocated > self.next_gc
    }

    /// Links a newly constructed object into the heap (spec §4.B
    /// `init_obj`: "links `obj` into the all-objects list, clears flags,
    /// sets type"; the slot-table insertion plays that role here) and
    /// accounts its size against `totalAllocated`.
    ///
    /// Callers are responsible for calling [`Heap::should_collect`] /
    /// running a collection *before* this, per the spec's allocation
    /// policy ordering; see `slate-vm-runtime::vm::Vm::allocate`.
    pub fn insert(&mut self, object: Object) -> ObjRef {
        self.total_allocated += object.heap_size();
        let slot = Slot {
            marked: false,
            object,
        };
        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Some(slot);
            ObjRef::from_index(idx)
        } else {
            self.slots.push(Some(slot));
            ObjRef::from_index((self.slots.len() - 1) as u32)
        }
    }

    fn slot(&self, r: ObjRef) -> &Slot {
        self.slots[r.index() as usize]
            .as_ref()
            .expect("dangling ObjRef: slot was swept or never allocated")
    }

    fn slot_mut(&mut self, r: ObjRef) -> &mut Slot {
        self.slots[r.index() as usize]
            .as_mut()
            .expect("dangling ObjRef: slot was swept or never allocated")
    }

    pub fn get(&self, r: ObjRef) -> &Object {
        &self.slot(r).object
    }

    pub fn get_mut(&mut self, r: ObjRef) -> &mut Object {
        &mut self.slot_mut(r).object
    }

    // -- Narrowing accessors (spec §4.A: "their preconditions are the
    // caller's; violation is undefined behavior at the design level"). Each
    // panics on a type mismatch instead, which is the safe-Rust rendition of
    // that contract.

    pub fn as_string(&self, r: ObjRef) -> &slate_vm_types::ObjString {
        match self.get(r) {
            Object::String(s) => s,
            other => panic!("as_string called on a {}", other.type_name()),
        }
    }

    pub fn as_fn(&self, r: ObjRef) -> &slate_vm_types::ObjFn {
        match self.get(r) {
            Object::Function(f) => f,
            other => panic!("as_fn called on a {}", other.type_name()),
        }
    }

    pub fn as_fn_mut(&mut self, r: ObjRef) -> &mut slate_vm_types::ObjFn {
        match self.get_mut(r) {
            Object::Function(f) => f,
            other => panic!("as_fn called on a {}", other.type_name()),
        }
    }

    pub fn as_class(&self, r: ObjRef) -> &crate::object::ObjClass {
        match self.get(r) {
            Object::Class(c) => c,
            other => panic!("as_class called on a {}", other.type_name()),
        }
    }

    pub fn as_class_mut(&mut self, r: ObjRef) -> &mut crate::object::ObjClass {
        match self.get_mut(r) {
            Object::Class(c) => c,
            other => panic!("as_class called on a {}", other.type_name()),
        }
    }

    pub fn as_instance(&self, r: ObjRef) -> &crate::object::ObjInstance {
        match self.get(r) {
            Object::Instance(i) => i,
            other => panic!("as_instance called on a {}", other.type_name()),
        }
    }

    // -- Pin stack (spec §4.B "pin_obj/unpin_obj"). --

    pub fn pin(&mut self, value: Value) {
        self.pinned.push(value);
    }

    /// Unpins the most recently pinned value. Fatal (per spec §7 "Pin-stack
    /// misuse") if `value` does not match the top of the pin stack, which
    /// catches both out-of-order unpinning and unpinning more than was
    /// pinned.
    pub fn unpin(&mut self, value: Value) -> Result<(), VmError> {
        match self.pinned.pop() {
            Some(top) if top == value => Ok(()),
            Some(top) => {
                self.pinned.push(top);
                Err(VmError::PinStackMisuse)
            }
            None => Err(VmError::PinStackMisuse),
        }
    }

    pub fn pinned(&self) -> &[Value] {
        &self.pinned
    }

    /// Runs a full mark-and-sweep (spec §4.B "Mark phase" / "Sweep phase").
    ///
    /// `roots` supplies every value the VM and fiber consider directly
    /// reachable: non-null globals, pinned values, each active frame's
    /// function, and every value currently on the operand stack (spec §4.B
    /// "Mark phase", items 1–4). This module only needs to recurse *within*
    /// the heap from there.
    pub fn collect_garbage(&mut self, roots: impl IntoIterator<Item = Value>) -> CollectionStats {
        debug!(total_allocated = self.total_allocated, "gc: starting mark-and-sweep");

        let mut worklist: Vec<ObjRef> = roots
            .into_iter()
            .filter_map(|v| if v.is_obj() { Some(v.as_obj()) } else { None })
            .collect();

        while let Some(r) = worklist.pop() {
            let idx = r.index() as usize;
            let already_marked = match &self.slots[idx] {
                Some(slot) => slot.marked,
                None => continue,
            };
            if already_marked {
                continue;
            }
            self.slots[idx].as_mut().unwrap().marked = true;

            match &self.slots[idx].as_ref().unwrap().object {
                Object::Class(class) => {
                    if let Some(meta) = class.metaclass {
                        worklist.push(meta);
                    }
                    for slot in &class.methods {
                        if let MethodSlot::Block(f) = slot {
                            worklist.push(*f);
                        }
                    }
                    // `superclass` is deliberately not marked (spec §4.B
                    // "Mark phase" / §9 open question, see DESIGN.md).
                }
                Object::Function(f) => {
                    for constant in f.constants() {
                        if constant.is_obj() {
                            worklist.push(constant.as_obj());
                        }
                    }
                }
                Object::String(_) | Object::Instance(_) => {
                    // No outgoing references to mark (spec §4.B "Mark
                    // phase": "instances have no user fields yet").
                }
            }
        }

        let stats = self.sweep();
        self.next_gc = (self.total_allocated * GC_GROWTH_NUMERATOR) / GC_GROWTH_DENOMINATOR;
        debug!(
            objects_freed = stats.objects_freed,
            bytes_freed = stats.bytes_freed,
            next_gc = self.next_gc,
            "gc: mark-and-sweep complete"
        );
        stats
    }

    fn sweep(&mut self) -> CollectionStats {
        let mut stats = CollectionStats::default();
        for idx in 0..self.slots.len() {
            match &mut self.slots[idx] {
                Some(slot) if slot.marked => {
                    slot.marked = false;
                }
                Some(slot) => {
                    stats.objects_freed += 1;
                    stats.bytes_freed += slot.object.heap_size();
                    self.slots[idx] = None;
                    self.free.push(idx as u32);
                }
                None => {}
            }
        }
        self.total_allocated = self.total_allocated.saturating_sub(stats.bytes_freed);
        stats
    }
}

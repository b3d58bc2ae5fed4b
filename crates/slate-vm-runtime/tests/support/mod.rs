// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A minimal in-tree bytecode assembler standing in for the external
//! compiler the spec places out of scope (spec §1 "Out of scope", §8
//! "End-to-end scenarios"). Builds `ObjFn` byte/constant arrays directly,
//! the way a real compiler's code generator would, then publishes the
//! result onto a `Vm`'s heap.

use slate_vm_runtime::{Object, Vm};
use slate_vm_types::{ObjFn, ObjRef, Opcode, Value};

pub struct FnBuilder {
    f: ObjFn,
}

impl FnBuilder {
    pub fn new() -> Self {
        FnBuilder { f: ObjFn::new() }
    }

    pub fn op(&mut self, opcode: Opcode) -> &mut Self {
        self.f.emit_byte(opcode as u8);
        self
    }

    pub fn op1(&mut self, opcode: Opcode, a: u8) -> &mut Self {
        self.f.emit_byte(opcode as u8);
        self.f.emit_byte(a);
        self
    }

    pub fn op2(&mut self, opcode: Opcode, a: u8, b: u8) -> &mut Self {
        self.f.emit_byte(opcode as u8);
        self.f.emit_byte(a);
        self.f.emit_byte(b);
        self
    }

    pub fn constant(&mut self, value: Value) -> u8 {
        self.f.add_constant(value)
    }

    /// Emits a jump-family opcode with a placeholder offset byte, returning
    /// the offset byte's position for a later [`FnBuilder::patch_jump_here`].
    pub fn jump_placeholder(&mut self, opcode: Opcode) -> usize {
        self.f.emit_byte(opcode as u8);
        self.f.emit_byte(0);
        self.f.bytecode().len() - 1
    }

    /// Back-patches the offset emitted by `jump_placeholder` so the jump
    /// lands exactly at the current end of the bytecode stream (spec §4.D
    /// "JUMP o: ip += o").
    pub fn patch_jump_here(&mut self, offset_pos: usize) {
        let ip_after_operand = offset_pos + 1;
        let target = self.f.bytecode().len();
        let delta = target - ip_after_operand;
        self.f
            .patch_byte(offset_pos, u8::try_from(delta).expect("jump distance fits a byte"));
    }

    /// Publishes the assembled function onto `vm`'s heap, returning a
    /// handle usable as a `CALL_n`/`METHOD` block target or as the root
    /// passed to `Vm::interpret`.
    pub fn finish(self, vm: &mut Vm) -> ObjRef {
        vm.allocate(Object::Function(self.f))
    }
}

impl Default for FnBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Compiled bytecode function payload (spec §3 "ObjFn").

use crate::value::Value;

/// A bytecode program: a byte array of instructions and a value array of
/// constants. An external compiler fills both; the interpreter treats them
/// as read-only (spec §3).
#[derive(Clone, Debug, Default)]
pub struct ObjFn {
    bytecode: Vec<u8>,
    constants: Vec<Value>,
}

impl ObjFn {
    pub fn new() -> Self {
        ObjFn {
            bytecode: Vec::new(),
            constants: Vec::new(),
        }
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    /// Appends one raw bytecode byte (opcode or immediate operand) and
    /// returns its offset. Compiler-facing.
    pub fn emit_byte(&mut self, byte: u8) -> usize {
        self.bytecode.push(byte);
        self.bytecode.len() - 1
    }

    /// Patches a previously emitted byte, used by the compiler to back-patch
    /// forward jump offsets.
    pub fn patch_byte(&mut self, offset: usize, byte: u8) {
        self.bytecode[offset] = byte;
    }

    /// Appends a constant, returning its index. Compiler-facing; panics if
    /// the function already holds `u8::MAX + 1` constants, matching the
    /// spec's 8-bit `CONSTANT k` operand limit (spec §4.D "Limits").
    pub fn add_constant(&mut self, value: Value) -> u8 {
        assert!(
            self.constants.len() <= u8::MAX as usize,
            "function already holds the maximum of {} constants",
            u8::MAX as usize + 1
        );
        self.constants.push(value);
        (self.constants.len() - 1) as u8
    }

    pub fn heap_size(&self) -> usize {
        std::mem::size_of::<ObjFn>()
            + self.bytecode.capacity()
            + self.constants.capacity() * std::mem::size_of::<Value>()
    }
}

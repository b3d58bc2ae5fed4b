// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The call-frame stack driving bytecode execution (spec §3 "Fiber", §4.D).
//!
//! Per spec §5, there is exactly one fiber and it never suspends: "Fiber"
//! here just names the active operand stack plus call-frame stack, not a
//! switchable coroutine.

use slate_vm_types::{ObjRef, Value};

/// One active function invocation (spec §3 "CallFrame").
#[derive(Clone, Copy)]
pub struct CallFrame {
    /// The `ObjFn` this frame is executing.
    pub function: ObjRef,
    /// Index of the next instruction byte to execute.
    pub ip: usize,
    /// Index into the fiber's operand stack at which this frame's
    /// receiver/locals begin.
    pub stack_start: usize,
}

pub struct Fiber {
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    max_frames: usize,
}

impl Fiber {
    pub fn new(max_frames: usize) -> Self {
        Fiber {
            stack: Vec::new(),
            frames: Vec::new(),
            max_frames,
        }
    }

    // -- Operand stack --

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.stack.pop()
    }

    pub fn peek(&self) -> Option<Value> {
        self.stack.last().copied()
    }

    pub fn set(&mut self, index: usize, value: Value) {
        self.stack[index] = value;
    }

    pub fn get(&self, index: usize) -> Value {
        self.stack[index]
    }

    pub fn truncate(&mut self, len: usize) {
        self.stack.truncate(len);
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn stack_slice(&self) -> &[Value] {
        &self.stack
    }

    // -- Call frames --

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    pub fn current_frame_mut(&mut self) -> Option<&mut CallFrame> {
        self.frames.last_mut()
    }

    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Pushes a new call frame. Returns `false` if doing so would exceed
    /// `max_frames` (spec §7 "Stack overflow / frame overflow"; see
    /// `SPEC_FULL.md` §4.D "Frame-depth guard").
    #[must_use]
    pub fn push_frame(&mut self, function: ObjRef, stack_start: usize) -> bool {
        if self.frames.len() >= self.max_frames {
            return false;
        }
        self.frames.push(CallFrame {
            function,
            ip: 0,
            stack_start,
        });
        true
    }

    pub fn pop_frame(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }
}

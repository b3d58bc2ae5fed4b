// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Heap, garbage collector, class model, and bytecode interpreter for the
//! slate VM core (spec §4.B–D).
//!
//! This crate depends on `slate-vm-types` for the inert data shapes (`Value`,
//! `ObjString`, `ObjFn`, `Opcode`) and adds everything that needs VM context:
//! the slot-table heap and mark-and-sweep collector (`heap`), the symbol
//! table and class/metaclass construction (`symbol`, `class`), the
//! class/instance/method-slot object payloads (`object`), the call-frame
//! fiber (`fiber`), the fatal-error taxonomy (`error`), tunable VM
//! configuration (`config`), and the `Vm` singleton tying it all together
//! and driving the bytecode dispatch loop (`vm`).

pub mod class;
pub mod config;
pub mod error;
pub mod fiber;
pub mod heap;
pub mod object;
pub mod symbol;
pub mod vm;

pub use error::VmError;
pub use fiber::{CallFrame, Fiber};
pub use heap::{CollectionStats, Heap};
pub use object::{MethodSlot, Object, ObjClass, ObjInstance, PrimitiveFn};
pub use symbol::{SymbolId, SymbolTable};
pub use vm::{BuiltinClasses, Vm};

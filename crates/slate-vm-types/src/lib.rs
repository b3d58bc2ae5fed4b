// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Tagged values and object-layout types shared by the slate VM core.
//!
//! This crate holds the data shapes an external compiler needs to produce a
//! runnable [`objfn::ObjFn`] without linking the interpreter or collector:
//! [`value::Value`], [`obj_string::ObjString`], [`objfn::ObjFn`], and the
//! [`opcode::Opcode`] table. Everything with allocation or dispatch behavior,
//! namely the class/instance object model, the heap, the symbol table, and
//! the interpreter, lives in `slate-vm-runtime`, which depends on this crate.

#[cfg(feature = "fuzzing")]
pub mod fuzz;
pub mod obj_string;
pub mod objfn;
pub mod opcode;
pub mod value;

pub use obj_string::ObjString;
pub use objfn::ObjFn;
pub use opcode::Opcode;
pub use value::{ObjRef, Value};

/// Capacity of a class's method-slot array / the VM's method and global
/// symbol tables, dictated by the 8-bit symbol-id operands in the bytecode
/// format (spec §3 "SymbolTable", §4.D "Limits").
pub const MAX_SYMBOLS: usize = 256;

/// Maximum constants per function / locals per frame, dictated by the same
/// 8-bit operand width (spec §4.D "Limits").
pub const MAX_CONSTANTS: usize = 256;
pub const MAX_LOCALS: usize = 256;

/// Maximum forward-jump distance representable by a single `u8` offset
/// operand (spec §4.D "Limits").
pub const MAX_JUMP: usize = u8::MAX as usize;

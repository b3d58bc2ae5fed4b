// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Fatal-error taxonomy (spec §7).
//!
//! The source has no unwinding model and no user-visible error type: every
//! condition listed here is fatal and, in the source, prints a diagnostic
//! and terminates the process. This crate keeps that "no recovery, no
//! resumption" semantics but surfaces it as a `Result` so an embedder can
//! decide how to report it instead of this library calling
//! `std::process::exit` on its behalf (see `SPEC_FULL.md` §7).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VmError {
    /// Method not implemented on the receiver's class (spec §4.D dispatch,
    /// slot type `none`).
    #[error("'{selector}' not implemented on receiver")]
    MethodNotFound { selector: String },

    /// `unpin_obj` was called out of LIFO order, or more times than
    /// `pin_obj` (spec §4.B "pin_obj/unpin_obj").
    #[error("pin stack misuse: unpin did not match the most recent pin")]
    PinStackMisuse,

    /// A name was registered past the symbol table's fixed capacity (spec
    /// §3 "SymbolTable", capacity `MAX_SYMBOLS`).
    #[error("symbol table exhausted: more than {limit} distinct symbols")]
    SymbolTableOverflow { limit: usize },

    /// `add_symbol` was called with a name that is already registered (spec
    /// §4.C: "fails with `duplicate`... if name exists").
    #[error("symbol '{name}' already registered")]
    DuplicateSymbol { name: String },

    /// The call-frame array grew past its configured cap (spec §7 "Stack
    /// overflow / frame overflow: explicitly TODO in source").
    #[error("fiber call-frame stack overflow: more than {limit} active frames")]
    FiberFrameOverflow { limit: usize },

    /// The bytecode stream references an opcode byte this interpreter does
    /// not recognize. Not named explicitly in the spec's error taxonomy, but
    /// required by "the compiler's contract with the VM" (spec §3, invariant
    /// 5): a malformed program is a contract violation, not silent UB.
    #[error("invalid opcode byte {byte} at offset {offset}")]
    InvalidOpcode { byte: u8, offset: usize },

    /// The operand stack was popped while empty. Like `InvalidOpcode`, this
    /// guards the compiler/interpreter contract rather than adding new
    /// user-facing behavior.
    #[error("operand stack underflow")]
    StackUnderflow,
}

// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Heap-owned byte string payload (spec §3 "ObjString").

/// A heap-owned byte sequence.
///
/// The spec permits either NUL-terminated storage with length recovered by
/// scanning, or an explicit length field ("specification permits an explicit
/// length field, preferred"). This uses the preferred explicit-length form:
/// a plain owned `Vec<u8>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjString {
    bytes: Vec<u8>,
}

impl ObjString {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        ObjString {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Size in bytes this object accounts against `totalAllocated`: header
    /// plus text bytes plus the NUL terminator the spec's C layout reserves
    /// (kept for size-accounting parity even though this representation does
    /// not itself store a terminator).
    pub fn heap_size(&self) -> usize {
        std::mem::size_of::<ObjString>() + self.bytes.len() + 1
    }

    /// Lossy UTF-8 rendering for `print_value` (spec §6: "strings by
    /// content").
    pub fn display(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

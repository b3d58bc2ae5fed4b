// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! VM-wide tunables, threaded in at construction rather than hard-coded
//! globals (spec §9 "a systems-language implementation should make `VM` an
//! ordinary owned value... and never rely on globals"). Mirrors the
//! teacher's `consensus_config::Parameters` pattern: a plain config struct
//! passed in, not a `static`.

/// Initial GC threshold: 1 MiB (spec §4.B "Allocation policy").
pub const DEFAULT_NEXT_GC: usize = 1024 * 1024;

/// Threshold growth factor applied after every collection (spec §4.B:
/// `nextGC = totalAllocated * 3/2`).
pub const GC_GROWTH_NUMERATOR: usize = 3;
pub const GC_GROWTH_DENOMINATOR: usize = 2;

#[derive(Clone, Debug)]
pub struct HeapConfig {
    /// Bytes allocated before the first automatic collection.
    pub initial_next_gc: usize,
    /// When true, a collection is attempted before every single allocation
    /// regardless of threshold (spec §4.B: "A debug mode may collect on
    /// every allocation").
    pub stress_gc: bool,
    /// Cap on simultaneously active call frames (spec §7 supplement, see
    /// `SPEC_FULL.md` §4.D "Frame-depth guard").
    pub max_frames: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            initial_next_gc: DEFAULT_NEXT_GC,
            stress_gc: false,
            max_frames: 256,
        }
    }
}

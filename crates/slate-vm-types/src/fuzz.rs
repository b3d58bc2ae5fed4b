// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Proptest value generators, gated behind the `fuzzing` feature. Mirrors
//! the optional `proptest`/`fuzzing` feature on the teacher's own leaf types
//! crate (`move-vm-types`'s `fuzzing` feature wraps `proptest` the same way).

use proptest::prelude::*;

use crate::value::{ObjRef, Value};

/// A strategy over non-object `Value`s (no heap is available at this layer
/// to mint valid `ObjRef`s against, so object-carrying values are generated
/// by callers in `slate-vm-runtime` that do have a heap).
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::False),
        Just(Value::True),
        Just(Value::Null),
        Just(Value::NoValue),
        any::<f64>().prop_filter("no NaN payload noise", |n| !n.is_nan()).prop_map(Value::Number),
    ]
}

/// A strategy over raw slot indices, useful for exercising `ObjRef`
/// round-tripping independent of any real heap.
pub fn obj_ref_strategy() -> impl Strategy<Value = ObjRef> {
    any::<u32>().prop_map(ObjRef::from_index)
}

proptest! {
    #[test]
    fn obj_ref_index_roundtrips(idx in any::<u32>()) {
        prop_assert_eq!(ObjRef::from_index(idx).index(), idx);
    }
}

//! Builtin shape set
//!
//! Shapes common to embedding signatures: scalar arithmetic, receivers with
//! small argument lists, float vectors and large by-value structs. Programs
//! with other signatures generate their own set with `bridge_shapes!` and
//! register both with a [`Dispatcher`](crate::Dispatcher).

crate::bridge_shapes! {
    // Void
    "v",
    "vi4",
    "vi8",
    "vi8i4",
    "vi8i8",
    "vi8sr",

    // Integers
    "i1i1",
    "i2i2",
    "i4",
    "i4i4",
    "i4i4i4",
    "i4i8",
    "i4i8i4",
    "i4i8sr",
    "i8",
    "i8i8",
    "i8i8i8",
    "i8i8i16",
    "u1i8",
    "u2i8",

    // Floats
    "r4r4",
    "r4r4r4",
    "r8r8",
    "r8r8r8",
    "r8i8r8",

    // Small aggregates
    "i16i16",
    "vf2vf2",
    "vf3vf3",
    "vf4vf4",
    "vd2vd2",
    "vd3vd3",
    "vd4vd4",

    // Large aggregates
    "S24i8",
    "S24S24",
    "S32sr",
}

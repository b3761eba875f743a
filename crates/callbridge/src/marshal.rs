//! Carrier types and slot marshalling
//!
//! Each slot kind is carried across the native boundary by one Rust type
//! whose `extern "C"` lowering matches the native treatment of that kind:
//!
//! | kind             | carrier            |
//! |------------------|--------------------|
//! | `i1 i2 i4 i8`    | `i8 i16 i32 i64`   |
//! | `u1 u2`          | `u8 u16`           |
//! | `r4 r8`          | `f32 f64`          |
//! | `i16`            | `Aggregate<16>`    |
//! | `vf2..vf4`       | `Vector2f..4f`     |
//! | `vd2..vd4`       | `Vector2d..4d`     |
//! | `S{n}`, n > 16   | `Aggregate<n>`     |
//! | `S{n}`, n <= 16  | `SpilledAggregate<n - 3>` |
//! | `sr`             | `StructRef`        |
//!
//! [`Marshal`] moves a carrier between its native form and a frame slot.

use std::ffi::c_void;
use std::fmt;
use std::mem;

use crate::frame::{FrameValue, StackSlot};

/// Moves a carrier value between native arguments and interpreter slots.
///
/// # Safety
///
/// Implementations must only touch the slots a value of the kind occupies.
pub unsafe trait Marshal: Sized {
    /// Build the native argument from the interpreter slot at `slot`.
    ///
    /// # Safety
    ///
    /// `slot` must point to the value's slots inside a live frame.
    unsafe fn load_arg(slot: *mut StackSlot) -> Self;

    /// Store an incoming native argument into the N2M frame slot `slot`.
    ///
    /// # Safety
    ///
    /// `slot` must be writable, and `value` must outlive the interpreted
    /// call when the kind is stored by address.
    unsafe fn store_arg(value: &Self, slot: *mut StackSlot);
}

macro_rules! marshal_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            unsafe impl Marshal for $ty {
                #[inline(always)]
                unsafe fn load_arg(slot: *mut StackSlot) -> Self {
                    unsafe { slot.cast::<$ty>().read() }
                }

                #[inline(always)]
                unsafe fn store_arg(value: &Self, slot: *mut StackSlot) {
                    unsafe {
                        slot.write(StackSlot::ZERO);
                        slot.cast::<$ty>().write(*value);
                    }
                }
            }
        )*
    };
}

marshal_scalar!(i8, i16, i32, i64, u8, u16, f32, f64);

// Aggregates are inline in M2N frames and referenced by address in N2M frames.
macro_rules! marshal_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            unsafe impl Marshal for $ty {
                #[inline(always)]
                unsafe fn load_arg(slot: *mut StackSlot) -> Self {
                    unsafe { slot.cast::<$ty>().read_unaligned() }
                }

                #[inline(always)]
                unsafe fn store_arg(value: &Self, slot: *mut StackSlot) {
                    unsafe { slot.write(StackSlot::from_ptr(value as *const $ty)) }
                }
            }

            unsafe impl FrameValue for $ty {}
        )*
    };
}

marshal_by_value!(Vector2f, Vector3f, Vector4f, Vector2d, Vector3d, Vector4d);

/// Opaque struct of `N` bytes.
///
/// Carries `i16` (two integer registers) and `S{n}` values above 16 bytes,
/// which every supported ABI passes in memory or through a hidden pointer
/// whatever their alignment.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(C, align(8))]
pub struct Aggregate<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> Aggregate<N> {
    pub const fn zeroed() -> Self {
        Self { bytes: [0; N] }
    }

    pub const fn from_bytes(bytes: [u8; N]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8; N] {
        &mut self.bytes
    }

    /// Read a field at byte `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the field extends past `N`.
    pub fn get<T: FrameValue>(&self, offset: usize) -> T {
        assert!(
            offset + mem::size_of::<T>() <= N,
            "field at {} overruns {}-byte aggregate",
            offset,
            N
        );
        unsafe { self.bytes.as_ptr().add(offset).cast::<T>().read_unaligned() }
    }

    /// Write a field at byte `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the field extends past `N`.
    pub fn set<T: FrameValue>(&mut self, offset: usize, value: T) {
        assert!(
            offset + mem::size_of::<T>() <= N,
            "field at {} overruns {}-byte aggregate",
            offset,
            N
        );
        unsafe {
            self.bytes
                .as_mut_ptr()
                .add(offset)
                .cast::<T>()
                .write_unaligned(value)
        }
    }
}

impl<const N: usize> Default for Aggregate<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const N: usize> fmt::Debug for Aggregate<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aggregate<{}>(", N)?;
        for byte in &self.bytes {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

unsafe impl<const N: usize> FrameValue for Aggregate<N> {}

unsafe impl<const N: usize> Marshal for Aggregate<N> {
    #[inline(always)]
    unsafe fn load_arg(slot: *mut StackSlot) -> Self {
        unsafe { slot.cast::<Self>().read() }
    }

    #[inline(always)]
    unsafe fn store_arg(value: &Self, slot: *mut StackSlot) {
        unsafe { slot.write(StackSlot::from_ptr(value as *const Self)) }
    }
}

/// Struct of `3 + TAIL` bytes, at most 16, that stays out of registers.
///
/// Carries `S{n}` values of up to 16 bytes. The `u16` at offset 1 is
/// misaligned, which makes the SysV classifier put the whole value in
/// MEMORY, and the unpadded size (never 1, 2, 4 or 8 for the shapes the
/// classifier produces on Win64) sends it by reference on Win64.
#[derive(Copy)]
#[repr(C, packed)]
#[allow(dead_code)] // fields exist for their layout; access goes through the bytes
pub struct SpilledAggregate<const TAIL: usize> {
    head: u8,
    misaligned: u16,
    tail: [u8; TAIL],
}

impl<const TAIL: usize> SpilledAggregate<TAIL> {
    /// Byte size of the carried struct.
    pub const SIZE: usize = 3 + TAIL;

    pub const fn zeroed() -> Self {
        Self {
            head: 0,
            misaligned: 0,
            tail: [0; TAIL],
        }
    }

    /// Build from the struct's bytes.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is not exactly [`SIZE`](Self::SIZE) long.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        assert_eq!(
            bytes.len(),
            Self::SIZE,
            "expected {} bytes for spilled aggregate",
            Self::SIZE
        );
        let mut value = Self::zeroed();
        value.as_bytes_mut().copy_from_slice(bytes);
        value
    }

    pub fn as_bytes(&self) -> &[u8] {
        // Packed: no padding, every byte is initialized.
        unsafe { std::slice::from_raw_parts((self as *const Self).cast::<u8>(), Self::SIZE) }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut((self as *mut Self).cast::<u8>(), Self::SIZE) }
    }

    /// Read a field at byte `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the field extends past the struct.
    pub fn get<T: FrameValue>(&self, offset: usize) -> T {
        assert!(
            offset + mem::size_of::<T>() <= Self::SIZE,
            "field at {} overruns {}-byte aggregate",
            offset,
            Self::SIZE
        );
        unsafe { self.as_bytes().as_ptr().add(offset).cast::<T>().read_unaligned() }
    }

    /// Write a field at byte `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the field extends past the struct.
    pub fn set<T: FrameValue>(&mut self, offset: usize, value: T) {
        assert!(
            offset + mem::size_of::<T>() <= Self::SIZE,
            "field at {} overruns {}-byte aggregate",
            offset,
            Self::SIZE
        );
        unsafe {
            self.as_bytes_mut()
                .as_mut_ptr()
                .add(offset)
                .cast::<T>()
                .write_unaligned(value)
        }
    }
}

impl<const TAIL: usize> Clone for SpilledAggregate<TAIL> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<const TAIL: usize> Default for SpilledAggregate<TAIL> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const TAIL: usize> PartialEq for SpilledAggregate<TAIL> {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<const TAIL: usize> Eq for SpilledAggregate<TAIL> {}

impl<const TAIL: usize> fmt::Debug for SpilledAggregate<TAIL> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpilledAggregate<{}>(", Self::SIZE)?;
        for byte in self.as_bytes() {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

unsafe impl<const TAIL: usize> FrameValue for SpilledAggregate<TAIL> {}

unsafe impl<const TAIL: usize> Marshal for SpilledAggregate<TAIL> {
    #[inline(always)]
    unsafe fn load_arg(slot: *mut StackSlot) -> Self {
        unsafe { slot.cast::<Self>().read_unaligned() }
    }

    #[inline(always)]
    unsafe fn store_arg(value: &Self, slot: *mut StackSlot) {
        unsafe { slot.write(StackSlot::from_ptr(value as *const Self)) }
    }
}

/// Two `f32` lanes, an HFA of two floats.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Vector2f {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Vector3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Vector4f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

/// Two `f64` lanes, an HFA of two doubles.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Vector2d {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Vector3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Vector4d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

/// Pointer to a struct the callee may read and mutate in place.
///
/// M2N passes the address of the struct's frame slots, so writes through it
/// land in the interpreter frame. N2M stores the incoming pointer in the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct StructRef(*mut c_void);

impl StructRef {
    pub const fn new(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    pub fn from_mut<T>(value: &mut T) -> Self {
        Self((value as *mut T).cast())
    }

    pub const fn as_ptr(self) -> *mut c_void {
        self.0
    }

    pub const fn cast<T>(self) -> *mut T {
        self.0.cast()
    }
}

unsafe impl Marshal for StructRef {
    #[inline(always)]
    unsafe fn load_arg(slot: *mut StackSlot) -> Self {
        Self(slot.cast())
    }

    #[inline(always)]
    unsafe fn store_arg(value: &Self, slot: *mut StackSlot) {
        unsafe { slot.write(StackSlot::from_ptr(value.0)) }
    }
}

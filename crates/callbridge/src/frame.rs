//! Interpreter stack frames
//!
//! A frame is a window of 8-byte slots owned by the interpreter. A value at
//! slot index `i` occupies `ceil(size / 8)` consecutive slots starting at `i`,
//! and its address is `base + i * 8`.
//!
//! # Memory Layout
//!
//! ```text
//! ┌────────────────────────────────────────┐  ← base + len * 8
//! │ slot 3  (second half of a 16B struct)  │
//! │ slot 2  (first half of a 16B struct)   │
//! │ slot 1  i32 in the low 4 bytes         │
//! │ slot 0  i64 / object reference         │
//! └────────────────────────────────────────┘  ← base
//! ```
//!
//! The safe accessors assert bounds in every build. Raw slot pointers handed
//! to trampolines are only checked in debug builds.

use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use callbridge_abi::WORD_SIZE;

/// One interpreter stack slot.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(C, align(8))]
pub struct StackSlot(u64);

const _: () = assert!(mem::size_of::<StackSlot>() == WORD_SIZE);

impl StackSlot {
    /// All-zero slot
    pub const ZERO: StackSlot = StackSlot(0);

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Slot holding a pointer, as N2M frames store aggregate arguments.
    #[inline]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize as u64)
    }

    /// Pointer held in the slot.
    #[inline]
    pub fn as_ptr<T>(self) -> *mut T {
        self.0 as usize as *mut T
    }
}

impl fmt::Debug for StackSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StackSlot({:#018x})", self.0)
    }
}

/// Number of slots a value of `size` bytes occupies. Never zero.
#[inline]
pub const fn slots_for(size: usize) -> usize {
    let slots = size.div_ceil(WORD_SIZE);
    if slots == 0 {
        1
    } else {
        slots
    }
}

/// Plain-old-data types that may be copied in and out of frame slots.
///
/// # Safety
///
/// Every bit pattern of the type's size must be a valid value and the type
/// must have no drop glue.
pub unsafe trait FrameValue: Copy + 'static {}

macro_rules! frame_value {
    ($($ty:ty),* $(,)?) => {
        $(unsafe impl FrameValue for $ty {})*
    };
}

frame_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, StackSlot);

unsafe impl<T: 'static> FrameValue for *const T {}
unsafe impl<T: 'static> FrameValue for *mut T {}

/// Window of interpreter slots.
///
/// Borrows the slots for `'a`; trampolines receive it by value and the
/// interpreter reads arguments and writes results through it.
pub struct StackFrame<'a> {
    base: NonNull<StackSlot>,
    len: usize,
    _marker: PhantomData<&'a mut [StackSlot]>,
}

impl<'a> StackFrame<'a> {
    /// Frame over an owned slot buffer.
    pub fn from_slice(slots: &'a mut [StackSlot]) -> Self {
        Self {
            len: slots.len(),
            base: NonNull::from(slots).cast(),
            _marker: PhantomData,
        }
    }

    /// Frame over interpreter-owned memory.
    ///
    /// # Safety
    ///
    /// `base` must be non-null, 8-byte aligned and valid for reads and writes
    /// of `len` slots for `'a`, with no other live references into them.
    pub unsafe fn from_raw_parts(base: *mut StackSlot, len: usize) -> Self {
        debug_assert!(!base.is_null(), "frame base is null");
        Self {
            base: unsafe { NonNull::new_unchecked(base) },
            len,
            _marker: PhantomData,
        }
    }

    /// Number of slots in the frame
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Base of the frame, as passed to M2N trampolines.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut StackSlot {
        self.base.as_ptr()
    }

    #[inline]
    pub fn as_ptr(&self) -> *const StackSlot {
        self.base.as_ptr()
    }

    /// Raw pointer to slot `index`.
    #[inline]
    pub fn slot_ptr(&self, index: usize) -> *mut StackSlot {
        debug_assert!(
            index < self.len,
            "slot {} out of bounds (len={})",
            index,
            self.len
        );
        self.base.as_ptr().wrapping_add(index)
    }

    /// Address of the value stored at slot `index`.
    #[inline]
    pub fn address_of(&self, index: usize) -> *mut c_void {
        self.slot_ptr(index).cast()
    }

    /// Whether a value of `size` bytes at slot `index` lies inside the frame.
    #[inline]
    pub fn fits(&self, index: usize, size: usize) -> bool {
        index
            .checked_add(slots_for(size))
            .is_some_and(|end| end <= self.len)
    }

    /// Read the value stored at slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if the value extends past the end of the frame.
    pub fn read<T: FrameValue>(&self, index: usize) -> T {
        self.check(index, mem::size_of::<T>());
        unsafe { self.slot_ptr(index).cast::<T>().read_unaligned() }
    }

    /// Store `value` at slot `index`, zeroing the slots it covers first.
    ///
    /// # Panics
    ///
    /// Panics if the value extends past the end of the frame.
    pub fn write<T: FrameValue>(&mut self, index: usize, value: T) {
        let size = mem::size_of::<T>();
        self.check(index, size);
        unsafe {
            let slot = self.slot_ptr(index);
            for offset in 0..slots_for(size) {
                slot.add(offset).write(StackSlot::ZERO);
            }
            slot.cast::<T>().write_unaligned(value);
        }
    }

    /// Read a value through the pointer stored at slot `index`.
    ///
    /// N2M frames hold aggregate arguments this way.
    ///
    /// # Safety
    ///
    /// The slot must hold a pointer valid for reading a `T`.
    pub unsafe fn read_indirect<T: FrameValue>(&self, index: usize) -> T {
        let ptr: *const T = self.read::<StackSlot>(index).as_ptr();
        unsafe { ptr.read_unaligned() }
    }

    /// The frame's slots.
    pub fn as_slice(&self) -> &[StackSlot] {
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }

    fn check(&self, index: usize, size: usize) {
        assert!(
            self.fits(index, size),
            "value of {} bytes at slot {} overruns frame (len={})",
            size,
            index,
            self.len
        );
    }
}

impl fmt::Debug for StackFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackFrame")
            .field("base", &self.base)
            .field("len", &self.len)
            .finish()
    }
}

//! Runtime seam and calling convention
//!
//! Defines the C-ABI interface between generated trampolines and the
//! embedding interpreter. Trampolines call back into the runtime only through
//! the [`Runtime`] trait, resolved statically per instantiation.

use std::ffi::c_void;
use std::fmt;

use crate::frame::{StackFrame, StackSlot};

/// Uniform signature of every M2N trampoline
///
/// The interpreter calls native code through this shape-independent entry:
/// the method, per-parameter slot indexes into the frame, the frame base and
/// the return buffer (unused for `v` shapes).
pub type M2nFn = unsafe extern "C" fn(
    method: MethodHandle,
    arg_var_indexes: *const u16, // one index per parameter
    local_var_base: *mut StackSlot,
    ret: *mut c_void,
);

/// Opaque runtime handle for a method
///
/// Passed through trampolines unchanged and forwarded to the native callee as
/// its trailing argument.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct MethodHandle(*const c_void);

// Handles are identities; the runtime owns whatever they point to.
unsafe impl Send for MethodHandle {}
unsafe impl Sync for MethodHandle {}

impl MethodHandle {
    pub const NULL: MethodHandle = MethodHandle(std::ptr::null());

    pub const fn from_ptr(ptr: *const c_void) -> Self {
        Self(ptr)
    }

    /// Handle naming a runtime-side method descriptor.
    pub fn from_ref<T>(descriptor: &T) -> Self {
        Self((descriptor as *const T).cast())
    }

    pub const fn as_ptr(self) -> *const c_void {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodHandle({:p})", self.0)
    }
}

/// Services the embedding interpreter provides to trampolines.
///
/// Implementations must be safe to call concurrently from any thread that
/// enters a trampoline.
pub trait Runtime: 'static {
    /// Bytes between a boxed value type's object pointer and its payload.
    const OBJECT_HEADER_SIZE: usize;

    /// Native entry point for `method`.
    ///
    /// # Safety
    ///
    /// `method` must be a handle this runtime issued for a method with a
    /// native implementation.
    unsafe fn native_entry(method: MethodHandle) -> *const ();

    /// Interpret `method` with its arguments laid out in `frame`.
    ///
    /// `ret` points to a zeroed buffer at least one slot wide, or is null
    /// when the method returns nothing.
    ///
    /// # Safety
    ///
    /// `method` must be a handle this runtime issued, and the frame must
    /// match its signature.
    unsafe fn execute(method: MethodHandle, frame: StackFrame<'_>, ret: *mut c_void);
}

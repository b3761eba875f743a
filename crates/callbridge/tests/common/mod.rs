//! Shared test runtime
//!
//! A method handle points at a `TestMethod` that carries both a native entry
//! point and an interpreted body, so tests need no global registry.
//!
//! Native functions and interpreted bodies run inside `extern "C"` frames and
//! must not panic; they hand observations back through return values or the
//! frame, and tests assert afterwards.

#![allow(dead_code)]

use std::ffi::c_void;

use callbridge::{MethodHandle, Runtime, StackFrame};

/// Interpreted method body: reads the frame, writes the result to `ret`.
pub type Interpreted = fn(&StackFrame<'_>, *mut c_void);

pub struct TestMethod {
    native: *const (),
    interpreted: Option<Interpreted>,
}

impl TestMethod {
    pub fn native(entry: *const ()) -> Self {
        Self {
            native: entry,
            interpreted: None,
        }
    }

    pub fn interpreted(body: Interpreted) -> Self {
        Self {
            native: std::ptr::null(),
            interpreted: Some(body),
        }
    }

    pub fn handle(&self) -> MethodHandle {
        MethodHandle::from_ref(self)
    }
}

pub struct TestRuntime;

impl TestRuntime {
    pub const HEADER: usize = 16;
}

impl Runtime for TestRuntime {
    const OBJECT_HEADER_SIZE: usize = Self::HEADER;

    unsafe fn native_entry(method: MethodHandle) -> *const () {
        let method = unsafe { &*method.as_ptr().cast::<TestMethod>() };
        method.native
    }

    unsafe fn execute(method: MethodHandle, frame: StackFrame<'_>, ret: *mut c_void) {
        let method = unsafe { &*method.as_ptr().cast::<TestMethod>() };
        if let Some(body) = method.interpreted {
            body(&frame, ret);
        }
    }
}

/// Write `value` to the return buffer handed to an interpreted body.
pub fn set_return<T: Copy>(ret: *mut c_void, value: T) {
    if !ret.is_null() {
        unsafe { ret.cast::<T>().write_unaligned(value) }
    }
}

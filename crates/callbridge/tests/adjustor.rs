//! Adjustor thunks
//!
//! The receiver reaching the interpreter is the boxed object pointer plus the
//! runtime's object header size; every other argument is untouched.

mod common;

use std::cell::Cell;
use std::ffi::c_void;

use callbridge::builtin::*;
use callbridge::{Runtime, ShapeSignature, ShapeTables, StackFrame};
use common::{set_return, TestMethod, TestRuntime};

thread_local! {
    static RECEIVER: Cell<i64> = const { Cell::new(0) };
}

fn record_receiver(frame: &StackFrame<'_>, ret: *mut c_void) {
    let receiver: i64 = frame.read(0);
    RECEIVER.with(|c| c.set(receiver));
    if frame.len() > 1 {
        let arg: i32 = frame.read(1);
        set_return(ret, arg.wrapping_mul(2));
    }
}

#[test]
fn test_receiver_is_shifted_past_header() {
    let method = TestMethod::interpreted(record_receiver);
    let result = unsafe { adjustor_i4i8i4::<TestRuntime>(0x1000, 21, method.handle()) };

    assert_eq!(result, 42);
    assert_eq!(
        RECEIVER.with(Cell::get),
        0x1000 + TestRuntime::OBJECT_HEADER_SIZE as i64
    );
}

#[test]
fn test_n2m_does_not_shift() {
    let method = TestMethod::interpreted(record_receiver);
    unsafe { n2m_vi8::<TestRuntime>(0x2000, method.handle()) };
    assert_eq!(RECEIVER.with(Cell::get), 0x2000);

    unsafe { adjustor_vi8::<TestRuntime>(0x2000, method.handle()) };
    assert_eq!(RECEIVER.with(Cell::get), 0x2000 + TestRuntime::HEADER as i64);
}

#[test]
fn test_receiver_offset_wraps() {
    let method = TestMethod::interpreted(record_receiver);
    unsafe { adjustor_vi8::<TestRuntime>(i64::MAX, method.handle()) };
    assert_eq!(
        RECEIVER.with(Cell::get),
        i64::MAX.wrapping_add(TestRuntime::HEADER as i64)
    );
}

#[test]
fn test_thunks_only_for_receiver_shapes() {
    let n2m_keys: Vec<&str> = Tables::<TestRuntime>::N2M
        .iter()
        .filter_map(|e| e.signature())
        .collect();
    let thunk_keys: Vec<&str> = Tables::<TestRuntime>::ADJUSTOR_THUNK
        .iter()
        .filter_map(|e| e.signature())
        .collect();

    let expected: Vec<&str> = n2m_keys
        .iter()
        .copied()
        .filter(|key| key.parse::<ShapeSignature>().unwrap().has_receiver_slot())
        .collect();
    assert_eq!(thunk_keys, expected);
    assert!(thunk_keys.contains(&"i4i8i4"));
    assert!(!thunk_keys.contains(&"i4i4"));
    assert!(!thunk_keys.contains(&"v"));
}

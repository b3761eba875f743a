//! Dispatcher: table indexing, resolution and checked invocation

mod common;

use std::ffi::c_void;
use std::sync::Arc;
use std::thread;

use callbridge::{
    builtin, BridgeError, Classifier, Dispatcher, MethodHandle, MethodSignature, ShapeFamily,
    ShapeSignature, StackFrame, StackSlot, StructLayout, TargetAbi, ValueType,
};
use common::{TestMethod, TestRuntime};

mod extra {
    callbridge::bridge_shapes! {
        "i4i8i4",
        "r8r4i4",
    }
}

fn dispatcher(target: TargetAbi) -> Dispatcher {
    Dispatcher::with_tables::<builtin::Tables<TestRuntime>>(Classifier::new(target)).unwrap()
}

fn add_signature() -> MethodSignature {
    MethodSignature::new(ValueType::I4, vec![ValueType::I8, ValueType::I4])
}

extern "C" fn add_i64_i32(a: i64, b: i32, _method: MethodHandle) -> i32 {
    (a as i32).wrapping_add(b)
}

#[test]
fn test_lookup_each_family() {
    let d = dispatcher(TargetAbi::SysV64);
    let shape: ShapeSignature = "i4i8i4".parse().unwrap();

    assert!(d.contains(&shape));
    assert!(d.m2n(&shape).is_ok());
    assert!(d.n2m(&shape).is_ok());
    assert!(d.adjustor_thunk(&shape).is_ok());
}

#[test]
fn test_missing_shape() {
    let d = dispatcher(TargetAbi::SysV64);
    let shape: ShapeSignature = "r8r4i4".parse().unwrap();

    match d.m2n(&shape) {
        Err(BridgeError::MissingShape { family, shape }) => {
            assert_eq!(family, ShapeFamily::M2n);
            assert_eq!(shape, "r8r4i4");
        }
        other => panic!("expected MissingShape, got {:?}", other),
    }

    let no_receiver: ShapeSignature = "i4i4".parse().unwrap();
    assert!(matches!(
        d.adjustor_thunk(&no_receiver),
        Err(BridgeError::MissingShape {
            family: ShapeFamily::AdjustorThunk,
            ..
        })
    ));
}

#[test]
fn test_register_extends_without_replacing() {
    let mut d = dispatcher(TargetAbi::SysV64);
    let before = d.len();
    let shared: ShapeSignature = "i4i8i4".parse().unwrap();
    let original = d.n2m(&shared).unwrap();

    d.register::<extra::Tables<TestRuntime>>().unwrap();

    assert_eq!(d.len(), before + 1);
    assert!(d.contains(&"r8r4i4".parse().unwrap()));
    assert_eq!(d.n2m(&shared).unwrap(), original);
}

#[test]
fn test_resolve_classifies_and_calls() {
    let d = dispatcher(TargetAbi::SysV64);
    let method = TestMethod::native(add_i64_i32 as *const ());

    let bridge = d.resolve(method.handle(), &add_signature()).unwrap();
    assert_eq!(bridge.shape().mangle(), "i4i8i4");
    assert!(bridge.adjustor_thunk().is_some());

    let mut slots = [StackSlot::ZERO; 2];
    let mut frame = StackFrame::from_slice(&mut slots);
    frame.write(0, 1000i64);
    frame.write(1, 42i32);
    let mut ret = StackSlot::ZERO;
    unsafe {
        bridge
            .m2n()
            .invoke(method.handle(), &[0, 1], &mut frame, (&mut ret as *mut StackSlot).cast())
            .unwrap();
    }
    assert_eq!(ret.to_bits() as u32 as i32, 1042);
}

#[test]
fn test_resolve_is_memoized() {
    let d = dispatcher(TargetAbi::SysV64);
    let handle = MethodHandle::from_ptr(0x40 as *const c_void);

    let first = d.resolve(handle, &add_signature()).unwrap();
    let second = d.resolve(handle, &add_signature()).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(d.resolved_count(), 1);
}

#[test]
fn test_cached_handle_keeps_its_signature() {
    let d = dispatcher(TargetAbi::SysV64);
    let handle = MethodHandle::from_ptr(0x60 as *const c_void);
    let first = d.resolve(handle, &add_signature()).unwrap();

    let other = MethodSignature::new(ValueType::R8, vec![ValueType::R8]);
    let again = d.resolve(handle, &other).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(again.shape().mangle(), "i4i8i4");

    let fresh = d
        .resolve(MethodHandle::from_ptr(0x68 as *const c_void), &other)
        .unwrap();
    assert_eq!(fresh.shape().mangle(), "r8r8");
    assert_eq!(d.resolved_count(), 2);
}

#[test]
fn test_resolve_concurrently() {
    let d = Arc::new(dispatcher(TargetAbi::SysV64));
    let handle = MethodHandle::from_ptr(0x80 as *const c_void);

    let bridges: Vec<_> = (0..8)
        .map(|_| {
            let d = Arc::clone(&d);
            thread::spawn(move || d.resolve(handle, &add_signature()).unwrap())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();

    for bridge in &bridges[1..] {
        assert!(Arc::ptr_eq(&bridges[0], bridge));
    }
    assert_eq!(d.resolved_count(), 1);
}

#[test]
fn test_resolve_struct_signature_per_target() {
    let pair = ValueType::structure(
        StructLayout::new("Pair", 16)
            .field(0, ValueType::R8)
            .field(8, ValueType::R8),
    );
    let signature = MethodSignature::new(pair.clone(), vec![pair]);
    let handle = MethodHandle::from_ptr(0x100 as *const c_void);

    let arm = dispatcher(TargetAbi::Aapcs64);
    assert_eq!(arm.resolve(handle, &signature).unwrap().shape().mangle(), "vd2vd2");

    let sysv = dispatcher(TargetAbi::SysV64);
    assert_eq!(sysv.resolve(handle, &signature).unwrap().shape().mangle(), "vd2vd2");

    // Win64 passes 16-byte structs by reference and returns them indirectly.
    let win = dispatcher(TargetAbi::Win64);
    assert!(matches!(
        win.resolve(handle, &signature),
        Err(BridgeError::MissingShape { family: ShapeFamily::M2n, ref shape }) if shape == "S16sr"
    ));
}

#[test]
fn test_resolve_reports_classification_errors() {
    let d = dispatcher(TargetAbi::SysV64);
    let signature = MethodSignature::new(ValueType::I4, vec![ValueType::Void]);
    let result = d.resolve(MethodHandle::from_ptr(0x8 as *const c_void), &signature);
    assert!(matches!(result, Err(BridgeError::Classify(_))));
    assert_eq!(d.resolved_count(), 0);
}

#[test]
fn test_invoker_checks() {
    let d = dispatcher(TargetAbi::SysV64);
    let invoker = d.m2n(&"i8i8i16".parse().unwrap()).unwrap();
    let mut slots = [StackSlot::ZERO; 3];
    let frame = StackFrame::from_slice(&mut slots);
    let mut ret = StackSlot::ZERO;
    let ret_ptr = (&mut ret as *mut StackSlot).cast::<c_void>();

    assert!(invoker.check(&[0, 1], &frame, ret_ptr).is_ok());

    assert!(matches!(
        invoker.check(&[0], &frame, ret_ptr),
        Err(BridgeError::ArityMismatch { expected: 2, actual: 1, .. })
    ));

    // The 16-byte aggregate at slot 2 needs slots 2..4.
    assert!(matches!(
        invoker.check(&[0, 2], &frame, ret_ptr),
        Err(BridgeError::FrameOverrun { param: 1, index: 2, end: 4, len: 3, .. })
    ));

    assert!(matches!(
        invoker.check(&[0, 1], &frame, std::ptr::null_mut()),
        Err(BridgeError::MissingReturnBuffer { .. })
    ));
}

#[test]
fn test_n2m_trampoline_from_dispatcher() {
    fn body(frame: &StackFrame<'_>, ret: *mut c_void) {
        let a: i64 = frame.read(0);
        let b: i32 = frame.read(1);
        common::set_return(ret, (a as i32).wrapping_add(b));
    }

    let d = dispatcher(TargetAbi::SysV64);
    let method = TestMethod::interpreted(body);
    let bridge = d.resolve(method.handle(), &add_signature()).unwrap();

    let n2m = unsafe {
        std::mem::transmute::<*const (), unsafe extern "C" fn(i64, i32, MethodHandle) -> i32>(
            bridge.n2m().as_ptr(),
        )
    };
    assert_eq!(unsafe { n2m(1000, 42, method.handle()) }, 1042);
}

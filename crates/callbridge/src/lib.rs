//! callbridge: interpreter/native call bridge
//!
//! Moves calls across the boundary between an interpreter's slot-based stack
//! frames and the platform C calling convention, in both directions:
//!
//! - **M2N** trampolines read arguments out of interpreter slots and call a
//!   native function with its real signature.
//! - **N2M** trampolines have a native signature themselves; they spill their
//!   arguments into a fresh frame and ask the [`Runtime`] to interpret the
//!   target method.
//! - **Adjustor thunks** are N2M trampolines whose receiver is advanced past
//!   the object header, for methods on boxed value types.
//!
//! Trampolines are generated per shape by [`bridge_shapes!`], which also emits
//! the dispatch tables that key them by mangled shape. The [`Dispatcher`]
//! indexes those tables and resolves method signatures to trampolines.
//!
//! # Example
//!
//! ```ignore
//! use callbridge::{builtin, Classifier, Dispatcher};
//!
//! let dispatcher = Dispatcher::with_tables::<builtin::Tables<MyRuntime>>(Classifier::host())?;
//! let bridge = dispatcher.resolve(method, &signature)?;
//! unsafe { bridge.m2n().invoke(method, &[0, 1], &mut frame, ret)? };
//! ```

// Generated code names items through `::callbridge`.
extern crate self as callbridge;

pub mod builtin;
mod dispatch;
mod error;
mod frame;
mod marshal;
mod runtime;
mod table;

pub use callbridge_abi::{
    mangle, Classifier, ClassifyError, MangleError, MethodSignature, Position, ShapeSignature,
    SlotKind, StructLayout, TargetAbi, ValueType,
};
pub use callbridge_macros::bridge_shapes;

pub use dispatch::{Dispatcher, M2nInvoker, ResolvedBridge, Trampoline};
pub use error::{BridgeError, ShapeFamily, TableError};
pub use frame::{slots_for, FrameValue, StackFrame, StackSlot};
pub use marshal::{
    Aggregate, Marshal, SpilledAggregate, StructRef, Vector2d, Vector2f, Vector3d, Vector3f,
    Vector4d, Vector4f,
};
pub use runtime::{M2nFn, MethodHandle, Runtime};
pub use table::{verify_table, BridgeEntry, M2nEntry, ShapeTables, TableEntry};

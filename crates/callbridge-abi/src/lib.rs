//! callbridge ABI model
//!
//! The pure half of the interpreter/native call bridge: no unsafe code, no
//! runtime. This crate defines
//!
//! - the closed [`SlotKind`] vocabulary and [`ShapeSignature`] mangling,
//! - the per-target [`Classifier`] that turns managed signatures into shapes,
//! - generator [`Manifest`]s listing the signatures a program bridges.
//!
//! It is shared by the `callbridge-macros` generator (which decodes shapes at
//! compile time), the `callbridge` runtime (which classifies at method
//! resolution time) and the `callbridge` CLI.
//!
//! # Example
//!
//! ```ignore
//! use callbridge_abi::{Classifier, TargetAbi, ValueType};
//!
//! let shape = Classifier::new(TargetAbi::Aapcs64)
//!     .classify(&ValueType::I4, &[ValueType::I8, ValueType::I4])?;
//! assert_eq!(shape.mangle(), "i4i8i4");
//! ```

mod classify;
mod error;
pub mod manifest;
mod shape;
mod slot;
mod target;
mod types;

pub use classify::Classifier;
pub use error::{ClassifyError, ManifestError, MangleError, Position};
pub use manifest::{Manifest, ResolvedMethod};
pub use shape::{mangle, ShapeSignature};
pub use slot::{SlotKind, MAX_AGGREGATE_SIZE, WORD_SIZE};
pub use target::TargetAbi;
pub use types::{FieldLayout, Leaf, MethodSignature, StructLayout, ValueType};

//! Dispatch tables
//!
//! Every `bridge_shapes!` invocation emits three tables, each a list of
//! `{ mangled shape, trampoline }` pairs closed by a `{ null, None }`
//! sentinel. Keys are NUL-terminated so the tables can be handed to C code
//! unchanged.

use std::collections::HashSet;
use std::ffi::{c_char, CStr};
use std::fmt;

use callbridge_abi::ShapeSignature;

use crate::error::TableError;
use crate::runtime::M2nFn;

/// One table row.
#[repr(C)]
pub struct TableEntry<F: Copy + 'static> {
    signature: *const c_char,
    method_pointer: Option<F>,
}

// Entries only ever reference static strings and code.
unsafe impl<F: Copy + 'static> Send for TableEntry<F> {}
unsafe impl<F: Copy + 'static> Sync for TableEntry<F> {}

/// Row of an M2N table
pub type M2nEntry = TableEntry<M2nFn>;

/// Row of an N2M or adjustor-thunk table
///
/// Pointers are type-erased; callers cast them to the shape's C signature.
pub type BridgeEntry = TableEntry<*const ()>;

impl<F: Copy + 'static> TableEntry<F> {
    /// End-of-table marker
    pub const SENTINEL: Self = Self {
        signature: std::ptr::null(),
        method_pointer: None,
    };

    pub const fn new(signature: &'static CStr, method_pointer: F) -> Self {
        Self {
            signature: signature.as_ptr(),
            method_pointer: Some(method_pointer),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.signature.is_null() && self.method_pointer.is_none()
    }

    /// The mangled shape, or `None` for the sentinel.
    pub fn signature(&self) -> Option<&'static str> {
        if self.signature.is_null() {
            return None;
        }
        // Non-null keys are only ever set from a `&'static CStr`.
        unsafe { CStr::from_ptr(self.signature) }.to_str().ok()
    }

    pub fn method_pointer(&self) -> Option<F> {
        self.method_pointer
    }
}

impl<F: Copy + 'static> fmt::Debug for TableEntry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableEntry")
            .field("signature", &self.signature())
            .field("present", &self.method_pointer.is_some())
            .finish()
    }
}

/// The three tables produced by one `bridge_shapes!` invocation.
pub trait ShapeTables {
    const M2N: &'static [M2nEntry];
    const N2M: &'static [BridgeEntry];
    const ADJUSTOR_THUNK: &'static [BridgeEntry];
}

/// Check table well-formedness: canonical unique keys and exactly one
/// trailing sentinel. Returns the number of non-sentinel entries.
pub fn verify_table<F: Copy + 'static>(table: &[TableEntry<F>]) -> Result<usize, TableError> {
    let Some((last, entries)) = table.split_last() else {
        return Err(TableError::MissingSentinel);
    };
    if !last.is_sentinel() {
        return Err(TableError::MissingSentinel);
    }

    let mut seen = HashSet::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if entry.is_sentinel() {
            return Err(TableError::EarlySentinel { index });
        }
        let (Some(key), Some(_)) = (entry.signature(), entry.method_pointer) else {
            return Err(TableError::PartialEntry { index });
        };
        // Decoding rejects leading zeros, so a key that decodes is canonical.
        ShapeSignature::demangle(key).map_err(|source| TableError::MalformedKey { index, source })?;
        if !seen.insert(key) {
            return Err(TableError::DuplicateKey {
                key: key.to_string(),
            });
        }
    }
    Ok(entries.len())
}

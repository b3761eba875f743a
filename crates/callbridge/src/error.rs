//! Error types for bridge tables and dispatch

use std::fmt;

use callbridge_abi::{ClassifyError, MangleError};

/// Which trampoline table a lookup went to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeFamily {
    /// Interpreter → native
    M2n,
    /// Native → interpreter
    N2m,
    /// Native → interpreter for boxed value-type receivers
    AdjustorThunk,
}

impl fmt::Display for ShapeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShapeFamily::M2n => "M2N",
            ShapeFamily::N2m => "N2M",
            ShapeFamily::AdjustorThunk => "adjustor thunk",
        })
    }
}

/// Malformed dispatch table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// The table does not end in a `{ null, None }` entry
    #[error("Table has no terminating sentinel")]
    MissingSentinel,

    /// A sentinel appears before the last entry
    #[error("Sentinel at index {index} precedes the end of the table")]
    EarlySentinel {
        /// Index of the early sentinel
        index: usize,
    },

    /// Exactly one of key and pointer is null
    #[error("Entry {index} pairs a null with a non-null field")]
    PartialEntry {
        /// Offending index
        index: usize,
    },

    /// A key that is not a canonical mangled shape
    #[error("Entry {index}: key is not a canonical shape: {source}")]
    MalformedKey {
        /// Offending index
        index: usize,
        /// Decoding failure
        source: MangleError,
    },

    /// Two entries share a key
    #[error("Duplicate key `{key}`")]
    DuplicateKey {
        /// The repeated key
        key: String,
    },
}

/// Errors raised while resolving or invoking bridges
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The shape was not generated into any registered table
    #[error("No {family} trampoline for shape `{shape}`")]
    MissingShape {
        /// Table searched
        family: ShapeFamily,
        /// Mangled shape
        shape: String,
    },

    /// The method signature could not be classified
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// A registered table was malformed
    #[error("Invalid {family} table: {source}")]
    Table {
        /// Table that failed verification
        family: ShapeFamily,
        /// What was wrong
        source: TableError,
    },

    /// Argument index count does not match the shape
    #[error("Shape `{shape}` takes {expected} arguments, {actual} slot indexes given")]
    ArityMismatch {
        /// Mangled shape
        shape: String,
        /// Parameter count of the shape
        expected: usize,
        /// Indexes supplied
        actual: usize,
    },

    /// A parameter's slots extend past the frame
    #[error("Parameter {param} of `{shape}` needs slots {index}..{end}, frame has {len}")]
    FrameOverrun {
        /// Mangled shape
        shape: String,
        /// Parameter index
        param: usize,
        /// First slot
        index: usize,
        /// One past the last slot
        end: usize,
        /// Frame length
        len: usize,
    },

    /// A value-returning shape was invoked without a return buffer
    #[error("Shape `{shape}` returns a value but no return buffer was given")]
    MissingReturnBuffer {
        /// Mangled shape
        shape: String,
    },
}

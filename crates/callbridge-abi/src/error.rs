//! Error types for shape mangling, classification and manifests

use std::fmt;

/// Where in a signature a type sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// The return value
    Return,
    /// Parameter at the given declaration index
    Param(usize),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Return => f.write_str("return value"),
            Position::Param(i) => write!(f, "parameter {}", i),
        }
    }
}

/// Errors produced while decoding a mangled shape string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MangleError {
    /// The input was empty
    #[error("Empty shape string")]
    Empty,

    /// No slot token starts at this offset
    #[error("Unknown slot token at offset {offset} in `{input}`")]
    UnknownToken {
        /// Full input
        input: String,
        /// Byte offset of the bad token
        offset: usize,
    },

    /// A token carried a width the vocabulary does not define
    #[error("Invalid width `{width}` for `{kind}` at offset {offset} in `{input}`")]
    InvalidWidth {
        /// Full input
        input: String,
        /// Kind prefix (`i`, `S`, `vf`, ...)
        kind: &'static str,
        /// The digits as written
        width: String,
        /// Byte offset of the token
        offset: usize,
    },

    /// A token appeared where it cannot be used
    #[error("`{token}` is not valid as a {position}")]
    Misplaced {
        /// The offending token
        token: String,
        /// Where it appeared
        position: Position,
    },
}

/// Fatal classification failures.
///
/// An unclassifiable signature means the shape vocabulary is incomplete for
/// the program; there is no fallback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    /// `void` used as a parameter type
    #[error("{position}: void is only valid as a return type")]
    VoidParameter {
        /// Offending position
        position: Position,
    },

    /// Struct with no bytes
    #[error("{position}: struct `{name}` has zero size")]
    ZeroSizedStruct {
        /// Offending position
        position: Position,
        /// Struct name
        name: String,
    },

    /// Struct whose fields do not fit its declared size
    #[error("{position}: field of struct `{name}` at offset {offset} overruns its {size}-byte layout")]
    FieldOutOfBounds {
        /// Offending position
        position: Position,
        /// Struct name
        name: String,
        /// Field offset
        offset: u32,
        /// Declared struct size
        size: u32,
    },

    /// Struct too large for an `S{n}` token
    #[error("{position}: struct `{name}` of {size} bytes exceeds the largest encodable aggregate")]
    TooLarge {
        /// Offending position
        position: Position,
        /// Struct name
        name: String,
        /// Declared struct size
        size: u32,
    },

    /// Register-class combination the vocabulary cannot express
    #[error("{position}: struct `{name}` needs a register class mix unsupported on {target}")]
    UnsupportedRegisterClass {
        /// Offending position
        position: Position,
        /// Struct name
        name: String,
        /// Target ABI name
        target: &'static str,
    },
}

/// Errors produced while loading a generator manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The TOML document could not be parsed
    #[error("Invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),

    /// A type name did not resolve to a primitive or declared struct
    #[error("Unknown type `{name}` in {context}")]
    UnknownType {
        /// The unresolved name
        name: String,
        /// Method or struct that referenced it
        context: String,
    },

    /// A struct contains itself by value
    #[error("Struct `{name}` contains itself by value")]
    RecursiveStruct {
        /// Struct name
        name: String,
    },
}

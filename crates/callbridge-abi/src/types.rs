//! Managed-side types the classifier consumes
//!
//! These are deliberately thin: the metadata system owns the real type
//! model and only hands over widths, reference-ness and struct layouts.

use std::sync::Arc;

/// A parameter or return type as seen by the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    Void,
    Bool,
    /// UTF-16 code unit
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    IntPtr,
    UIntPtr,
    R4,
    R8,
    /// Any managed reference (class, string, array, boxed value)
    Object,
    /// Unmanaged pointer
    Pointer,
    /// `ref`/`out`/`in` parameter: an interior pointer
    ByRef,
    /// Function pointer
    FnPtr,
    /// Value type with an explicit layout
    Struct(Arc<StructLayout>),
}

/// Leaf of a flattened struct layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leaf {
    /// Integer or pointer of the given width
    Int(u32),
    F32,
    F64,
}

impl Leaf {
    pub fn size(self) -> u32 {
        match self {
            Leaf::Int(size) => size,
            Leaf::F32 => 4,
            Leaf::F64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Leaf::F32 | Leaf::F64)
    }
}

impl ValueType {
    /// Leaf classification of a non-struct, non-void type.
    pub fn scalar_leaf(&self) -> Option<Leaf> {
        match self {
            ValueType::Void | ValueType::Struct(_) => None,
            ValueType::Bool | ValueType::I1 | ValueType::U1 => Some(Leaf::Int(1)),
            ValueType::Char | ValueType::I2 | ValueType::U2 => Some(Leaf::Int(2)),
            ValueType::I4 | ValueType::U4 => Some(Leaf::Int(4)),
            ValueType::I8
            | ValueType::U8
            | ValueType::IntPtr
            | ValueType::UIntPtr
            | ValueType::Object
            | ValueType::Pointer
            | ValueType::ByRef
            | ValueType::FnPtr => Some(Leaf::Int(8)),
            ValueType::R4 => Some(Leaf::F32),
            ValueType::R8 => Some(Leaf::F64),
        }
    }

    /// Size in bytes on a 64-bit target.
    pub fn size(&self) -> u32 {
        match self {
            ValueType::Void => 0,
            ValueType::Struct(layout) => layout.size,
            other => other.scalar_leaf().map(Leaf::size).unwrap_or(0),
        }
    }

    pub fn structure(layout: StructLayout) -> Self {
        ValueType::Struct(Arc::new(layout))
    }
}

/// Explicit value-type layout: byte size plus fields at byte offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct StructLayout {
    pub name: String,
    pub size: u32,
    pub fields: Vec<FieldLayout>,
}

/// One field of a struct layout
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    pub offset: u32,
    pub ty: ValueType,
}

impl StructLayout {
    pub fn new(name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            size,
            fields: Vec::new(),
        }
    }

    /// Builder: append a field at `offset`.
    pub fn field(mut self, offset: u32, ty: ValueType) -> Self {
        self.fields.push(FieldLayout { offset, ty });
        self
    }

    /// Flatten nested structs into `(absolute offset, leaf)` pairs, by
    /// ascending offset whatever the declaration order. Void fields
    /// contribute nothing.
    pub fn leaves(&self) -> Vec<(u32, Leaf)> {
        let mut out = Vec::new();
        self.collect_leaves(0, &mut out);
        out.sort_by_key(|&(offset, _)| offset);
        out
    }

    fn collect_leaves(&self, base: u32, out: &mut Vec<(u32, Leaf)>) {
        for field in &self.fields {
            let offset = base + field.offset;
            match &field.ty {
                ValueType::Struct(inner) => inner.collect_leaves(offset, out),
                ty => {
                    if let Some(leaf) = ty.scalar_leaf() {
                        out.push((offset, leaf));
                    }
                }
            }
        }
    }
}

/// A managed method signature in declaration order.
///
/// Instance methods carry their receiver as the first parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
    pub ret: ValueType,
    pub params: Vec<ValueType>,
}

impl MethodSignature {
    pub fn new(ret: ValueType, params: Vec<ValueType>) -> Self {
        Self { ret, params }
    }

    /// Prepend the implicit receiver of an instance method.
    pub fn with_receiver(mut self) -> Self {
        self.params.insert(0, ValueType::Object);
        self
    }
}

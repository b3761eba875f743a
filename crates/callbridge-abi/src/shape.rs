//! Shape signatures and their mangled names
//!
//! A shape is the return kind followed by the parameter kinds. Its mangled
//! name is the concatenation of the slot tokens in that order, with no
//! separators; it is the key of every dispatch table.

use std::fmt;
use std::str::FromStr;

use crate::error::{MangleError, Position};
use crate::slot::SlotKind;

/// Return kind plus ordered parameter kinds of a bridged call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeSignature {
    ret: SlotKind,
    params: Vec<SlotKind>,
}

impl ShapeSignature {
    /// Build a shape, rejecting kinds in positions they cannot occupy.
    pub fn new(ret: SlotKind, params: Vec<SlotKind>) -> Result<Self, MangleError> {
        ret.check_position(Position::Return)?;
        for (i, kind) in params.iter().enumerate() {
            kind.check_position(Position::Param(i))?;
        }
        Ok(Self { ret, params })
    }

    /// Assemble a shape whose kinds the caller already placed correctly.
    pub(crate) fn from_classified(ret: SlotKind, params: Vec<SlotKind>) -> Self {
        debug_assert!(ret.valid_as_return());
        debug_assert!(params.iter().all(|kind| kind.valid_as_param()));
        Self { ret, params }
    }

    /// Return kind
    pub fn ret(&self) -> SlotKind {
        self.ret
    }

    /// Parameter kinds in declaration order
    pub fn params(&self) -> &[SlotKind] {
        &self.params
    }

    /// Canonical table key for this shape.
    pub fn mangle(&self) -> String {
        self.to_string()
    }

    /// Decode a mangled name.
    pub fn demangle(input: &str) -> Result<Self, MangleError> {
        if input.is_empty() {
            return Err(MangleError::Empty);
        }
        let (ret, mut offset) = SlotKind::decode_at(input, 0)?;
        let mut params = Vec::new();
        while offset < input.len() {
            let (kind, next) = SlotKind::decode_at(input, offset)?;
            params.push(kind);
            offset = next;
        }
        Self::new(ret, params)
    }

    /// Whether an adjustor thunk exists for this shape: the first parameter
    /// must be able to carry a receiver pointer.
    pub fn has_receiver_slot(&self) -> bool {
        self.params
            .first()
            .is_some_and(|kind| kind.is_pointer_sized_int())
    }

    /// Total inline slots the parameters occupy in an interpreter frame.
    pub fn param_slot_count(&self) -> usize {
        self.params.iter().map(|kind| kind.slot_count().max(1)).sum()
    }
}

impl fmt::Display for ShapeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ret)?;
        for kind in &self.params {
            write!(f, "{}", kind)?;
        }
        Ok(())
    }
}

impl FromStr for ShapeSignature {
    type Err = MangleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::demangle(s)
    }
}

/// Mangle a shape to its table key.
pub fn mangle(shape: &ShapeSignature) -> String {
    shape.mangle()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mangle_scenario_shape() {
        let shape =
            ShapeSignature::new(SlotKind::I4, vec![SlotKind::I8, SlotKind::I4]).unwrap();
        assert_eq!(shape.mangle(), "i4i8i4");
        assert_eq!("i4i8i4".parse::<ShapeSignature>().unwrap(), shape);
    }

    #[test]
    fn test_demangle_void_and_vectors() {
        let shape = ShapeSignature::demangle("vvf2vd4sr").unwrap();
        assert_eq!(shape.ret(), SlotKind::Void);
        assert_eq!(
            shape.params(),
            &[SlotKind::VectorF32(2), SlotKind::VectorF64(4), SlotKind::StructRef]
        );
    }

    #[test]
    fn test_demangle_digit_runs_are_greedy() {
        let shape = ShapeSignature::demangle("i16i1S24i8").unwrap();
        assert_eq!(
            shape.params(),
            &[SlotKind::I1, SlotKind::Large(24), SlotKind::I8]
        );
        assert_eq!(shape.ret(), SlotKind::I16);
    }

    #[test]
    fn test_misplaced_tokens() {
        assert!(matches!(
            ShapeSignature::demangle("i4v"),
            Err(MangleError::Misplaced {
                position: Position::Param(0),
                ..
            })
        ));
        assert!(matches!(
            ShapeSignature::demangle("sri4"),
            Err(MangleError::Misplaced {
                position: Position::Return,
                ..
            })
        ));
        assert_eq!(ShapeSignature::demangle(""), Err(MangleError::Empty));
    }

    #[test]
    fn test_receiver_slot() {
        assert!(ShapeSignature::demangle("vi8i4").unwrap().has_receiver_slot());
        assert!(!ShapeSignature::demangle("vi4").unwrap().has_receiver_slot());
        assert!(!ShapeSignature::demangle("i8").unwrap().has_receiver_slot());
    }

    #[test]
    fn test_param_slot_count() {
        let shape = ShapeSignature::demangle("vi8i16S20vf3").unwrap();
        assert_eq!(shape.param_slot_count(), 1 + 2 + 3 + 2);
    }
}

//! Shape classifier
//!
//! Maps a managed signature to the slot kinds the native ABI actually sees.
//! Classification is pure: the same types and target always produce the
//! same shape, which is what makes the mangled name usable as a table key.
//!
//! Aggregate rules per target:
//!
//! - **AAPCS64**: homogeneous float aggregates of up to four members travel
//!   in FP registers whatever their size. Other composites of at most 16
//!   bytes travel in one or two X registers. Larger composites are returned
//!   through the x8 result pointer and passed as a pointer to a caller copy.
//! - **SysV x86-64**: anything above 16 bytes is MEMORY class (copied onto the
//!   stack, or returned through a hidden pointer). Smaller aggregates are
//!   split into eightbytes that are either all INTEGER or all SSE; a mix is
//!   not expressible in the vocabulary.
//! - **Win64**: only aggregates of exactly 1, 2, 4 or 8 bytes are passed in
//!   registers; everything else goes by reference.

use crate::error::{ClassifyError, Position};
use crate::shape::ShapeSignature;
use crate::slot::{SlotKind, MAX_AGGREGATE_SIZE, WORD_SIZE};
use crate::target::TargetAbi;
use crate::types::{Leaf, MethodSignature, StructLayout, ValueType};

/// Signature classifier for one target ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    target: TargetAbi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EightbyteClass {
    NoClass,
    Integer,
    Sse,
}

impl EightbyteClass {
    fn merge(self, other: EightbyteClass) -> EightbyteClass {
        match (self, other) {
            (EightbyteClass::NoClass, c) | (c, EightbyteClass::NoClass) => c,
            (EightbyteClass::Integer, _) | (_, EightbyteClass::Integer) => EightbyteClass::Integer,
            (EightbyteClass::Sse, EightbyteClass::Sse) => EightbyteClass::Sse,
        }
    }
}

impl Classifier {
    pub fn new(target: TargetAbi) -> Self {
        Self { target }
    }

    /// Classifier for the compilation host.
    pub fn host() -> Self {
        Self::new(TargetAbi::host())
    }

    pub fn target(&self) -> TargetAbi {
        self.target
    }

    /// Classify a return type and parameter list into a shape.
    pub fn classify(
        &self,
        ret: &ValueType,
        params: &[ValueType],
    ) -> Result<ShapeSignature, ClassifyError> {
        let ret = self.classify_type(ret, Position::Return)?;
        let params = params
            .iter()
            .enumerate()
            .map(|(i, ty)| self.classify_type(ty, Position::Param(i)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ShapeSignature::from_classified(ret, params))
    }

    /// Classify a whole method signature.
    pub fn classify_signature(&self, sig: &MethodSignature) -> Result<ShapeSignature, ClassifyError> {
        self.classify(&sig.ret, &sig.params)
    }

    /// Classify one type at the given position.
    pub fn classify_type(&self, ty: &ValueType, position: Position) -> Result<SlotKind, ClassifyError> {
        let kind = match ty {
            ValueType::Void => match position {
                Position::Return => SlotKind::Void,
                Position::Param(_) => return Err(ClassifyError::VoidParameter { position }),
            },
            ValueType::Bool | ValueType::U1 => SlotKind::U1,
            ValueType::I1 => SlotKind::I1,
            ValueType::Char | ValueType::U2 => SlotKind::U2,
            ValueType::I2 => SlotKind::I2,
            ValueType::I4 | ValueType::U4 => SlotKind::I4,
            ValueType::I8
            | ValueType::U8
            | ValueType::IntPtr
            | ValueType::UIntPtr
            | ValueType::Object
            | ValueType::Pointer
            | ValueType::ByRef
            | ValueType::FnPtr => SlotKind::I8,
            ValueType::R4 => SlotKind::R4,
            ValueType::R8 => SlotKind::R8,
            ValueType::Struct(layout) => return self.classify_struct(layout, position),
        };
        Ok(kind)
    }

    fn classify_struct(&self, layout: &StructLayout, position: Position) -> Result<SlotKind, ClassifyError> {
        let size = layout.size as usize;
        if size == 0 {
            return Err(ClassifyError::ZeroSizedStruct {
                position,
                name: layout.name.clone(),
            });
        }
        if size > MAX_AGGREGATE_SIZE {
            return Err(ClassifyError::TooLarge {
                position,
                name: layout.name.clone(),
                size: layout.size,
            });
        }

        let leaves = layout.leaves();
        if let Some(&(offset, _)) = leaves
            .iter()
            .find(|(offset, leaf)| offset + leaf.size() > layout.size)
        {
            return Err(ClassifyError::FieldOutOfBounds {
                position,
                name: layout.name.clone(),
                offset,
                size: layout.size,
            });
        }

        match self.target {
            TargetAbi::Aapcs64 => Ok(self.classify_aapcs64(size, &leaves, position)),
            TargetAbi::SysV64 => self.classify_sysv64(layout, &leaves, position),
            TargetAbi::Win64 => Ok(match size {
                1 | 2 | 4 | 8 => integer_aggregate(size),
                _ => indirect(size, position),
            }),
        }
    }

    fn classify_aapcs64(&self, size: usize, leaves: &[(u32, Leaf)], position: Position) -> SlotKind {
        if let Some((leaf, count)) = homogeneous_float(size, leaves, self.target.max_hfa_members()) {
            return float_vector(leaf, count);
        }
        if size <= self.target.register_pass_threshold() {
            integer_aggregate(size)
        } else {
            indirect(size, position)
        }
    }

    fn classify_sysv64(
        &self,
        layout: &StructLayout,
        leaves: &[(u32, Leaf)],
        position: Position,
    ) -> Result<SlotKind, ClassifyError> {
        let size = layout.size as usize;
        if size > self.target.register_pass_threshold() {
            return Ok(SlotKind::Large(size as u16));
        }

        let mut classes = [EightbyteClass::NoClass; 2];
        for &(offset, leaf) in leaves {
            let first = offset as usize / WORD_SIZE;
            let last = (offset + leaf.size() - 1) as usize / WORD_SIZE;
            // Unaligned fields force MEMORY class.
            if first != last || offset % leaf.size() != 0 {
                return Ok(SlotKind::Large(size as u16));
            }
            let class = if leaf.is_float() {
                EightbyteClass::Sse
            } else {
                EightbyteClass::Integer
            };
            classes[first] = classes[first].merge(class);
        }

        let used = &classes[..size.div_ceil(WORD_SIZE)];
        let is = |wanted: EightbyteClass| {
            used.iter()
                .all(|c| *c == wanted || *c == EightbyteClass::NoClass)
        };
        if is(EightbyteClass::Integer) {
            Ok(integer_aggregate(size))
        } else if is(EightbyteClass::Sse) {
            let all_double = leaves.iter().all(|(_, leaf)| *leaf == Leaf::F64);
            Ok(match size {
                0..=4 => SlotKind::R4,
                5..=8 if all_double => SlotKind::R8,
                5..=8 => SlotKind::VectorF32(2),
                9..=12 => SlotKind::VectorF32(3),
                _ if all_double => SlotKind::VectorF64(2),
                _ => SlotKind::VectorF32(4),
            })
        } else {
            Err(ClassifyError::UnsupportedRegisterClass {
                position,
                name: layout.name.clone(),
                target: self.target.name(),
            })
        }
    }
}

/// Integer-class aggregate of at most 16 bytes.
fn integer_aggregate(size: usize) -> SlotKind {
    match size {
        1 => SlotKind::I1,
        2 => SlotKind::I2,
        4 => SlotKind::I4,
        0..=8 => SlotKind::I8,
        _ => SlotKind::I16,
    }
}

/// Aggregate that does not travel in registers.
fn indirect(size: usize, position: Position) -> SlotKind {
    match position {
        Position::Return => SlotKind::Large(size as u16),
        Position::Param(_) => SlotKind::StructRef,
    }
}

fn float_vector(leaf: Leaf, count: usize) -> SlotKind {
    match (leaf, count) {
        (Leaf::F64, 1) => SlotKind::R8,
        (Leaf::F64, n) => SlotKind::VectorF64(n as u8),
        (_, 1) => SlotKind::R4,
        (_, n) => SlotKind::VectorF32(n as u8),
    }
}

/// Element type and member count of a homogeneous float aggregate, if the
/// layout is one: identical float leaves packed back to back with no padding.
///
/// `leaves` must be sorted by offset.
fn homogeneous_float(size: usize, leaves: &[(u32, Leaf)], max_members: usize) -> Option<(Leaf, usize)> {
    let (_, first) = *leaves.first()?;
    if !first.is_float() || leaves.len() > max_members {
        return None;
    }
    let elem = first.size();
    let packed = leaves
        .iter()
        .enumerate()
        .all(|(i, &(offset, leaf))| leaf == first && offset == i as u32 * elem);
    if packed && size == leaves.len() * elem as usize {
        Some((first, leaves.len()))
    } else {
        None
    }
}

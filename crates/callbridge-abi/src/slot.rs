//! Slot kinds: the closed ABI vocabulary every shape is built from
//!
//! Each kind has a self-delimiting token: a letter prefix followed by an
//! optional digit run. No token starts with a digit, so a concatenation of
//! tokens decodes unambiguously.
//!
//! | token            | meaning                                              |
//! |------------------|------------------------------------------------------|
//! | `v`              | void (return only)                                   |
//! | `i1 i2 i4 i8`    | integer-class value of 1/2/4/8 bytes                 |
//! | `u1 u2`          | unsigned 1/2-byte value (zero-extended by callers)   |
//! | `r4 r8`          | float / double                                       |
//! | `i16`            | 16-byte aggregate in two general registers           |
//! | `vf2 vf3 vf4`    | f32 vector aggregate in FP registers                 |
//! | `vd2 vd3 vd4`    | f64 vector aggregate in FP registers                 |
//! | `S{n}`           | n-byte aggregate returned via hidden pointer, or passed by value in memory |
//! | `sr`             | aggregate parameter passed as a pointer to a stable copy |

use std::fmt;

use crate::error::{MangleError, Position};

/// Size in bytes of one interpreter stack slot on every supported target.
pub const WORD_SIZE: usize = 8;

/// Largest byte size an `S{n}` token can carry.
pub const MAX_AGGREGATE_SIZE: usize = u16::MAX as usize;

/// ABI-relevant kind of a single return value or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotKind {
    Void,
    I1,
    I2,
    I4,
    I8,
    U1,
    U2,
    R4,
    R8,
    /// 16-byte integer-class aggregate by value
    I16,
    /// f32 vector with 2..=4 lanes
    VectorF32(u8),
    /// f64 vector with 2..=4 lanes
    VectorF64(u8),
    /// Aggregate of the given byte size beyond register passing
    Large(u16),
    /// Aggregate parameter behind a hidden pointer
    StructRef,
}

impl SlotKind {
    /// Byte size of the value this kind moves.
    ///
    /// `StructRef` reports the size of the pointer that travels, not the
    /// aggregate behind it.
    pub fn size_bytes(self) -> usize {
        match self {
            SlotKind::Void => 0,
            SlotKind::I1 | SlotKind::U1 => 1,
            SlotKind::I2 | SlotKind::U2 => 2,
            SlotKind::I4 | SlotKind::R4 => 4,
            SlotKind::I8 | SlotKind::R8 | SlotKind::StructRef => 8,
            SlotKind::I16 => 16,
            SlotKind::VectorF32(lanes) => 4 * lanes as usize,
            SlotKind::VectorF64(lanes) => 8 * lanes as usize,
            SlotKind::Large(size) => size as usize,
        }
    }

    /// Number of consecutive interpreter slots the value occupies inline.
    pub fn slot_count(self) -> usize {
        self.size_bytes().div_ceil(WORD_SIZE)
    }

    /// Whether the value is an aggregate rather than a scalar.
    pub fn is_aggregate(self) -> bool {
        matches!(
            self,
            SlotKind::I16
                | SlotKind::VectorF32(_)
                | SlotKind::VectorF64(_)
                | SlotKind::Large(_)
                | SlotKind::StructRef
        )
    }

    /// Whether the kind can carry a receiver pointer (adjustor thunk candidate).
    pub fn is_pointer_sized_int(self) -> bool {
        self == SlotKind::I8
    }

    pub fn valid_as_return(self) -> bool {
        self != SlotKind::StructRef
    }

    pub fn valid_as_param(self) -> bool {
        self != SlotKind::Void
    }

    pub(crate) fn check_position(self, position: Position) -> Result<(), MangleError> {
        let ok = match position {
            Position::Return => self.valid_as_return(),
            Position::Param(_) => self.valid_as_param(),
        };
        if ok {
            Ok(())
        } else {
            Err(MangleError::Misplaced {
                token: self.to_string(),
                position,
            })
        }
    }

    /// Decode the token at `offset` of `input`, returning the kind and the
    /// offset just past it.
    pub(crate) fn decode_at(input: &str, offset: usize) -> Result<(SlotKind, usize), MangleError> {
        let bytes = input.as_bytes();
        let unknown = || MangleError::UnknownToken {
            input: input.to_string(),
            offset,
        };
        let lead = *bytes.get(offset).ok_or_else(unknown)?;

        match lead {
            b'v' => match bytes.get(offset + 1) {
                Some(b'f') | Some(b'd') => {
                    let float = bytes[offset + 1] == b'f';
                    let kind_name = if float { "vf" } else { "vd" };
                    let (digits, end) = digit_run(input, offset + 2);
                    let lanes = parse_width(input, offset, kind_name, digits)?;
                    if !(2..=4).contains(&lanes) {
                        return Err(invalid_width(input, offset, kind_name, digits));
                    }
                    let kind = if float {
                        SlotKind::VectorF32(lanes as u8)
                    } else {
                        SlotKind::VectorF64(lanes as u8)
                    };
                    Ok((kind, end))
                }
                _ => Ok((SlotKind::Void, offset + 1)),
            },
            b'i' => {
                let (digits, end) = digit_run(input, offset + 1);
                let kind = match parse_width(input, offset, "i", digits)? {
                    1 => SlotKind::I1,
                    2 => SlotKind::I2,
                    4 => SlotKind::I4,
                    8 => SlotKind::I8,
                    16 => SlotKind::I16,
                    _ => return Err(invalid_width(input, offset, "i", digits)),
                };
                Ok((kind, end))
            }
            b'u' => {
                let (digits, end) = digit_run(input, offset + 1);
                let kind = match parse_width(input, offset, "u", digits)? {
                    1 => SlotKind::U1,
                    2 => SlotKind::U2,
                    _ => return Err(invalid_width(input, offset, "u", digits)),
                };
                Ok((kind, end))
            }
            b'r' => {
                let (digits, end) = digit_run(input, offset + 1);
                let kind = match parse_width(input, offset, "r", digits)? {
                    4 => SlotKind::R4,
                    8 => SlotKind::R8,
                    _ => return Err(invalid_width(input, offset, "r", digits)),
                };
                Ok((kind, end))
            }
            b'S' => {
                let (digits, end) = digit_run(input, offset + 1);
                let size = parse_width(input, offset, "S", digits)?;
                if size == 0 || size > MAX_AGGREGATE_SIZE {
                    return Err(invalid_width(input, offset, "S", digits));
                }
                Ok((SlotKind::Large(size as u16), end))
            }
            b's' if bytes.get(offset + 1) == Some(&b'r') => Ok((SlotKind::StructRef, offset + 2)),
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Void => f.write_str("v"),
            SlotKind::I1 => f.write_str("i1"),
            SlotKind::I2 => f.write_str("i2"),
            SlotKind::I4 => f.write_str("i4"),
            SlotKind::I8 => f.write_str("i8"),
            SlotKind::U1 => f.write_str("u1"),
            SlotKind::U2 => f.write_str("u2"),
            SlotKind::R4 => f.write_str("r4"),
            SlotKind::R8 => f.write_str("r8"),
            SlotKind::I16 => f.write_str("i16"),
            SlotKind::VectorF32(lanes) => write!(f, "vf{}", lanes),
            SlotKind::VectorF64(lanes) => write!(f, "vd{}", lanes),
            SlotKind::Large(size) => write!(f, "S{}", size),
            SlotKind::StructRef => f.write_str("sr"),
        }
    }
}

fn digit_run(input: &str, start: usize) -> (&str, usize) {
    let rest = &input.as_bytes()[start.min(input.len())..];
    let len = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    let end = start + len;
    (&input[start.min(input.len())..end.min(input.len())], end)
}

fn parse_width(
    input: &str,
    offset: usize,
    kind: &'static str,
    digits: &str,
) -> Result<usize, MangleError> {
    // Leading zeros would give a second spelling of the same kind.
    if digits.is_empty() || digits.starts_with('0') {
        return Err(invalid_width(input, offset, kind, digits));
    }
    digits
        .parse::<usize>()
        .map_err(|_| invalid_width(input, offset, kind, digits))
}

fn invalid_width(input: &str, offset: usize, kind: &'static str, digits: &str) -> MangleError {
    MangleError::InvalidWidth {
        input: input.to_string(),
        kind,
        width: digits.to_string(),
        offset,
    }
}

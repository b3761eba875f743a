// Carrier types for slot kinds
//
// Every slot kind maps to exactly one Rust type whose `extern "C"` lowering
// matches the native ABI's treatment of that kind. The generated bodies
// never branch on kinds; they only name these types.

use callbridge_abi::SlotKind;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// Largest `S{n}` that needs a carrier forced out of registers.
const SPILL_LIMIT: usize = 16;

/// Smallest struct that can hold a misaligned `u16`.
const MIN_SPILLED_SIZE: usize = 3;

/// Rust type that carries a value of `kind` across the native boundary.
pub fn carrier_type(kind: SlotKind) -> TokenStream {
    match kind {
        SlotKind::Void => quote! { () },
        SlotKind::I1 => quote! { i8 },
        SlotKind::I2 => quote! { i16 },
        SlotKind::I4 => quote! { i32 },
        SlotKind::I8 => quote! { i64 },
        SlotKind::U1 => quote! { u8 },
        SlotKind::U2 => quote! { u16 },
        SlotKind::R4 => quote! { f32 },
        SlotKind::R8 => quote! { f64 },
        SlotKind::I16 => quote! { ::callbridge::Aggregate<16> },
        SlotKind::VectorF32(lanes) => {
            let name = format_ident!("Vector{}f", lanes);
            quote! { ::callbridge::#name }
        }
        SlotKind::VectorF64(lanes) => {
            let name = format_ident!("Vector{}d", lanes);
            quote! { ::callbridge::#name }
        }
        SlotKind::Large(size) if (size as usize) <= SPILL_LIMIT => {
            let tail = (size as usize).saturating_sub(MIN_SPILLED_SIZE);
            quote! { ::callbridge::SpilledAggregate<#tail> }
        }
        SlotKind::Large(size) => {
            let size = size as usize;
            quote! { ::callbridge::Aggregate<#size> }
        }
        SlotKind::StructRef => quote! { ::callbridge::StructRef },
    }
}

/// Reject kinds no native ABI lowers the way the vocabulary says.
///
/// `S1` and `S2` would be in-memory structs of one or two bytes; every
/// supported ABI passes those in a register.
pub fn check_carrier(kind: SlotKind) -> Result<(), String> {
    match kind {
        SlotKind::Large(size) if (size as usize) < MIN_SPILLED_SIZE => Err(format!(
            "`{}` has no in-memory lowering: structs under {} bytes travel in registers",
            kind, MIN_SPILLED_SIZE
        )),
        _ => Ok(()),
    }
}

/// Words of return buffer an N2M trampoline hands to the interpreter.
///
/// Interpreters store whole slots, so the buffer is never narrower than one
/// word even for sub-word results.
pub fn return_words(kind: SlotKind) -> usize {
    kind.slot_count().max(1)
}

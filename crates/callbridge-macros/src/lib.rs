// callbridge-macros: compile-time trampoline generator
//
// One macro, one source of truth: the same shape list produces the M2N,
// N2M and adjustor-thunk trampolines and the three dispatch tables that
// index them.
//
// Example:
// ```
// callbridge::bridge_shapes! {
//     "v",
//     "i4i8i4",
//     "vi8sr",
// }
// ```

use proc_macro::TokenStream;
use syn::parse_macro_input;

mod carrier;
mod expand;

/// Generates trampolines and dispatch tables for a list of mangled shapes.
///
/// For every shape `<s>` the expansion contains, in the invoking module:
///
/// - `m2n_<s>::<R>`: interpreter → native, uniform table signature
/// - `n2m_<s>::<R>`: native → interpreter, with the shape's own C signature
/// - `adjustor_<s>::<R>`: as `n2m_<s>` with the receiver shifted past the
///   object header (only for shapes whose first parameter is `i8`)
///
/// plus `pub struct Tables<R>` implementing `callbridge::ShapeTables`, whose
/// three tables list exactly these functions and end in a null sentinel.
///
/// Malformed or duplicate shapes are compile errors pointing at the literal.
///
/// # Example
///
/// ```ignore
/// callbridge::bridge_shapes! { "i4i8i4", "vi8" }
///
/// let m2n = Tables::<MyRuntime>::M2N;
/// ```
#[proc_macro]
pub fn bridge_shapes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as expand::ShapeList);
    expand::expand_shapes(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

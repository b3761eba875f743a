// bridge_shapes! implementation
//
// Expands a list of mangled shapes into trampolines and dispatch tables.

use std::collections::HashSet;

use callbridge_abi::{ShapeSignature, SlotKind};
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Ident, LitStr, Result, Token};

use crate::carrier::{carrier_type, check_carrier, return_words};

/// Parsed macro input: comma-separated string literals.
pub struct ShapeList {
    shapes: Vec<ShapeSignature>,
}

impl Parse for ShapeList {
    fn parse(input: ParseStream) -> Result<Self> {
        let literals = Punctuated::<LitStr, Token![,]>::parse_terminated(input)?;
        let mut seen = HashSet::new();
        let mut shapes = Vec::with_capacity(literals.len());

        for lit in literals {
            let shape = ShapeSignature::demangle(&lit.value())
                .map_err(|e| syn::Error::new(lit.span(), e.to_string()))?;
            std::iter::once(shape.ret())
                .chain(shape.params().iter().copied())
                .try_for_each(check_carrier)
                .map_err(|msg| syn::Error::new(lit.span(), msg))?;
            if !seen.insert(shape.mangle()) {
                return Err(syn::Error::new(
                    lit.span(),
                    format!("duplicate shape `{}`", shape),
                ));
            }
            shapes.push(shape);
        }

        if shapes.is_empty() {
            return Err(syn::Error::new(
                Span::call_site(),
                "bridge_shapes! expects at least one shape",
            ));
        }
        Ok(Self { shapes })
    }
}

/// Expands the shape list.
///
/// Example expansion for `"i4i8i4"`:
/// ```ignore
/// pub unsafe extern "C" fn m2n_i4i8i4<R: Runtime>(
///     method: MethodHandle,
///     arg_var_indexes: *const u16,
///     local_var_base: *mut StackSlot,
///     ret: *mut c_void,
/// ) {
///     let native = transmute::<*const (), unsafe extern "C" fn(i64, i32, MethodHandle) -> i32>(
///         R::native_entry(method),
///     );
///     let arg0 = <i64 as Marshal>::load_arg(local_var_base.add(*arg_var_indexes.add(0) as usize));
///     let arg1 = <i32 as Marshal>::load_arg(local_var_base.add(*arg_var_indexes.add(1) as usize));
///     ret.cast::<i32>().write_unaligned(native(arg0, arg1, method));
/// }
///
/// pub unsafe extern "C" fn n2m_i4i8i4<R: Runtime>(arg0: i64, arg1: i32, method: MethodHandle) -> i32 {
///     let mut frame = [StackSlot::ZERO; 2];
///     <i64 as Marshal>::store_arg(&arg0, frame.as_mut_ptr().add(0));
///     <i32 as Marshal>::store_arg(&arg1, frame.as_mut_ptr().add(1));
///     let mut ret = [StackSlot::ZERO; 1];
///     R::execute(method, StackFrame::from_slice(&mut frame), ret.as_mut_ptr().cast());
///     ret.as_ptr().cast::<i32>().read()
/// }
///
/// pub unsafe extern "C" fn adjustor_i4i8i4<R: Runtime>(arg0: i64, arg1: i32, method: MethodHandle) -> i32 {
///     n2m_i4i8i4::<R>(arg0.wrapping_add(R::OBJECT_HEADER_SIZE as i64), arg1, method)
/// }
/// ```
pub fn expand_shapes(list: ShapeList) -> Result<TokenStream> {
    let mut items = Vec::new();
    let mut m2n_entries = Vec::new();
    let mut n2m_entries = Vec::new();
    let mut adjustor_entries = Vec::new();

    for shape in &list.shapes {
        let name = shape.mangle();
        let key = c_string(&name)?;
        let m2n = format_ident!("m2n_{}", name);
        let n2m = format_ident!("n2m_{}", name);

        items.push(expand_m2n(shape, &name, &m2n));
        items.push(expand_n2m(shape, &name, &n2m));
        m2n_entries.push(quote! {
            ::callbridge::M2nEntry::new(#key, #m2n::<R>)
        });
        n2m_entries.push(quote! {
            ::callbridge::BridgeEntry::new(#key, #n2m::<R> as *const ())
        });

        if shape.has_receiver_slot() {
            let adjustor = format_ident!("adjustor_{}", name);
            items.push(expand_adjustor(shape, &name, &adjustor, &n2m));
            adjustor_entries.push(quote! {
                ::callbridge::BridgeEntry::new(#key, #adjustor::<R> as *const ())
            });
        }
    }

    Ok(quote! {
        #(#items)*

        /// Dispatch tables over the shapes generated alongside this type.
        pub struct Tables<R>(::core::marker::PhantomData<R>);

        impl<R: ::callbridge::Runtime> ::callbridge::ShapeTables for Tables<R> {
            const M2N: &'static [::callbridge::M2nEntry] = &[
                #(#m2n_entries,)*
                ::callbridge::M2nEntry::SENTINEL,
            ];
            const N2M: &'static [::callbridge::BridgeEntry] = &[
                #(#n2m_entries,)*
                ::callbridge::BridgeEntry::SENTINEL,
            ];
            const ADJUSTOR_THUNK: &'static [::callbridge::BridgeEntry] = &[
                #(#adjustor_entries,)*
                ::callbridge::BridgeEntry::SENTINEL,
            ];
        }
    })
}

fn expand_m2n(shape: &ShapeSignature, name: &str, ident: &Ident) -> TokenStream {
    let param_types: Vec<TokenStream> = shape.params().iter().map(|k| carrier_type(*k)).collect();
    let arg_names = arg_names(shape.params().len());
    let ret_ty = carrier_type(shape.ret());
    let doc = format!(" Interpreter-to-native trampoline for shape `{}`.", name);

    let loads = arg_names
        .iter()
        .zip(&param_types)
        .enumerate()
        .map(|(i, (arg, ty))| {
            quote! {
                let #arg = <#ty as ::callbridge::Marshal>::load_arg(
                    local_var_base.add(*arg_var_indexes.add(#i) as usize),
                );
            }
        });

    let call = if shape.ret() == SlotKind::Void {
        quote! { native(#(#arg_names,)* method); }
    } else {
        quote! {
            let value = native(#(#arg_names,)* method);
            ret.cast::<#ret_ty>().write_unaligned(value);
        }
    };

    quote! {
        #[doc = #doc]
        ///
        /// # Safety
        ///
        /// `method` must resolve to a native function of exactly this shape,
        /// `arg_var_indexes` must hold one index per parameter, each naming
        /// slots inside the frame at `local_var_base`, and `ret` must point to
        /// storage for the return value.
        #[allow(non_snake_case, unused_variables, unused_unsafe)]
        pub unsafe extern "C" fn #ident<R: ::callbridge::Runtime>(
            method: ::callbridge::MethodHandle,
            arg_var_indexes: *const u16,
            local_var_base: *mut ::callbridge::StackSlot,
            ret: *mut ::core::ffi::c_void,
        ) {
            unsafe {
                let native = ::core::mem::transmute::<
                    *const (),
                    unsafe extern "C" fn(#(#param_types,)* ::callbridge::MethodHandle) -> #ret_ty,
                >(R::native_entry(method));
                #(#loads)*
                #call
            }
        }
    }
}

fn expand_n2m(shape: &ShapeSignature, name: &str, ident: &Ident) -> TokenStream {
    let param_types: Vec<TokenStream> = shape.params().iter().map(|k| carrier_type(*k)).collect();
    let arg_names = arg_names(shape.params().len());
    let param_count = shape.params().len();
    let ret_ty = carrier_type(shape.ret());
    let doc = format!(" Native-to-interpreter trampoline for shape `{}`.", name);

    let stores = arg_names
        .iter()
        .zip(&param_types)
        .enumerate()
        .map(|(i, (arg, ty))| {
            quote! {
                <#ty as ::callbridge::Marshal>::store_arg(&#arg, frame.as_mut_ptr().add(#i));
            }
        });

    let invoke = if shape.ret() == SlotKind::Void {
        quote! {
            R::execute(
                method,
                ::callbridge::StackFrame::from_slice(&mut frame),
                ::core::ptr::null_mut(),
            );
        }
    } else {
        let words = return_words(shape.ret());
        quote! {
            let mut ret = [::callbridge::StackSlot::ZERO; #words];
            R::execute(
                method,
                ::callbridge::StackFrame::from_slice(&mut frame),
                ret.as_mut_ptr().cast(),
            );
            ret.as_ptr().cast::<#ret_ty>().read()
        }
    };

    quote! {
        #[doc = #doc]
        ///
        /// # Safety
        ///
        /// `method` must describe an interpreted method of exactly this shape.
        #[allow(non_snake_case, unused_mut, unused_unsafe)]
        pub unsafe extern "C" fn #ident<R: ::callbridge::Runtime>(
            #(#arg_names: #param_types,)*
            method: ::callbridge::MethodHandle,
        ) -> #ret_ty {
            unsafe {
                let mut frame = [::callbridge::StackSlot::ZERO; #param_count];
                #(#stores)*
                #invoke
            }
        }
    }
}

fn expand_adjustor(shape: &ShapeSignature, name: &str, ident: &Ident, n2m: &Ident) -> TokenStream {
    let param_types: Vec<TokenStream> = shape.params().iter().map(|k| carrier_type(*k)).collect();
    let arg_names = arg_names(shape.params().len());
    let ret_ty = carrier_type(shape.ret());
    let receiver = &arg_names[0];
    let doc = format!(" Adjustor thunk for shape `{}`: skips the object header of the receiver.", name);

    quote! {
        #[doc = #doc]
        ///
        /// # Safety
        ///
        /// As for the matching N2M trampoline; the first argument must be a
        /// boxed value-type receiver.
        #[allow(non_snake_case, unused_unsafe)]
        pub unsafe extern "C" fn #ident<R: ::callbridge::Runtime>(
            #(#arg_names: #param_types,)*
            method: ::callbridge::MethodHandle,
        ) -> #ret_ty {
            let #receiver = #receiver.wrapping_add(R::OBJECT_HEADER_SIZE as i64);
            unsafe { #n2m::<R>(#(#arg_names,)* method) }
        }
    }
}

fn arg_names(count: usize) -> Vec<Ident> {
    (0..count).map(|i| format_ident!("arg{}", i)).collect()
}

fn c_string(name: &str) -> Result<TokenStream> {
    format!("c\"{}\"", name)
        .parse::<TokenStream>()
        .map_err(|e| syn::Error::new(Span::call_site(), format!("invalid shape key: {}", e)))
}

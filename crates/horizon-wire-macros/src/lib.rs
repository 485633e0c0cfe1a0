//! Procedural macros for Horizon Wire method tables.
//!
//! This crate provides the `#[slots]` attribute, which turns the public
//! methods of an inherent `impl` block into a dispatchable method table and
//! implements `horizon_wire_core::Object` for the type.
//!
//! # Attributes
//!
//! ## `#[slots]`
//!
//! Applied to an inherent `impl` block of a non-generic type:
//!
//! ```ignore
//! #[slots]
//! impl Plot {
//!     pub fn set_title(&mut self, title: String) {
//!         self.title = title;
//!     }
//!
//!     pub fn title(&self) -> String {
//!         self.title.clone()
//!     }
//!
//!     #[slot(name = "refresh")]
//!     pub fn redraw_all(&mut self) {
//!         // ...
//!     }
//!
//!     #[slot(skip)]
//!     pub fn layout_cache(&self) -> &Layout {
//!         &self.layout
//!     }
//! }
//! ```
//!
//! A method is registered when it is `pub`, takes `&self` or `&mut self`,
//! has no generic parameters and at most two further parameters. Parameter
//! types must implement `FromValue` and the return type `IntoSlotReturn`.
//!
//! ## `#[slot(...)]`
//!
//! Method-level options:
//! - `name = "..."`: Register the method under another name
//! - `skip`: Leave the method out of the table

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{
    parse_macro_input, FnArg, ImplItem, ImplItemFn, ItemImpl, LitStr, Pat, Type, Visibility,
};

/// Most parameters a registered method may take, besides the receiver.
const MAX_PARAMS: usize = 2;

/// Generate the method table and `Object` impl for an inherent impl block.
///
/// # Example
///
/// ```ignore
/// use horizon_wire_macros::slots;
///
/// #[derive(Default)]
/// struct Counter {
///     count: i64,
/// }
///
/// #[slots]
/// impl Counter {
///     pub fn increment(&mut self) {
///         self.count += 1;
///     }
///
///     pub fn add(&mut self, amount: i64) {
///         self.count += amount;
///     }
///
///     pub fn count(&self) -> i64 {
///         self.count
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn slots(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[slots] does not take arguments",
        )
        .to_compile_error()
        .into();
    }

    let mut input = parse_macro_input!(item as ItemImpl);

    match impl_slots(&mut input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// A method selected for the table.
struct SlotInfo {
    method: syn::Ident,
    name: String,
    param_types: Vec<Type>,
}

/// Parsed `#[slot(...)]` options.
#[derive(Default)]
struct SlotAttrs {
    name: Option<String>,
    skip: bool,
}

fn impl_slots(input: &mut ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[slots] only supports inherent impl blocks",
        ));
    }
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[slots] does not support generic impl blocks",
        ));
    }

    let self_ty = input.self_ty.as_ref().clone();
    let type_name = type_display_name(&self_ty)?;

    let mut slots = Vec::new();
    for item in &mut input.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        let attrs = take_slot_attrs(method)?;
        if attrs.skip {
            continue;
        }
        if let Some(slot) = parse_slot(method, attrs)? {
            slots.push(slot);
        }
    }

    let registrations = generate_registrations(&self_ty, &slots);

    Ok(quote! {
        #input

        impl ::horizon_wire_core::Object for #self_ty {
            fn meta_object(&self) -> &'static ::horizon_wire_core::MetaObject {
                <Self as ::horizon_wire_core::Object>::static_meta_object()
            }

            fn static_meta_object() -> &'static ::horizon_wire_core::MetaObject {
                static META: ::std::sync::LazyLock<::horizon_wire_core::MetaObject> =
                    ::std::sync::LazyLock::new(|| {
                        ::horizon_wire_core::MetaObject::builder::<#self_ty>(#type_name)
                            #(#registrations)*
                            .build()
                    });
                &META
            }
        }
    })
}

/// The last path segment of the implementing type, used as its display name.
fn type_display_name(ty: &Type) -> syn::Result<String> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .ok_or_else(|| syn::Error::new_spanned(ty, "#[slots] needs a named type")),
        _ => Err(syn::Error::new_spanned(ty, "#[slots] needs a named type")),
    }
}

/// Parse and remove `#[slot(...)]` attributes from a method.
fn take_slot_attrs(method: &mut ImplItemFn) -> syn::Result<SlotAttrs> {
    let mut result = SlotAttrs::default();

    for attr in method.attrs.iter().filter(|attr| attr.path().is_ident("slot")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                result.skip = true;
                Ok(())
            } else if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(meta.error("slot name must not be empty"));
                }
                result.name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `skip` or `name = \"...\"`"))
            }
        })?;
    }

    method.attrs.retain(|attr| !attr.path().is_ident("slot"));
    Ok(result)
}

/// Decide whether `method` is registered, and with which parameters.
///
/// Methods that are not `pub`, have no `self` receiver or are generic are
/// silently left out. Methods that would be registered but cannot be are
/// rejected.
fn parse_slot(method: &ImplItemFn, attrs: SlotAttrs) -> syn::Result<Option<SlotInfo>> {
    let sig = &method.sig;

    if !matches!(method.vis, Visibility::Public(_)) {
        return Ok(None);
    }
    if !sig.generics.params.is_empty() {
        return Ok(None);
    }
    let Some(FnArg::Receiver(receiver)) = sig.inputs.first() else {
        return Ok(None);
    };
    if receiver.reference.is_none() {
        return Err(syn::Error::new_spanned(
            receiver,
            "slot methods must take `&self` or `&mut self`; use #[slot(skip)] to leave this method out",
        ));
    }
    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            sig.asyncness,
            "async methods cannot be slots; use #[slot(skip)] to leave this method out",
        ));
    }

    let mut param_types = Vec::new();
    for input in sig.inputs.iter().skip(1) {
        let FnArg::Typed(typed) = input else {
            continue;
        };
        if let Type::Reference(_) = typed.ty.as_ref() {
            return Err(syn::Error::new_spanned(
                &typed.ty,
                "slot parameters must be owned types",
            ));
        }
        if !matches!(typed.pat.as_ref(), Pat::Ident(_) | Pat::Wild(_)) {
            return Err(syn::Error::new_spanned(
                &typed.pat,
                "slot parameters must be plain identifiers",
            ));
        }
        param_types.push(typed.ty.as_ref().clone());
    }

    if param_types.len() > MAX_PARAMS {
        return Err(syn::Error::new_spanned(
            &sig.inputs,
            format!(
                "slot methods take at most {MAX_PARAMS} parameters; use #[slot(skip)] to leave this method out"
            ),
        ));
    }

    Ok(Some(SlotInfo {
        method: sig.ident.clone(),
        name: attrs.name.unwrap_or_else(|| sig.ident.unraw().to_string()),
        param_types,
    }))
}

/// Builder calls registering each slot.
fn generate_registrations(self_ty: &Type, slots: &[SlotInfo]) -> Vec<TokenStream2> {
    slots
        .iter()
        .map(|slot| {
            let method = &slot.method;
            let name = &slot.name;
            let types = &slot.param_types;
            let args: Vec<_> = (0..types.len()).map(|i| format_ident!("a{}", i)).collect();
            let register = format_ident!("slot{}", types.len());

            quote! {
                .#register(#name, |this: &mut #self_ty #(, #args: #types)*| this.#method(#(#args),*))
            }
        })
        .collect()
}

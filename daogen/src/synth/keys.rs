//! Key-path synthesis.
//!
//! Emits the opt-in `{Entity}Keys` companion type: one typed
//! [`QueryKey`](crate::rt::QueryKey) accessor per plain field. The type has
//! a private unit field so the only instance is the one handed out by
//! `shared()`.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::Path;

use super::lit;
use crate::model::ModelDescriptor;

/// Emit the typed-key companion for one model. Relationship fields are not
/// queryable columns and get no key.
pub fn emit_keys(model: &ModelDescriptor, rt: &Path) -> TokenStream {
    let entity = &model.name;
    let keys_ident = format_ident!("{}Keys", entity);
    let keys_doc = format!("Typed query keys for [`{entity}`], one per stored column.");

    let accessors: Vec<TokenStream> = model
        .fields
        .iter()
        .map(|field| {
            let method = &field.ident;
            let ty = &field.ty;
            let column = lit(&field.column);
            let doc = match &field.description {
                Some(description) => format!("Key for the `{}` column. {description}", field.column),
                None => format!("Key for the `{}` column.", field.column),
            };
            quote! {
                #[doc = #doc]
                pub const fn #method(&self) -> #rt::QueryKey<#ty> {
                    #rt::QueryKey::new(#column)
                }
            }
        })
        .collect();

    quote! {
        #[doc = #keys_doc]
        #[derive(Debug, Clone, Copy)]
        pub struct #keys_ident {
            _seal: (),
        }

        impl #keys_ident {
            /// The single shared instance. The sealing field keeps outside
            /// code from constructing another.
            pub fn shared() -> &'static Self {
                static SHARED: #keys_ident = #keys_ident { _seal: () };
                &SHARED
            }

            #(#accessors)*
        }
    }
}

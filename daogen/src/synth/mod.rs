//! Code synthesis: token streams for the generated data-access types.

mod dao;
mod keys;

pub use dao::emit_dao;
pub use keys::emit_keys;

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::LitStr;

pub(crate) fn lit(value: &str) -> LitStr {
    LitStr::new(value, Span::call_site())
}

pub(crate) fn optional_static_str(value: &Option<String>) -> TokenStream {
    match value {
        Some(value) => {
            let value = lit(value);
            quote! { ::std::option::Option::Some(#value) }
        }
        None => quote! { ::std::option::Option::None },
    }
}

//! Derive front-ends for the `daogen` generator.
//!
//! `#[derive(DaoModel)]` runs the same analysis and synthesis as the
//! source-text pipeline and expands the `{Entity}Dao` type in place.
//! `#[derive(DaoKeys)]` expands only the `{Entity}Keys` companion; use it
//! on models that want typed keys without a generated data-access type, or
//! mark a `DaoModel` struct with `#[dao(keys)]` instead. Do not combine
//! `DaoKeys` with `#[dao(keys)]` or the companion expands twice.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

#[proc_macro_derive(DaoModel, attributes(dao))]
pub fn derive_dao_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let span = input.ident.span();

    match daogen::ModelDescriptor::from_derive_input(&input) {
        Ok(model) => {
            let rt = daogen::default_runtime_path();
            let mut tokens = proc_macro2::TokenStream::new();
            if !model.skip_dao {
                tokens.extend(daogen::emit_dao(&model, &rt));
            }
            if model.gen_keys {
                tokens.extend(daogen::emit_keys(&model, &rt));
            }
            tokens.into()
        }
        Err(err) => err.into_syn_error(span).to_compile_error().into(),
    }
}

#[proc_macro_derive(DaoKeys, attributes(dao))]
pub fn derive_dao_keys(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let span = input.ident.span();

    match daogen::ModelDescriptor::from_derive_input(&input) {
        Ok(model) => {
            let rt = daogen::default_runtime_path();
            daogen::emit_keys(&model, &rt).into()
        }
        Err(err) => err.into_syn_error(span).to_compile_error().into(),
    }
}

//! Field-level metadata extraction.
//!
//! Reads one struct field and produces a [`FieldDescriptor`]: name, declared
//! type, column mapping, nullability, and the write-exclusion flags. Fields
//! carrying a relationship marker never reach this module; they are handled
//! by the relationship analyzer.

use quote::ToTokens;
use syn::spanned::Spanned;
use syn::{Attribute, Error, Field, Ident, LitStr, Result, Type};

/// Description of one plain (non-relationship) field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub ident: Ident,
    pub name: String,
    /// The declared type, kept for emission into generated signatures.
    pub ty: Type,
    /// Deterministic textual rendering of the type, recursing into
    /// generic/container arguments (`Vec<Post>` renders as `"Vec<Post>"`).
    pub type_name: String,
    /// Column this field maps to. Defaults to snake_case of the field name;
    /// an explicit `column = "..."` override always wins.
    pub column: String,
    /// True for `Option<T>` fields.
    pub nullable: bool,
    pub primary_key: bool,
    pub computed: bool,
    pub exclude_insert: bool,
    pub exclude_update: bool,
    pub description: Option<String>,
}

impl FieldDescriptor {
    /// Extract metadata from one named field. Callers must have ruled out
    /// relationship markers first.
    pub fn from_field(field: &Field) -> Result<Self> {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new(field.span(), "DaoModel requires named fields"))?;
        let name = ident.to_string();

        let mut column: Option<String> = None;
        let mut primary_key = false;
        let mut computed = false;
        let mut exclude_insert = false;
        let mut exclude_update = false;
        let mut description: Option<String> = None;

        for attr in &field.attrs {
            if !attr.path().is_ident("dao") {
                continue;
            }
            Self::parse_field_attr(
                attr,
                &name,
                &mut column,
                &mut primary_key,
                &mut computed,
                &mut exclude_insert,
                &mut exclude_update,
                &mut description,
            )?;
        }

        // The primary key and computed fields are never written, regardless
        // of explicit flags.
        if primary_key || computed {
            exclude_insert = true;
            exclude_update = true;
        }

        Ok(Self {
            column: column.unwrap_or_else(|| to_snake_case(&name)),
            type_name: type_name(&field.ty),
            nullable: unwrap_option(&field.ty).is_some(),
            ty: field.ty.clone(),
            ident,
            name,
            primary_key,
            computed,
            exclude_insert,
            exclude_update,
            description,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_field_attr(
        attr: &Attribute,
        field_name: &str,
        column: &mut Option<String>,
        primary_key: &mut bool,
        computed: &mut bool,
        exclude_insert: &mut bool,
        exclude_update: &mut bool,
        description: &mut Option<String>,
    ) -> Result<()> {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("primary_key") {
                if *primary_key {
                    return Err(meta.error("field already marked as #[dao(primary_key)]"));
                }
                *primary_key = true;
            } else if meta.path.is_ident("computed") {
                *computed = true;
            } else if meta.path.is_ident("column") {
                let value: LitStr = meta.value()?.parse()?;
                *column = Some(value.value());
            } else if meta.path.is_ident("exclude_insert") {
                *exclude_insert = true;
            } else if meta.path.is_ident("exclude_update") {
                *exclude_update = true;
            } else if meta.path.is_ident("description") {
                let value: LitStr = meta.value()?.parse()?;
                *description = Some(value.value());
            } else {
                return Err(meta.error(format!(
                    "unknown dao marker on field `{field_name}`, expected primary_key, computed, \
                     column, exclude_insert, exclude_update, or description"
                )));
            }
            Ok(())
        })
    }
}

/// Render a type as deterministic text, recursing into generic arguments.
/// Path types render by their last segment (`std::vec::Vec<Post>` becomes
/// `Vec<Post>`); references and other shapes fall back to token rendering.
pub(crate) fn type_name(ty: &Type) -> String {
    match ty {
        Type::Path(path) => {
            let Some(segment) = path.path.segments.last() else {
                return ty.to_token_stream().to_string();
            };
            let name = segment.ident.to_string();
            match &segment.arguments {
                syn::PathArguments::AngleBracketed(args) => {
                    let rendered: Vec<String> = args
                        .args
                        .iter()
                        .map(|arg| match arg {
                            syn::GenericArgument::Type(inner) => type_name(inner),
                            other => other.to_token_stream().to_string(),
                        })
                        .collect();
                    format!("{}<{}>", name, rendered.join(", "))
                }
                _ => name,
            }
        }
        Type::Reference(reference) => format!("&{}", type_name(&reference.elem)),
        other => other.to_token_stream().to_string(),
    }
}

/// Peel `Option<T>`, returning the inner type.
pub(crate) fn unwrap_option(ty: &Type) -> Option<&Type> {
    unwrap_generic(ty, "Option")
}

/// Peel `Vec<T>`, returning the element type.
pub(crate) fn unwrap_vec(ty: &Type) -> Option<&Type> {
    unwrap_generic(ty, "Vec")
}

fn unwrap_generic<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => args.args.first().and_then(|arg| match arg {
            syn::GenericArgument::Type(inner) => Some(inner),
            _ => None,
        }),
        _ => None,
    }
}

/// Convert an identifier to snake_case. Idempotent on input that is already
/// snake_case.
pub(crate) fn to_snake_case(name: &str) -> String {
    let mut result = String::new();
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(ch.to_ascii_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

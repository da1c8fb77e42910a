//! The parsed-model layer.
//!
//! A [`ModelDescriptor`] is built fresh from one model declaration per
//! generation pass and discarded after emission; nothing here outlives a
//! single invocation.

mod field;
mod relation;

pub use field::FieldDescriptor;
pub use relation::{RelationDescriptor, RelationKind};

use syn::{Data, DeriveInput, Error, Fields, Ident, LitStr};

use crate::errors::GenError;

/// Everything the synthesizers need to know about one model.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    pub name: Ident,
    /// Table the DAO binds. Defaults to the pluralized snake_case of the
    /// entity name; `#[dao(table = "...")]` overrides.
    pub table: String,
    /// Plain fields in declaration order. Relationship-bearing fields are
    /// excluded; they appear in `relations` instead.
    pub fields: Vec<FieldDescriptor>,
    /// Relationships in field-declaration order.
    pub relations: Vec<RelationDescriptor>,
    /// The model supplies its own `from_row` routine; the generated
    /// deserializer delegates instead of synthesizing field access.
    pub custom_from_row: bool,
    /// The model supplies its own `to_row` routine.
    pub custom_to_row: bool,
    /// Model-level opt-out of DAO generation.
    pub skip_dao: bool,
    /// Model-level opt-in to key-descriptor generation.
    pub gen_keys: bool,
}

impl ModelDescriptor {
    pub fn from_derive_input(input: &DeriveInput) -> std::result::Result<Self, GenError> {
        let name = input.ident.clone();
        let model = name.to_string();

        let mut table: Option<String> = None;
        let mut custom_from_row = false;
        let mut custom_to_row = false;
        let mut skip_dao = false;
        let mut gen_keys = false;

        for attr in &input.attrs {
            if !attr.path().is_ident("dao") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let value: LitStr = meta.value()?.parse()?;
                    table = Some(value.value());
                } else if meta.path.is_ident("from_row") {
                    custom_from_row = true;
                } else if meta.path.is_ident("to_row") {
                    custom_to_row = true;
                } else if meta.path.is_ident("skip_dao") {
                    skip_dao = true;
                } else if meta.path.is_ident("keys") {
                    gen_keys = true;
                } else {
                    return Err(meta.error(
                        "unknown dao marker on model, expected table, from_row, to_row, skip_dao, or keys",
                    ));
                }
                Ok(())
            })?;
        }

        let named = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => &named.named,
                // No usable plain constructor to synthesize field access
                // against. A custom from_row does not help: the extractor
                // still needs named fields to map columns.
                _ if !custom_from_row => return Err(GenError::MissingConstructor { model }),
                _ => {
                    return Err(Error::new(input.ident.span(), "DaoModel requires named fields").into());
                }
            },
            _ => {
                return Err(Error::new(input.ident.span(), "DaoModel can only be derived for structs").into());
            }
        };

        let mut fields = Vec::new();
        let mut relations = Vec::new();
        for field in named {
            match RelationDescriptor::from_field(field)? {
                Some(relation) => relations.push(relation),
                None => fields.push(FieldDescriptor::from_field(field)?),
            }
        }

        let mut primary_keys = fields.iter().filter(|field| field.primary_key);
        if primary_keys.next().is_none() {
            return Err(GenError::MissingPrimaryKey { model });
        }
        if let Some(second) = primary_keys.next() {
            return Err(Error::new(
                second.ident.span(),
                format!("model `{model}` allows exactly one #[dao(primary_key)] field"),
            )
            .into());
        }

        Ok(Self {
            table: table.unwrap_or_else(|| pluralize(&field::to_snake_case(&model))),
            name,
            fields,
            relations,
            custom_from_row,
            custom_to_row,
            skip_dao,
            gen_keys,
        })
    }

    /// The single primary-key field. Guaranteed present by construction.
    pub fn primary_key(&self) -> &FieldDescriptor {
        self.fields
            .iter()
            .find(|field| field.primary_key)
            .expect("validated at construction")
    }
}

/// Simple pluralization for default table names.
fn pluralize(word: &str) -> String {
    if word.ends_with('s') || word.ends_with('x') || word.ends_with("ch") || word.ends_with("sh") {
        format!("{word}es")
    } else if word.ends_with('y')
        && !word.ends_with("ay")
        && !word.ends_with("ey")
        && !word.ends_with("oy")
        && !word.ends_with("uy")
    {
        format!("{}ies", &word[..word.len() - 1])
    } else {
        format!("{word}s")
    }
}

//! Relationship analysis.
//!
//! Scans a model's fields for the four relationship markers and produces one
//! [`RelationDescriptor`] per marked field, in field-declaration order. That
//! order drives the relationship-registration statements the DAO synthesizer
//! emits, so it must be deterministic.

use proc_macro2::TokenStream;
use syn::meta::ParseNestedMeta;
use syn::{Expr, Field, Ident, LitStr, Result, Token, parenthesized, token};

use super::field::{type_name, unwrap_option, unwrap_vec};

/// The four relationship kinds, as analyzed from the declaration. The DAO
/// synthesizer maps these 1:1 onto the registration tags
/// (HasMany/BelongsTo/HasOne/ManyToMany).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    OneToMany,
    ManyToOne,
    OneToOne,
    ManyToMany,
}

impl RelationKind {
    fn marker(self) -> &'static str {
        match self {
            RelationKind::OneToMany => "has_many",
            RelationKind::ManyToOne => "belongs_to",
            RelationKind::OneToOne => "has_one",
            RelationKind::ManyToMany => "many_to_many",
        }
    }
}

/// One analyzed relationship.
#[derive(Debug, Clone)]
pub struct RelationDescriptor {
    /// The field the relationship was declared on, kept as the original
    /// identifier so raw identifiers survive re-emission.
    pub ident: Ident,
    /// Name of the field the relationship was declared on.
    pub field: String,
    pub kind: RelationKind,
    /// Related entity type name: the element type of the `Vec` field for
    /// OneToMany/ManyToMany, the field's own declared type otherwise.
    pub related: String,
    /// Foreign-key column. For ManyToMany this is the source key of the
    /// junction table.
    pub foreign_key: String,
    /// Junction table; ManyToMany only.
    pub pivot_table: Option<String>,
    /// Key on the related side of the junction; ManyToMany only.
    pub related_key: Option<String>,
    /// Defaults to false when absent.
    pub eager: bool,
    /// Raw filter expression handed to the data-access runtime, never
    /// evaluated here. Defaults to none.
    pub filter: Option<String>,
}

impl RelationDescriptor {
    /// Analyze one field. Returns `Ok(None)` for plain fields. A field
    /// carrying more than one relationship marker is rejected outright
    /// rather than resolved by marker precedence.
    pub fn from_field(field: &Field) -> Result<Option<Self>> {
        let Some(ident) = &field.ident else {
            return Ok(None);
        };
        let field_name = ident.to_string();

        let mut found: Option<RelationDescriptor> = None;

        for attr in &field.attrs {
            if !attr.path().is_ident("dao") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                let Some(kind) = marker_kind(&meta) else {
                    // Plain-field markers on the same attribute are the
                    // metadata extractor's business; consume and move on.
                    return skip_meta_value(&meta);
                };
                if let Some(existing) = &found {
                    return Err(meta.error(format!(
                        "field `{}` already carries relationship marker `{}`; a field may carry \
                         exactly one relationship marker",
                        field_name,
                        existing.kind.marker(),
                    )));
                }
                found = Some(Self::parse_marker(&meta, kind, field, ident)?);
                Ok(())
            })?;
        }

        Ok(found)
    }

    fn parse_marker(meta: &ParseNestedMeta, kind: RelationKind, field: &Field, ident: &Ident) -> Result<Self> {
        let field_name = ident.to_string();
        let mut foreign_key: Option<String> = None;
        let mut pivot_table: Option<String> = None;
        let mut related_key: Option<String> = None;
        let mut eager = false;
        let mut filter: Option<String> = None;

        if meta.input.peek(token::Paren) {
            meta.parse_nested_meta(|arg| {
                if arg.path.is_ident("foreign_key") {
                    let value: LitStr = arg.value()?.parse()?;
                    foreign_key = Some(value.value());
                } else if arg.path.is_ident("pivot_table") {
                    let value: LitStr = arg.value()?.parse()?;
                    pivot_table = Some(value.value());
                } else if arg.path.is_ident("related_key") {
                    let value: LitStr = arg.value()?.parse()?;
                    related_key = Some(value.value());
                } else if arg.path.is_ident("eager") {
                    eager = true;
                } else if arg.path.is_ident("filter") {
                    let value: LitStr = arg.value()?.parse()?;
                    filter = Some(value.value());
                } else {
                    return Err(arg.error(format!(
                        "unknown {} argument, expected foreign_key, pivot_table, related_key, eager, or filter",
                        kind.marker()
                    )));
                }
                Ok(())
            })?;
        }

        let foreign_key = foreign_key
            .ok_or_else(|| meta.error(format!("{} on `{field_name}` requires foreign_key = \"...\"", kind.marker())))?;

        if kind == RelationKind::ManyToMany {
            if pivot_table.is_none() {
                return Err(meta.error(format!("many_to_many on `{field_name}` requires pivot_table = \"...\"")));
            }
            if related_key.is_none() {
                return Err(meta.error(format!("many_to_many on `{field_name}` requires related_key = \"...\"")));
            }
        } else if pivot_table.is_some() || related_key.is_some() {
            return Err(meta.error(format!(
                "pivot_table/related_key are only valid on many_to_many, not {}",
                kind.marker()
            )));
        }

        let related = related_type(kind, field, &field_name, meta)?;

        Ok(Self {
            ident: ident.clone(),
            field: field_name,
            kind,
            related,
            foreign_key,
            pivot_table,
            related_key,
            eager,
            filter,
        })
    }
}

/// Resolve the related entity type name according to the shape invariant:
/// sequence-valued kinds take the element type, the other kinds take the
/// field's declared type (resolved through `Option`).
fn related_type(kind: RelationKind, field: &Field, field_name: &str, meta: &ParseNestedMeta) -> Result<String> {
    match kind {
        RelationKind::OneToMany | RelationKind::ManyToMany => {
            let element = unwrap_vec(&field.ty).ok_or_else(|| {
                meta.error(format!(
                    "{} on `{field_name}` requires a Vec<T> field; the element type is the related entity",
                    kind.marker()
                ))
            })?;
            Ok(type_name(element))
        }
        RelationKind::ManyToOne | RelationKind::OneToOne => {
            let ty = unwrap_option(&field.ty).unwrap_or(&field.ty);
            Ok(type_name(ty))
        }
    }
}

fn marker_kind(meta: &ParseNestedMeta) -> Option<RelationKind> {
    if meta.path.is_ident("has_many") {
        Some(RelationKind::OneToMany)
    } else if meta.path.is_ident("belongs_to") {
        Some(RelationKind::ManyToOne)
    } else if meta.path.is_ident("has_one") {
        Some(RelationKind::OneToOne)
    } else if meta.path.is_ident("many_to_many") {
        Some(RelationKind::ManyToMany)
    } else {
        None
    }
}

/// Consume a marker's value or argument list without interpreting it, so the
/// relationship scan can step over plain-field markers.
fn skip_meta_value(meta: &ParseNestedMeta) -> Result<()> {
    if meta.input.peek(Token![=]) {
        let _value: Expr = meta.value()?.parse()?;
    } else if meta.input.peek(token::Paren) {
        let content;
        parenthesized!(content in meta.input);
        let _rest: TokenStream = content.parse()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_field(code: &str) -> Field {
        let wrapped = format!("struct Wrapper {{ {code} }}");
        let item: syn::ItemStruct = syn::parse_str(&wrapped).expect("struct parses");
        match item.fields {
            syn::Fields::Named(named) => named.named.into_iter().next().expect("one field"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn has_many_resolves_element_type() {
        let field = parse_field("#[dao(has_many(foreign_key = \"user_id\"))] posts: Vec<Post>");
        let relation = RelationDescriptor::from_field(&field).expect("parses").expect("is relation");
        assert_eq!(relation.kind, RelationKind::OneToMany);
        assert_eq!(relation.related, "Post");
        assert_eq!(relation.foreign_key, "user_id");
        assert!(!relation.eager);
        assert!(relation.filter.is_none());
        assert!(relation.pivot_table.is_none());
    }

    #[test]
    fn belongs_to_uses_declared_type_through_option() {
        let field = parse_field("#[dao(belongs_to(foreign_key = \"author_id\"))] author: Option<Author>");
        let relation = RelationDescriptor::from_field(&field).expect("parses").expect("is relation");
        assert_eq!(relation.kind, RelationKind::ManyToOne);
        assert_eq!(relation.related, "Author");
    }

    #[test]
    fn has_one_uses_declared_type() {
        let field = parse_field("#[dao(has_one(foreign_key = \"user_id\", eager))] profile: Option<Profile>");
        let relation = RelationDescriptor::from_field(&field).expect("parses").expect("is relation");
        assert_eq!(relation.kind, RelationKind::OneToOne);
        assert_eq!(relation.related, "Profile");
        assert!(relation.eager);
    }

    #[test]
    fn many_to_many_decodes_junction_arguments() {
        let field = parse_field(
            "#[dao(many_to_many(foreign_key = \"user_id\", related_key = \"role_id\", \
             pivot_table = \"user_roles\", filter = \"active = 1\"))] roles: Vec<Role>",
        );
        let relation = RelationDescriptor::from_field(&field).expect("parses").expect("is relation");
        assert_eq!(relation.kind, RelationKind::ManyToMany);
        assert_eq!(relation.related, "Role");
        assert_eq!(relation.foreign_key, "user_id");
        assert_eq!(relation.related_key.as_deref(), Some("role_id"));
        assert_eq!(relation.pivot_table.as_deref(), Some("user_roles"));
        assert_eq!(relation.filter.as_deref(), Some("active = 1"));
    }

    #[test]
    fn raw_identifier_fields_keep_their_original_ident() {
        let field = parse_field("#[dao(has_many(foreign_key = \"audit_id\"))] r#type: Vec<Kind>");
        let relation = RelationDescriptor::from_field(&field).expect("parses").expect("is relation");
        assert_eq!(relation.ident, field.ident.clone().expect("named"));
        assert_eq!(relation.related, "Kind");
    }

    #[test]
    fn plain_field_is_not_a_relation() {
        let field = parse_field("#[dao(primary_key)] id: i64");
        assert!(RelationDescriptor::from_field(&field).expect("parses").is_none());
    }

    #[test]
    fn multiple_relationship_markers_are_rejected() {
        let field = parse_field(
            "#[dao(belongs_to(foreign_key = \"a_id\"), has_one(foreign_key = \"b_id\"))] other: Other",
        );
        let err = RelationDescriptor::from_field(&field).expect_err("rejected");
        assert!(err.to_string().contains("exactly one relationship marker"));
    }

    #[test]
    fn missing_foreign_key_is_rejected() {
        let field = parse_field("#[dao(has_many(eager))] posts: Vec<Post>");
        let err = RelationDescriptor::from_field(&field).expect_err("rejected");
        assert!(err.to_string().contains("requires foreign_key"));
    }

    #[test]
    fn has_many_requires_sequence_field() {
        let field = parse_field("#[dao(has_many(foreign_key = \"user_id\"))] post: Post");
        let err = RelationDescriptor::from_field(&field).expect_err("rejected");
        assert!(err.to_string().contains("Vec<T>"));
    }

    #[test]
    fn junction_arguments_rejected_outside_many_to_many() {
        let field = parse_field("#[dao(has_many(foreign_key = \"user_id\", pivot_table = \"x\"))] posts: Vec<Post>");
        let err = RelationDescriptor::from_field(&field).expect_err("rejected");
        assert!(err.to_string().contains("only valid on many_to_many"));
    }

    #[test]
    fn many_to_many_requires_junction_arguments() {
        let field = parse_field("#[dao(many_to_many(foreign_key = \"user_id\"))] roles: Vec<Role>");
        let err = RelationDescriptor::from_field(&field).expect_err("rejected");
        assert!(err.to_string().contains("pivot_table"));
    }
}

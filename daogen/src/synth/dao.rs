//! DAO synthesis.
//!
//! Combines the field and relationship descriptors of one model into the
//! token stream for its data-access type. Emission order is fixed by the
//! descriptors' declaration order, so repeated runs over identical input
//! produce identical tokens.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::Path;

use super::{lit, optional_static_str};
use crate::model::{ModelDescriptor, RelationDescriptor, RelationKind};

/// Emit the data-access type for one model. `rt` is the path the generated
/// code uses to reach the runtime support types, normally `::daogen::rt`.
pub fn emit_dao(model: &ModelDescriptor, rt: &Path) -> TokenStream {
    let entity = &model.name;
    let dao_ident = format_ident!("{}Dao", entity);
    let entity_lit = lit(&entity.to_string());
    let dao_doc = format!("Generated data-access type for [`{entity}`].");

    let constructor = emit_constructor(model, rt);
    let from_row = emit_from_row(model, rt, &entity_lit);
    let to_row = emit_to_row(model, rt);
    let write_rows = emit_write_rows(model, rt);
    let primary_key = emit_primary_key(model, rt);
    let field_accessor = emit_field_accessor(model, rt);
    let field_mutator = emit_field_mutator(model, rt, &entity_lit);

    quote! {
        #[doc = #dao_doc]
        #[derive(Debug, Clone)]
        pub struct #dao_ident {
            table: &'static str,
            relations: ::std::vec::Vec<#rt::RelationRecord>,
        }

        impl #dao_ident {
            #constructor

            /// The configured table name.
            pub fn table_name(&self) -> &'static str {
                self.table
            }

            /// Registered relationships, in field-declaration order.
            pub fn relations(&self) -> &[#rt::RelationRecord] {
                &self.relations
            }

            #from_row
            #to_row
            #write_rows
            #primary_key
            #field_accessor
            #field_mutator
        }

        impl ::std::default::Default for #dao_ident {
            fn default() -> Self {
                Self::new()
            }
        }
    }
}

fn emit_constructor(model: &ModelDescriptor, rt: &Path) -> TokenStream {
    let table = lit(&model.table);
    if model.relations.is_empty() {
        return quote! {
            pub fn new() -> Self {
                Self {
                    table: #table,
                    relations: ::std::vec::Vec::new(),
                }
            }
        };
    }

    let records: Vec<TokenStream> = model
        .relations
        .iter()
        .map(|relation| relation_record(relation, rt))
        .collect();

    quote! {
        pub fn new() -> Self {
            let mut relations = ::std::vec::Vec::new();
            #(relations.push(#records);)*
            Self {
                table: #table,
                relations,
            }
        }
    }
}

fn relation_record(relation: &RelationDescriptor, rt: &Path) -> TokenStream {
    let kind = match relation.kind {
        RelationKind::OneToMany => quote! { #rt::RelationKind::HasMany },
        RelationKind::ManyToOne => quote! { #rt::RelationKind::BelongsTo },
        RelationKind::OneToOne => quote! { #rt::RelationKind::HasOne },
        RelationKind::ManyToMany => quote! { #rt::RelationKind::ManyToMany },
    };
    let field = lit(&relation.field);
    let related = lit(&relation.related);
    let foreign_key = lit(&relation.foreign_key);
    let pivot_table = optional_static_str(&relation.pivot_table);
    let related_key = optional_static_str(&relation.related_key);
    let eager = relation.eager;
    let filter = optional_static_str(&relation.filter);

    quote! {
        #rt::RelationRecord {
            kind: #kind,
            field: #field,
            related: #related,
            foreign_key: #foreign_key,
            pivot_table: #pivot_table,
            related_key: #related_key,
            eager: #eager,
            filter: #filter,
        }
    }
}

fn emit_from_row(model: &ModelDescriptor, rt: &Path, entity_lit: &syn::LitStr) -> TokenStream {
    let entity = &model.name;

    if model.custom_from_row {
        // The model brings its own deserialization routine; delegate
        // verbatim instead of synthesizing field access.
        return quote! {
            pub fn from_row(row: &#rt::Row) -> ::std::result::Result<#entity, #rt::DaoError> {
                #entity::from_row(row)
            }
        };
    }

    let reads: Vec<TokenStream> = model
        .fields
        .iter()
        .map(|field| {
            let ident = &field.ident;
            let column = lit(&field.column);
            quote! { #ident: #rt::decode(row, #entity_lit, #column)?, }
        })
        .collect();
    // Relationship fields are hydrated by the data-access runtime after
    // load; the synthesized constructor leaves them at their default.
    let relation_defaults: Vec<TokenStream> = model
        .relations
        .iter()
        .map(|relation| {
            let ident = &relation.ident;
            quote! { #ident: ::std::default::Default::default(), }
        })
        .collect();

    quote! {
        pub fn from_row(row: &#rt::Row) -> ::std::result::Result<#entity, #rt::DaoError> {
            ::std::result::Result::Ok(#entity {
                #(#reads)*
                #(#relation_defaults)*
            })
        }
    }
}

fn emit_to_row(model: &ModelDescriptor, rt: &Path) -> TokenStream {
    let entity = &model.name;

    if model.custom_to_row {
        return quote! {
            pub fn to_row(model: &#entity) -> #rt::Row {
                model.to_row()
            }
        };
    }

    let writes: Vec<TokenStream> = model
        .fields
        .iter()
        .map(|field| {
            let ident = &field.ident;
            let column = lit(&field.column);
            quote! { row.insert(#column.to_string(), #rt::encode(&model.#ident)); }
        })
        .collect();

    quote! {
        pub fn to_row(model: &#entity) -> #rt::Row {
            let mut row = #rt::Row::new();
            #(#writes)*
            #rt::strip_nulls(&mut row);
            row
        }
    }
}

fn emit_write_rows(model: &ModelDescriptor, rt: &Path) -> TokenStream {
    let entity = &model.name;
    let insert_excluded: Vec<syn::LitStr> = model
        .fields
        .iter()
        .filter(|field| field.exclude_insert)
        .map(|field| lit(&field.column))
        .collect();
    let update_excluded: Vec<syn::LitStr> = model
        .fields
        .iter()
        .filter(|field| field.exclude_update)
        .map(|field| lit(&field.column))
        .collect();

    quote! {
        /// Serialized row for inserts, with insert-excluded columns removed.
        pub fn insert_row(model: &#entity) -> #rt::Row {
            let mut row = Self::to_row(model);
            #(row.remove(#insert_excluded);)*
            row
        }

        /// Serialized row for updates, with update-excluded columns removed.
        pub fn update_row(model: &#entity) -> #rt::Row {
            let mut row = Self::to_row(model);
            #(row.remove(#update_excluded);)*
            row
        }
    }
}

fn emit_primary_key(model: &ModelDescriptor, rt: &Path) -> TokenStream {
    let entity = &model.name;
    let pk_ident = &model.primary_key().ident;
    quote! {
        /// Value of the primary-key field.
        pub fn primary_key(model: &#entity) -> #rt::Value {
            #rt::encode(&model.#pk_ident)
        }
    }
}

fn emit_field_accessor(model: &ModelDescriptor, rt: &Path) -> TokenStream {
    let entity = &model.name;
    let mut arms: Vec<TokenStream> = Vec::new();
    for field in &model.fields {
        let name = lit(&field.name);
        let ident = &field.ident;
        arms.push(quote! {
            #name => ::std::option::Option::Some(#rt::encode(&model.#ident)),
        });
    }
    for relation in &model.relations {
        let name = lit(&relation.field);
        let ident = &relation.ident;
        arms.push(quote! {
            #name => ::std::option::Option::Some(#rt::encode(&model.#ident)),
        });
    }

    quote! {
        /// Read a field by name. Unrecognized names read as `None`.
        pub fn field(model: &#entity, name: &str) -> ::std::option::Option<#rt::Value> {
            match name {
                #(#arms)*
                _ => ::std::option::Option::None,
            }
        }
    }
}

fn emit_field_mutator(model: &ModelDescriptor, rt: &Path, entity_lit: &syn::LitStr) -> TokenStream {
    let entity = &model.name;

    if model.relations.is_empty() {
        return quote! {
            /// Write a field by name. Plain fields are immutable after
            /// construction, and this model has no relationship fields, so
            /// every write is rejected.
            pub fn set_field(
                model: &mut #entity,
                name: &str,
                value: #rt::Value,
            ) -> ::std::result::Result<(), #rt::DaoError> {
                let _ = (model, value);
                ::std::result::Result::Err(#rt::DaoError::UnsupportedFieldWrite {
                    entity: #entity_lit,
                    field: name.to_string(),
                })
            }
        };
    }

    let arms: Vec<TokenStream> = model
        .relations
        .iter()
        .map(|relation| {
            let name = lit(&relation.field);
            let ident = &relation.ident;
            quote! {
                #name => {
                    model.#ident = #rt::decode_value(value, #entity_lit, #name)?;
                    ::std::result::Result::Ok(())
                }
            }
        })
        .collect();

    quote! {
        /// Write a field by name. Only relationship fields accept writes;
        /// plain fields are immutable after construction.
        pub fn set_field(
            model: &mut #entity,
            name: &str,
            value: #rt::Value,
        ) -> ::std::result::Result<(), #rt::DaoError> {
            match name {
                #(#arms)*
                other => ::std::result::Result::Err(#rt::DaoError::UnsupportedFieldWrite {
                    entity: #entity_lit,
                    field: other.to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn model(code: &str) -> ModelDescriptor {
        let input: syn::DeriveInput = syn::parse_str(code).expect("declaration parses");
        ModelDescriptor::from_derive_input(&input).expect("model parses")
    }

    fn rendered(code: &str) -> String {
        let model = model(code);
        let rt: Path = parse_quote!(::daogen::rt);
        let tokens = emit_dao(&model, &rt);
        let file: syn::File = syn::parse2(tokens).expect("generated tokens parse");
        prettyplease::unparse(&file)
    }

    const USER: &str = r#"
        struct User {
            #[dao(primary_key)]
            id: i64,
            name: String,
            #[dao(has_many(foreign_key = "user_id"))]
            posts: Vec<Post>,
        }
    "#;

    #[test]
    fn empty_relation_mapping_emits_passthrough_constructor() {
        let source = rendered("struct Plain { #[dao(primary_key)] id: i64 }");
        assert!(source.contains("relations: ::std::vec::Vec::new()"));
        assert!(!source.contains("relations.push"));
    }

    #[test]
    fn constructor_registers_relations_in_declaration_order() {
        let source = rendered(
            r#"
            struct User {
                #[dao(primary_key)]
                id: i64,
                #[dao(has_many(foreign_key = "user_id"))]
                posts: Vec<Post>,
                #[dao(many_to_many(foreign_key = "user_id", related_key = "role_id", pivot_table = "user_roles"))]
                roles: Vec<Role>,
            }
            "#,
        );
        let posts = source.find("field: \"posts\"").expect("posts registered");
        let roles = source.find("field: \"roles\"").expect("roles registered");
        assert!(posts < roles);
        assert!(source.contains("RelationKind::HasMany"));
        assert!(source.contains("RelationKind::ManyToMany"));
        assert!(source.contains("pivot_table: ::std::option::Option::Some(\"user_roles\")"));
        assert!(source.contains("related_key: ::std::option::Option::Some(\"role_id\")"));
    }

    #[test]
    fn fallback_deserializer_reads_only_plain_fields() {
        let source = rendered(USER);
        assert!(source.contains("id: ::daogen::rt::decode(row, \"User\", \"id\")?"));
        assert!(source.contains("name: ::daogen::rt::decode(row, \"User\", \"name\")?"));
        assert!(source.contains("posts: ::std::default::Default::default()"));
        assert!(!source.contains("decode(row, \"User\", \"posts\")"));
    }

    #[test]
    fn custom_from_row_is_pure_delegation() {
        let source = rendered(
            "#[dao(from_row)] struct Custom { #[dao(primary_key)] id: i64, name: String }",
        );
        assert!(source.contains("Custom::from_row(row)"));
        assert!(!source.contains("decode(row"));
    }

    #[test]
    fn custom_to_row_is_pure_delegation() {
        let source = rendered(
            "#[dao(to_row)] struct Custom { #[dao(primary_key)] id: i64, name: String }",
        );
        assert!(source.contains("model.to_row()"));
        assert!(!source.contains("strip_nulls"));
    }

    #[test]
    fn fallback_serializer_strips_nulls() {
        let source = rendered(USER);
        assert!(source.contains("::daogen::rt::strip_nulls(&mut row);"));
    }

    #[test]
    fn write_rows_exclude_flagged_columns() {
        let source = rendered(
            r#"
            struct Account {
                #[dao(primary_key)]
                id: i64,
                #[dao(computed)]
                balance: i64,
                #[dao(exclude_update)]
                created_by: String,
                name: String,
            }
            "#,
        );
        let insert_fn = source.split("pub fn insert_row").nth(1).expect("insert_row present");
        let insert_body = insert_fn.split("pub fn").next().expect("body");
        assert!(insert_body.contains("row.remove(\"id\")"));
        assert!(insert_body.contains("row.remove(\"balance\")"));
        assert!(!insert_body.contains("row.remove(\"created_by\")"));
        let update_fn = source.split("pub fn update_row").nth(1).expect("update_row present");
        let update_body = update_fn.split("pub fn").next().expect("body");
        assert!(update_body.contains("row.remove(\"id\")"));
        assert!(update_body.contains("row.remove(\"balance\")"));
        assert!(update_body.contains("row.remove(\"created_by\")"));
    }

    #[test]
    fn mutator_rejects_plain_fields_and_accepts_relations() {
        let source = rendered(USER);
        assert!(source.contains("\"posts\" => {"));
        assert!(source.contains("UnsupportedFieldWrite"));
        assert!(!source.contains("\"name\" => {"));
    }

    #[test]
    fn table_name_and_primary_key_are_bound() {
        let source = rendered(USER);
        assert!(source.contains("table: \"users\""));
        assert!(source.contains("::daogen::rt::encode(&model.id)"));
    }

    #[test]
    fn raw_identifier_relation_fields_emit() {
        let source = rendered(
            r#"
            struct Audit {
                #[dao(primary_key)]
                id: i64,
                #[dao(has_many(foreign_key = "audit_id"))]
                r#type: Vec<Kind>,
            }
            "#,
        );
        assert!(source.contains("model.r#type"));
        assert!(source.contains("r#type: ::std::default::Default::default()"));
    }

    #[test]
    fn repeated_emission_is_byte_identical() {
        assert_eq!(rendered(USER), rendered(USER));
    }
}

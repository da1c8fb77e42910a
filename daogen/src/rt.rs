//! Support types referenced by generated data-access code.
//!
//! The generated DAO types carry no behavior of their own beyond field
//! mapping; everything they need at runtime lives here. The data-access
//! base class that executes queries is an external collaborator and is
//! deliberately absent.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// A structured record keyed by column name.
pub type Row = serde_json::Map<String, Value>;

pub use serde_json::Value;

/// Relationship kind tag carried by a [`RelationRecord`].
///
/// These are the tags the generated constructor registers, mapped 1:1 from
/// the analyzed relation kinds (OneToMany becomes HasMany, ManyToOne becomes
/// BelongsTo, and so on).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    HasMany,
    BelongsTo,
    HasOne,
    ManyToMany,
}

/// One relationship registration, in field-declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationRecord {
    pub kind: RelationKind,
    /// Name of the field the relationship was declared on.
    pub field: &'static str,
    /// Related entity type name.
    pub related: &'static str,
    pub foreign_key: &'static str,
    /// Junction table; populated for ManyToMany only.
    pub pivot_table: Option<&'static str>,
    /// Key on the related side of the junction; ManyToMany only.
    pub related_key: Option<&'static str>,
    pub eager: bool,
    /// Raw filter expression for the data-access runtime. Never evaluated
    /// during generation.
    pub filter: Option<&'static str>,
}

/// Errors surfaced by generated data-access code at runtime.
#[derive(Debug, Error)]
pub enum DaoError {
    /// The field mutator was invoked with an unrecognized or immutable
    /// field name. Plain fields are immutable post-construction; only
    /// relationship fields accept writes.
    #[error("unsupported write to field `{field}` on `{entity}`")]
    UnsupportedFieldWrite { entity: &'static str, field: String },

    /// A column value could not be cast to the declared field type.
    #[error("failed to decode column `{column}` of `{entity}`: {source}")]
    Decode {
        entity: &'static str,
        column: &'static str,
        source: serde_json::Error,
    },
}

/// A typed key/column pair used to build compile-time-checked query filters.
///
/// The generated companion `{Entity}Keys` type hands these out, one per
/// plain field, each bound to the field's declared type and column name.
pub struct QueryKey<T> {
    column: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> QueryKey<T> {
    pub const fn new(column: &'static str) -> Self {
        Self {
            column,
            _marker: PhantomData,
        }
    }

    pub const fn column(&self) -> &'static str {
        self.column
    }
}

// Manual impls to avoid a spurious `T: Clone`/`T: Debug` bound from derive.
impl<T> Clone for QueryKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for QueryKey<T> {}

impl<T> std::fmt::Debug for QueryKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryKey").field("column", &self.column).finish()
    }
}

/// Serialize a field value into a row cell. Values that fail to serialize
/// degrade to null and are dropped by [`strip_nulls`].
pub fn encode<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Read a column by name and cast it to the declared field type. A missing
/// column reads as null, so `Option<T>` fields decode cleanly while
/// non-nullable fields report a [`DaoError::Decode`].
pub fn decode<T: DeserializeOwned>(row: &Row, entity: &'static str, column: &'static str) -> Result<T, DaoError> {
    let value = row.get(column).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|source| DaoError::Decode { entity, column, source })
}

/// Cast an already-extracted value to a field type. Used by the generated
/// field mutator.
pub fn decode_value<T: DeserializeOwned>(value: Value, entity: &'static str, field: &'static str) -> Result<T, DaoError> {
    serde_json::from_value(value).map_err(|source| DaoError::Decode {
        entity,
        column: field,
        source,
    })
}

/// Drop all null-valued entries from a serialized row.
pub fn strip_nulls(row: &mut Row) {
    row.retain(|_, value| !value.is_null());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strip_nulls_drops_only_null_entries() {
        let mut row = Row::new();
        row.insert("a".to_string(), json!(1));
        row.insert("b".to_string(), Value::Null);
        row.insert("c".to_string(), json!("kept"));
        strip_nulls(&mut row);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("a"), Some(&json!(1)));
        assert!(!row.contains_key("b"));
    }

    #[test]
    fn decode_missing_column_is_none_for_nullable() {
        let row = Row::new();
        let value: Option<String> = decode(&row, "User", "nickname").expect("nullable decode");
        assert!(value.is_none());
    }

    #[test]
    fn decode_missing_column_fails_for_required() {
        let row = Row::new();
        let err = decode::<String>(&row, "User", "name").expect_err("required column absent");
        match err {
            DaoError::Decode { entity, column, .. } => {
                assert_eq!(entity, "User");
                assert_eq!(column, "name");
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn query_key_exposes_column() {
        let key: QueryKey<i64> = QueryKey::new("user_id");
        assert_eq!(key.column(), "user_id");
    }
}

use proc_macro2::Span;
use thiserror::Error;

/// Generation-time failures. Each is scoped to the offending model: in a
/// multi-model pass the driver records the failure and keeps going.
#[derive(Debug, Error)]
pub enum GenError {
    /// No field on the model carries the `primary_key` marker.
    #[error("model `{model}` has no field marked #[dao(primary_key)]")]
    MissingPrimaryKey { model: String },

    /// The model supplies no deserialization routine and has no usable
    /// plain constructor (named-field struct) to synthesize one from.
    #[error("model `{model}` supplies no from_row routine and has no usable plain constructor")]
    MissingConstructor { model: String },

    /// Malformed declaration or marker arguments, with the offending span.
    #[error("invalid model declaration: {0}")]
    Invalid(#[from] syn::Error),
}

impl GenError {
    /// Convert into a spanned error for surfacing through a derive macro.
    /// `Invalid` keeps its original span; the model-level conditions attach
    /// to the span of the model's identifier.
    pub fn into_syn_error(self, span: Span) -> syn::Error {
        match self {
            GenError::Invalid(err) => err,
            other => syn::Error::new(span, other.to_string()),
        }
    }
}

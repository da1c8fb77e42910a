//! Pipeline driver: scans source text for annotated models and renders the
//! generated data-access layer.

use std::fs;
use std::io;
use std::path::Path as FsPath;

use proc_macro2::TokenStream;
use syn::{Attribute, DeriveInput, Item, ItemStruct, Meta};

use crate::errors::GenError;
use crate::model::ModelDescriptor;
use crate::synth::{emit_dao, emit_keys};

/// The path generated code uses to reach the runtime support types when no
/// override is configured.
pub fn default_runtime_path() -> syn::Path {
    syn::parse_quote!(::daogen::rt)
}

/// Builder for configuring and running the data-access generator.
pub struct Generator {
    runtime_path: syn::Path,
}

impl Generator {
    /// Create a new generator with default settings.
    pub fn new() -> Self {
        Self {
            runtime_path: default_runtime_path(),
        }
    }

    /// Set the path generated code uses to reach the runtime support types.
    ///
    /// Default: `::daogen::rt`
    pub fn runtime_path(mut self, path: syn::Path) -> Self {
        self.runtime_path = path;
        self
    }

    /// Run the generator over one unit of source text.
    ///
    /// Every annotated model in the text is processed independently: a
    /// malformed model lands in [`GenerationReport::failures`] and the
    /// remaining models still generate. The error return is reserved for
    /// text that does not parse at all.
    pub fn generate_str(&self, source: &str) -> Result<GenerationReport, GenError> {
        let file = syn::parse_file(source)?;

        let mut report = GenerationReport {
            models: Vec::new(),
            failures: Vec::new(),
        };

        for item in &file.items {
            let Item::Struct(item_struct) = item else {
                continue;
            };
            let derives = derive_markers(item_struct);
            if !derives.model && !derives.keys && !has_dao_attr(item_struct) {
                continue;
            }
            let name = item_struct.ident.to_string();
            let input = DeriveInput::from(item_struct.clone());
            let result = ModelDescriptor::from_derive_input(&input).and_then(|mut model| {
                // A `DaoKeys` derive opts into the key companion; without a
                // `DaoModel` derive alongside it, that is all it asks for.
                if derives.keys {
                    model.gen_keys = true;
                    if !derives.model {
                        model.skip_dao = true;
                    }
                }
                self.render_model(&model)
            });
            match result {
                Ok(Some(source)) => report.models.push(GeneratedModel { name, source }),
                Ok(None) => {}
                Err(error) => report.failures.push(ModelFailure { model: name, error }),
            }
        }

        Ok(report)
    }

    /// Run the generator over one source file on disk.
    pub fn generate_path(&self, path: impl AsRef<FsPath>) -> Result<GenerationReport, GenError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|err| {
            syn::Error::new(
                proc_macro2::Span::call_site(),
                format!("failed to read {}: {err}", path.display()),
            )
        })?;
        self.generate_str(&source)
    }

    /// Generate the output for one model declaration. Returns `Ok(None)`
    /// when the model opts out of everything the generator produces.
    pub fn generate_model(&self, input: &DeriveInput) -> Result<Option<String>, GenError> {
        let model = ModelDescriptor::from_derive_input(input)?;
        self.render_model(&model)
    }

    fn render_model(&self, model: &ModelDescriptor) -> Result<Option<String>, GenError> {
        let mut tokens = TokenStream::new();
        if !model.skip_dao {
            tokens.extend(emit_dao(model, &self.runtime_path));
        }
        if model.gen_keys {
            tokens.extend(emit_keys(model, &self.runtime_path));
        }
        if tokens.is_empty() {
            return Ok(None);
        }
        Ok(Some(render(tokens)?))
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a generated token stream as source text. The formatter is
/// deterministic, so identical input tokens render byte-identically.
fn render(tokens: TokenStream) -> Result<String, GenError> {
    let syntax_tree: syn::File = syn::parse2(tokens)?;
    Ok(prettyplease::unparse(&syntax_tree))
}

/// Which of the two derives a struct's derive lists name. The pipeline
/// gives them the same meaning the derive front-end does: `DaoModel`
/// generates the data-access type, `DaoKeys` opts into the key companion.
#[derive(Debug, Clone, Copy, Default)]
struct DeriveMarkers {
    model: bool,
    keys: bool,
}

fn derive_markers(item: &ItemStruct) -> DeriveMarkers {
    let mut markers = DeriveMarkers::default();
    for attr in &item.attrs {
        if !attr.path().is_ident("derive") {
            continue;
        }
        let Meta::List(list) = &attr.meta else {
            continue;
        };
        let _ = list.parse_nested_meta(|meta| {
            if meta.path.is_ident("DaoModel") {
                markers.model = true;
            } else if meta.path.is_ident("DaoKeys") {
                markers.keys = true;
            }
            Ok(())
        });
    }
    markers
}

/// Whether a struct carries a `#[dao(...)]` attribute on itself or any of
/// its fields. Such structs opt into generation even without the derives.
fn has_dao_attr(item: &ItemStruct) -> bool {
    if item.attrs.iter().any(is_dao_attr) {
        return true;
    }
    item.fields
        .iter()
        .any(|field| field.attrs.iter().any(is_dao_attr))
}

fn is_dao_attr(attr: &Attribute) -> bool {
    attr.path().is_ident("dao")
}

/// Output of one generator run.
pub struct GenerationReport {
    /// Rendered output per model, in declaration order.
    pub models: Vec<GeneratedModel>,
    /// Models that failed, in declaration order. Each failure is scoped to
    /// its model and never blocks the others.
    pub failures: Vec<ModelFailure>,
}

impl GenerationReport {
    /// The full generated text: a file header followed by each model's
    /// output in declaration order.
    pub fn source(&self) -> String {
        let mut out = String::from("//! Auto-generated module. Do not edit manually.\n\n");
        for model in &self.models {
            out.push_str(&model.source);
            out.push('\n');
        }
        out
    }

    /// Write the generated text to disk. Skips the write when the file
    /// already holds identical content, so downstream builds do not recompile
    /// needlessly. Returns whether a write happened.
    pub fn write(&self, path: impl AsRef<FsPath>) -> io::Result<bool> {
        let path = path.as_ref();
        let code = self.source();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let unchanged = matches!(fs::read_to_string(path), Ok(existing) if existing == code);
        if unchanged {
            return Ok(false);
        }
        fs::write(path, &code)?;
        Ok(true)
    }
}

/// Rendered output for one model.
pub struct GeneratedModel {
    pub name: String,
    pub source: String,
}

/// A generation failure scoped to one model.
pub struct ModelFailure {
    pub model: String,
    pub error: GenError,
}

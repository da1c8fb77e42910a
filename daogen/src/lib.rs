//! Static generator for type-safe data-access layers.
//!
//! Source text is scanned for `#[dao(...)]`-annotated model structs; each
//! model yields a `{Entity}Dao` data-access type and, on request, a
//! `{Entity}Keys` companion of typed query keys. The same pipeline backs
//! the `DaoModel`/`DaoKeys` derives in `daogen-macros`.
//!
//! # Example
//!
//! In a `build.rs` or codegen binary:
//!
//! ```ignore
//! fn main() {
//!     let report = daogen::generate()
//!         .generate_path("src/models.rs")
//!         .expect("failed to parse src/models.rs");
//!     for failure in &report.failures {
//!         eprintln!("daogen: skipped {}: {}", failure.model, failure.error);
//!     }
//!     report
//!         .write("src/generated/daos.rs")
//!         .expect("failed to write generated code");
//!     println!("cargo:rerun-if-changed=src/models.rs");
//! }
//! ```

mod errors;
mod generator;
mod model;
mod synth;

pub mod rt;

pub use errors::GenError;
pub use generator::{
    GeneratedModel, Generator, GenerationReport, ModelFailure, default_runtime_path,
};
pub use model::{FieldDescriptor, ModelDescriptor, RelationDescriptor, RelationKind};
pub use synth::{emit_dao, emit_keys};

/// Create a new generator with default settings.
pub fn generate() -> Generator {
    Generator::new()
}

//! Mark command - apply preserve-unknown-fields paths to a single schema document

use std::path::Path;

use crdkit_core::schema::decode_document;
use crdkit_core::{FieldPath, SchemaSubject, load_schema_document, mark_preserve_unknown_fields};

use crate::display::ProgressReporter;
use crate::error::{CliError, Result};

pub fn run(schema_path: &Path, paths: &[FieldPath]) -> Result<()> {
    let progress = ProgressReporter::new();
    let document = load_schema_document(schema_path)?;
    let source = schema_path.display().to_string();
    let mut schema = decode_document(&document, &source, SchemaSubject::Document)?;

    for path in paths {
        if !mark_preserve_unknown_fields(&mut schema, path) {
            progress.warn(&format!("path '{}' matched no schema node", path));
        }
    }

    let output = serde_yaml::to_string(&schema).map_err(|e| CliError::Other {
        message: e.to_string(),
    })?;
    print!("{}", output);
    Ok(())
}

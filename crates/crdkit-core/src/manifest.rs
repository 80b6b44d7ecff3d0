//! CRD manifest loading and rendering
//!
//! Rendered CRDs carry an empty status block and a null creation timestamp,
//! byte for byte the way `kubectl` and the Go API machinery print them, so
//! generated manifests diff cleanly against existing ones.

use std::path::Path;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{CrdError, Result, read_file};

/// Empty status block appended to every rendered CRD
pub const STATUS_OUTPUT: &str = r#"status:
  acceptedNames:
    kind: ""
    plural: ""
  conditions: null
  storedVersions: null
"#;

/// Null creation timestamp under `metadata`
pub const CREATION_TIMESTAMP_OUTPUT: &str = "\n  creationTimestamp: null";

const CRD_KIND: &str = "CustomResourceDefinition";

/// Rendering options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Drop the empty status block and the null creation timestamp
    pub strip_generated: bool,
}

/// Parse a CRD manifest (YAML or JSON)
pub fn parse_crd(content: &str) -> Result<CustomResourceDefinition> {
    let value: Value = serde_yaml::from_str(content)
        .map_err(|e| CrdError::InvalidManifest(format!("invalid CRD YAML: {}", e)))?;

    crd_from_value(value)
}

// apiVersion and kind may be left out of a skeleton, the type supplies both
fn crd_from_value(value: Value) -> Result<CustomResourceDefinition> {
    match value.get("kind") {
        None => {}
        Some(Value::String(kind)) if kind == CRD_KIND => {}
        Some(other) => {
            let kind = other.as_str().map_or_else(|| other.to_string(), str::to_string);
            return Err(CrdError::InvalidManifest(format!(
                "expected {}, got {}",
                CRD_KIND, kind
            )));
        }
    }

    serde_json::from_value(value).map_err(|e| CrdError::InvalidManifest(e.to_string()))
}

/// Parse every CRD of a multi-document YAML stream, skipping empty documents
pub fn parse_crds(content: &str) -> Result<Vec<CustomResourceDefinition>> {
    let mut crds = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document)
            .map_err(|e| CrdError::InvalidManifest(format!("invalid CRD YAML: {}", e)))?;
        if value.is_null() {
            continue;
        }
        crds.push(crd_from_value(value)?);
    }
    Ok(crds)
}

/// Load a CRD manifest from disk
pub fn load_crd(path: &Path) -> Result<CustomResourceDefinition> {
    let content = read_file(path)?;
    parse_crd(&content).map_err(|e| with_path(e, path))
}

/// Load every CRD of a (possibly multi-document) manifest file
pub fn load_crds(path: &Path) -> Result<Vec<CustomResourceDefinition>> {
    let content = read_file(path)?;
    parse_crds(&content).map_err(|e| with_path(e, path))
}

fn with_path(error: CrdError, path: &Path) -> CrdError {
    match error {
        CrdError::InvalidManifest(msg) => {
            CrdError::InvalidManifest(format!("{}: {}", path.display(), msg))
        }
        other => other,
    }
}

/// Load a schema document, as JSON for `.json` files and as YAML otherwise
pub fn load_schema_document(path: &Path) -> Result<Value> {
    let content = read_file(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let parsed = if is_json {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    };

    parsed.map_err(|msg| {
        CrdError::InvalidManifest(format!("invalid schema document {}: {}", path.display(), msg))
    })
}

/// Render a CRD as a YAML document
pub fn render_crd(crd: &CustomResourceDefinition, options: RenderOptions) -> Result<String> {
    let mut value = serde_json::to_value(crd)?;

    if let Some(object) = value.as_object_mut() {
        // the status block is written verbatim below
        object.remove("status");

        if !options.strip_generated {
            if let Some(metadata) = object.get_mut("metadata").and_then(Value::as_object_mut) {
                metadata
                    .entry("creationTimestamp")
                    .or_insert(Value::Null);
            }
        }
    }

    let mut output = serde_yaml::to_string(&value)?;
    if !options.strip_generated {
        output.push_str(STATUS_OUTPUT);
    }
    Ok(output)
}

/// Render several CRDs as a multi-document YAML stream
pub fn render_all(crds: &[CustomResourceDefinition], options: RenderOptions) -> Result<String> {
    let documents = crds
        .iter()
        .map(|crd| render_crd(crd, options))
        .collect::<Result<Vec<_>>>()?;
    Ok(documents.join("---\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SKELETON: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: gadgets.example.com
spec:
  group: example.com
  scope: Cluster
  names:
    kind: Gadget
    plural: gadgets
  versions:
    - name: v1
      served: true
      storage: true
"#;

    #[test]
    fn test_parse_crd() {
        let crd = parse_crd(SKELETON).unwrap();
        assert_eq!(crd.metadata.name.as_deref(), Some("gadgets.example.com"));
        assert_eq!(crd.spec.group, "example.com");
        assert_eq!(crd.spec.versions.len(), 1);
        assert!(crd.spec.versions[0].subresources.is_none());
    }

    #[test]
    fn test_parse_rejects_other_kinds() {
        let yaml = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: test
"#;
        let err = parse_crd(yaml).unwrap_err();
        assert!(err.to_string().contains("expected CustomResourceDefinition, got ConfigMap"));
    }

    #[test]
    fn test_parse_accepts_skeleton_without_type_fields() {
        let skeleton = SKELETON
            .replace("apiVersion: apiextensions.k8s.io/v1\n", "")
            .replace("kind: CustomResourceDefinition\n", "");
        let crd = parse_crd(&skeleton).unwrap();
        assert_eq!(crd.metadata.name.as_deref(), Some("gadgets.example.com"));

        let output = render_crd(&crd, RenderOptions::default()).unwrap();
        assert!(output.starts_with("apiVersion: apiextensions.k8s.io/v1\n"));
        assert!(output.contains("kind: CustomResourceDefinition\n"));
    }

    #[test]
    fn test_load_crd_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.yaml");

        let err = load_crd(&path).unwrap_err();
        assert!(matches!(err, CrdError::ReadFile { .. }));
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    fn test_parse_multi_document_stream() {
        let stream = format!("---\n{}\n---\n{}", SKELETON, SKELETON.replace("gadgets", "gizmos"));
        let crds = parse_crds(&stream).unwrap();
        assert_eq!(crds.len(), 2);
        assert_eq!(crds[1].metadata.name.as_deref(), Some("gizmos.example.com"));
    }

    #[test]
    fn test_parse_stream_reads_rendered_output() {
        let crd = parse_crd(SKELETON).unwrap();
        let output = render_all(&[crd.clone(), crd], RenderOptions::default()).unwrap();
        assert_eq!(parse_crds(&output).unwrap().len(), 2);
    }

    #[test]
    fn test_render_reproduces_generated_fields() {
        let crd = parse_crd(SKELETON).unwrap();
        let output = render_crd(&crd, RenderOptions::default()).unwrap();

        assert!(output.starts_with("apiVersion: apiextensions.k8s.io/v1\n"));
        assert!(output.contains("kind: CustomResourceDefinition\n"));
        assert!(output.contains(CREATION_TIMESTAMP_OUTPUT));
        assert!(output.ends_with(STATUS_OUTPUT));
        assert_eq!(output.matches("status:").count(), 1);
    }

    #[test]
    fn test_render_strip_generated() {
        let crd = parse_crd(SKELETON).unwrap();
        let output = render_crd(
            &crd,
            RenderOptions {
                strip_generated: true,
            },
        )
        .unwrap();

        assert!(!output.contains("creationTimestamp"));
        assert!(!output.contains("status:"));
        let reparsed = parse_crd(&output).unwrap();
        assert_eq!(reparsed, crd);
    }

    #[test]
    fn test_render_all_separates_documents() {
        let crd = parse_crd(SKELETON).unwrap();
        let output = render_all(&[crd.clone(), crd], RenderOptions::default()).unwrap();

        assert_eq!(output.matches("---\n").count(), 1);
        assert_eq!(output.matches(STATUS_OUTPUT).count(), 2);
    }

    #[test]
    fn test_load_schema_documents() {
        let dir = TempDir::new().unwrap();
        let json_path = dir.path().join("spec.json");
        let yaml_path = dir.path().join("spec.yaml");
        fs::write(&json_path, r#"{"type": "object"}"#).unwrap();
        fs::write(&yaml_path, "type: object\nproperties:\n  a:\n    type: string\n").unwrap();

        let json = load_schema_document(&json_path).unwrap();
        assert_eq!(json["type"], "object");

        let yaml = load_schema_document(&yaml_path).unwrap();
        assert_eq!(yaml["properties"]["a"]["type"], "string");
    }

    #[test]
    fn test_load_schema_document_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_schema_document(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}

//! CRD completion
//!
//! Fills in the validation schema of every version of a CRD skeleton:
//!
//! ```text
//! openAPIV3Schema:
//!   type: object
//!   properties:
//!     spec:   <schema document of the version, with marked paths>
//!     status: <status schema, only if the status subresource is enabled>
//! ```
//!
//! Each composed schema must be structural. Any failure aborts the whole
//! completion: a CRD is either fully completed or rejected.

use std::collections::BTreeMap;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    CustomResourceDefinition, CustomResourceDefinitionStatus, CustomResourceValidation,
};
use serde::Serialize;

use crate::error::{CrdError, Result, SchemaSubject};
use crate::schema::{self, JSONSchemaProps};
use crate::structural::validate_structural;
use crate::visitor::{FieldPath, mark_preserve_unknown_fields};

/// Where the status schema of a version came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    /// The shared status schema document
    Supplied,
    /// No status schema was supplied, any shape is accepted
    Placeholder,
}

/// Outcome of completing a single version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReport {
    pub name: String,
    /// Preserve-unknown-fields paths that marked a node
    pub marked_paths: Vec<FieldPath>,
    /// Preserve-unknown-fields paths that matched nothing
    pub unmatched_paths: Vec<FieldPath>,
    /// `None` when the status subresource is disabled
    pub status: Option<StatusSource>,
}

/// Outcome of completing a CRD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub crd: String,
    pub versions: Vec<VersionReport>,
}

/// Completes CRD skeletons from per-version schema documents
///
/// Schema documents can be any `Serialize` value; they are round-tripped
/// through JSON into `JSONSchemaProps`.
///
/// # Example
///
/// ```ignore
/// let completer = CrdCompleter::new()
///     .with_version_schema("v1", spec_schema)
///     .with_status_schema(status_schema)
///     .with_preserve_unknown_fields("v1", ["config", "rules.[].extra"]);
///
/// let report = completer.complete(&mut crd)?;
/// ```
#[derive(Debug, Clone)]
pub struct CrdCompleter<S = serde_json::Value> {
    version_schemas: BTreeMap<String, S>,
    status_schema: Option<S>,
    preserve_unknown_fields: BTreeMap<String, Vec<FieldPath>>,
}

impl<S> Default for CrdCompleter<S> {
    fn default() -> Self {
        Self {
            version_schemas: BTreeMap::new(),
            status_schema: None,
            preserve_unknown_fields: BTreeMap::new(),
        }
    }
}

impl<S: Serialize> CrdCompleter<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `spec` schema document of a version
    pub fn with_version_schema(mut self, version: impl Into<String>, schema: S) -> Self {
        self.version_schemas.insert(version.into(), schema);
        self
    }

    /// Set the status schema shared by every version with a status subresource
    pub fn with_status_schema(mut self, schema: S) -> Self {
        self.status_schema = Some(schema);
        self
    }

    /// Add paths of a version's `spec` schema to mark as preserving unknown fields
    pub fn with_preserve_unknown_fields<I, P>(mut self, version: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<FieldPath>,
    {
        self.preserve_unknown_fields
            .entry(version.into())
            .or_default()
            .extend(paths.into_iter().map(Into::into));
        self
    }

    /// Complete `crd` in place
    ///
    /// Versions are processed in order and the first failure is returned;
    /// the failing version and every later one are left untouched. On
    /// success the status block is reset to an empty value, the API server
    /// fills it at runtime.
    pub fn complete(&self, crd: &mut CustomResourceDefinition) -> Result<CompletionReport> {
        let crd_name = crd.metadata.name.clone().unwrap_or_default();
        let mut versions = Vec::with_capacity(crd.spec.versions.len());

        for version in crd.spec.versions.iter_mut() {
            let document = self.version_schemas.get(&version.name).ok_or_else(|| {
                CrdError::MissingSchema {
                    crd: crd_name.clone(),
                    version: version.name.clone(),
                }
            })?;

            let mut spec = schema::decode_document(
                document,
                &crd_name,
                SchemaSubject::Spec(version.name.clone()),
            )?;

            let mut report = VersionReport {
                name: version.name.clone(),
                marked_paths: Vec::new(),
                unmatched_paths: Vec::new(),
                status: None,
            };

            for path in self
                .preserve_unknown_fields
                .get(&version.name)
                .into_iter()
                .flatten()
            {
                if mark_preserve_unknown_fields(&mut spec, path) {
                    report.marked_paths.push(path.clone());
                } else {
                    tracing::debug!(
                        crd = %crd_name,
                        version = %version.name,
                        path = %path,
                        "preserve-unknown-fields path matched nothing"
                    );
                    report.unmatched_paths.push(path.clone());
                }
            }

            let mut properties = BTreeMap::new();
            properties.insert("spec".to_string(), spec);

            if version.subresources.is_some() {
                let (status, source) = self.resolve_status(&crd_name)?;
                properties.insert("status".to_string(), status);
                report.status = Some(source);
            }

            let root = schema::object(properties);

            tracing::info!(
                crd = %crd_name,
                version = %version.name,
                "checking if the schema is structural"
            );
            validate_structural(&root).map_err(|errors| CrdError::NonStructural {
                crd: crd_name.clone(),
                version: version.name.clone(),
                errors,
            })?;

            version.schema = Some(CustomResourceValidation {
                open_api_v3_schema: Some(root),
            });
            versions.push(report);
        }

        // apiVersion and kind are fixed by the type and emitted on serialization
        crd.status = Some(CustomResourceDefinitionStatus::default());

        Ok(CompletionReport {
            crd: crd_name,
            versions,
        })
    }

    fn resolve_status(&self, crd_name: &str) -> Result<(JSONSchemaProps, StatusSource)> {
        match &self.status_schema {
            Some(document) => {
                let status = schema::decode_document(document, crd_name, SchemaSubject::Status)?;
                Ok((status, StatusSource::Supplied))
            }
            None => Ok((schema::preserve_unknown_object(), StatusSource::Placeholder)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaExt;
    use serde_json::{Value, json};

    const SKELETON: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: widgets.example.com
spec:
  group: example.com
  scope: Namespaced
  names:
    kind: Widget
    plural: widgets
  versions:
    - name: v1
      served: true
      storage: true
      subresources:
        status: {}
    - name: v1beta1
      served: true
      storage: false
status:
  acceptedNames:
    kind: Widget
    plural: widgets
  storedVersions:
    - v1
"#;

    fn skeleton() -> CustomResourceDefinition {
        serde_yaml::from_str(SKELETON).unwrap()
    }

    fn widget_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "replicas": { "type": "integer" },
                "config": { "type": "object" },
                "rules": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "extra": { "type": "object" }
                        }
                    }
                }
            }
        })
    }

    fn openapi(crd: &CustomResourceDefinition, index: usize) -> &JSONSchemaProps {
        crd.spec.versions[index]
            .schema
            .as_ref()
            .and_then(|s| s.open_api_v3_schema.as_ref())
            .unwrap()
    }

    #[test]
    fn test_complete_every_version() {
        let mut crd = skeleton();
        let report = CrdCompleter::new()
            .with_version_schema("v1", widget_schema())
            .with_version_schema("v1beta1", widget_schema())
            .complete(&mut crd)
            .unwrap();

        assert_eq!(report.crd, "widgets.example.com");
        assert_eq!(report.versions.len(), 2);
        assert_eq!(crd.spec.versions.len(), 2);

        let v1 = openapi(&crd, 0);
        assert_eq!(v1.schema_type(), Some("object"));
        assert!(v1.property("spec").is_some());
        assert!(v1.property("status").is_some());

        let v1beta1 = openapi(&crd, 1);
        assert!(v1beta1.property("spec").is_some());
        assert!(v1beta1.property("status").is_none());
        assert_eq!(report.versions[1].status, None);
    }

    #[test]
    fn test_status_placeholder_accepts_anything() {
        let mut crd = skeleton();
        let report = CrdCompleter::new()
            .with_version_schema("v1", widget_schema())
            .with_version_schema("v1beta1", widget_schema())
            .complete(&mut crd)
            .unwrap();

        let status = openapi(&crd, 0).property("status").unwrap();
        assert_eq!(status, &schema::preserve_unknown_object());
        assert_eq!(report.versions[0].status, Some(StatusSource::Placeholder));
    }

    #[test]
    fn test_supplied_status_schema() {
        let mut crd = skeleton();
        CrdCompleter::new()
            .with_version_schema("v1", widget_schema())
            .with_version_schema("v1beta1", widget_schema())
            .with_status_schema(json!({
                "type": "object",
                "properties": { "ready": { "type": "boolean" } }
            }))
            .complete(&mut crd)
            .unwrap();

        let status = openapi(&crd, 0).property("status").unwrap();
        assert_eq!(
            status.property("ready").and_then(|s| s.schema_type()),
            Some("boolean")
        );
        assert!(!status.preserves_unknown_fields());
    }

    #[test]
    fn test_preserve_unknown_fields_per_version() {
        let mut crd = skeleton();
        let report = CrdCompleter::new()
            .with_version_schema("v1", widget_schema())
            .with_version_schema("v1beta1", widget_schema())
            .with_preserve_unknown_fields("v1", ["config", "rules.[].extra", "rules.extra"])
            .complete(&mut crd)
            .unwrap();

        let v1 = openapi(&crd, 0);
        assert!(v1.get_nested("spec.config").unwrap().preserves_unknown_fields());
        assert!(v1.get_nested("spec.rules.[].extra").unwrap().preserves_unknown_fields());
        assert!(!v1.get_nested("spec.rules").unwrap().preserves_unknown_fields());

        let v1beta1 = openapi(&crd, 1);
        assert!(!v1beta1.get_nested("spec.config").unwrap().preserves_unknown_fields());

        assert_eq!(report.versions[0].marked_paths.len(), 2);
        assert_eq!(report.versions[0].unmatched_paths, vec![FieldPath::parse("rules.extra")]);
    }

    #[test]
    fn test_status_block_is_reset() {
        let mut crd = skeleton();
        assert_ne!(crd.status, Some(CustomResourceDefinitionStatus::default()));

        CrdCompleter::new()
            .with_version_schema("v1", widget_schema())
            .with_version_schema("v1beta1", widget_schema())
            .complete(&mut crd)
            .unwrap();

        assert_eq!(crd.status, Some(CustomResourceDefinitionStatus::default()));
    }

    #[test]
    fn test_missing_version_schema_aborts() {
        let mut crd = skeleton();
        let err = CrdCompleter::new()
            .with_version_schema("v1", widget_schema())
            .complete(&mut crd)
            .unwrap_err();

        assert!(matches!(
            err,
            CrdError::MissingSchema { ref crd, ref version }
                if crd == "widgets.example.com" && version == "v1beta1"
        ));
    }

    #[test]
    fn test_undecodable_schema_aborts() {
        let mut crd = skeleton();
        let err = CrdCompleter::new()
            .with_version_schema("v1", json!({ "type": 42 }))
            .with_version_schema("v1beta1", widget_schema())
            .complete(&mut crd)
            .unwrap_err();

        assert!(matches!(err, CrdError::SchemaDecode { .. }));
        assert!(crd.spec.versions[0].schema.is_none());
    }

    #[test]
    fn test_int_or_string_fields_complete() {
        let spec = json!({
            "type": "object",
            "properties": {
                "port": {
                    "x-kubernetes-int-or-string": true,
                    "anyOf": [{ "type": "integer" }, { "type": "string" }]
                },
                "backend": {
                    "type": "object",
                    "properties": {
                        "targetPort": {
                            "x-kubernetes-int-or-string": true,
                            "anyOf": [{ "type": "integer" }, { "type": "string" }]
                        }
                    }
                }
            }
        });

        let mut crd = skeleton();
        let report = CrdCompleter::new()
            .with_version_schema("v1", spec.clone())
            .with_version_schema("v1beta1", spec)
            .with_preserve_unknown_fields("v1", ["backend"])
            .complete(&mut crd)
            .unwrap();

        assert_eq!(report.versions[0].marked_paths, vec![FieldPath::parse("backend")]);
        let v1 = openapi(&crd, 0);
        assert!(v1.get_nested("spec.backend").unwrap().preserves_unknown_fields());
        let port = v1.get_nested("spec.port").unwrap();
        assert_eq!(port.x_kubernetes_int_or_string, Some(true));
        assert_eq!(port.any_of.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_undecodable_status_schema_aborts() {
        let mut crd = skeleton();
        let err = CrdCompleter::new()
            .with_version_schema("v1", widget_schema())
            .with_version_schema("v1beta1", widget_schema())
            .with_status_schema(json!({ "properties": "nope" }))
            .complete(&mut crd)
            .unwrap_err();

        assert!(matches!(
            err,
            CrdError::SchemaDecode { subject: SchemaSubject::Status, .. }
        ));
    }

    #[test]
    fn test_non_structural_version_stops_processing() {
        let mut crd = skeleton();
        let err = CrdCompleter::new()
            .with_version_schema(
                "v1",
                json!({
                    "type": "object",
                    "properties": { "mode": { "enum": ["a", "b"] } }
                }),
            )
            .with_version_schema("v1beta1", widget_schema())
            .complete(&mut crd)
            .unwrap_err();

        let CrdError::NonStructural { version, errors, .. } = err else {
            panic!("expected a non-structural error");
        };
        assert_eq!(version, "v1");
        assert_eq!(
            errors.to_string(),
            "properties[spec].properties[mode].type: Required value: must not be empty for specified object fields"
        );
        assert!(crd.spec.versions[0].schema.is_none());
        assert!(crd.spec.versions[1].schema.is_none());
    }
}

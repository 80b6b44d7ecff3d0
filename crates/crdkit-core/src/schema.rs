//! OpenAPI v3 schema helpers
//!
//! CRD validation schemas are represented with the `apiextensions.k8s.io/v1`
//! types from `k8s-openapi`. This module adds constructors, navigation helpers
//! and the JSON round-trip used to turn arbitrary schema documents into
//! `JSONSchemaProps`.

use std::collections::BTreeMap;

use serde::Serialize;

pub use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    JSONSchemaProps, JSONSchemaPropsOrArray, JSONSchemaPropsOrBool,
};

use crate::error::{CrdError, Result, SchemaSubject};

/// Path segment that selects the item schema of an array
pub const ITEMS_SEGMENT: &str = "[]";

/// Property type in OpenAPI schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl PropertyType {
    /// Every type a structural schema may declare
    pub const ALL: [PropertyType; 6] = [
        Self::Array,
        Self::Boolean,
        Self::Integer,
        Self::Number,
        Self::Object,
        Self::String,
    ];

    /// Parse from string representation
    ///
    /// Unlike JSON Schema, the Kubernetes API is case sensitive here.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Create a schema node of the given type
pub fn typed(type_: PropertyType) -> JSONSchemaProps {
    JSONSchemaProps {
        type_: Some(type_.as_str().to_string()),
        ..Default::default()
    }
}

/// Create a simple string property
pub fn string() -> JSONSchemaProps {
    typed(PropertyType::String)
}

/// Create a simple integer property
pub fn integer() -> JSONSchemaProps {
    typed(PropertyType::Integer)
}

/// Create an object property with nested properties
pub fn object(properties: BTreeMap<String, JSONSchemaProps>) -> JSONSchemaProps {
    JSONSchemaProps {
        type_: Some(PropertyType::Object.as_str().to_string()),
        properties: Some(properties),
        ..Default::default()
    }
}

/// Create an array property with item schema
pub fn array(items: JSONSchemaProps) -> JSONSchemaProps {
    JSONSchemaProps {
        type_: Some(PropertyType::Array.as_str().to_string()),
        items: Some(JSONSchemaPropsOrArray::Schema(Box::new(items))),
        ..Default::default()
    }
}

/// An object that accepts any shape
///
/// Used as the status schema when a version enables the status subresource
/// but no status schema was supplied.
pub fn preserve_unknown_object() -> JSONSchemaProps {
    JSONSchemaProps {
        type_: Some(PropertyType::Object.as_str().to_string()),
        x_kubernetes_preserve_unknown_fields: Some(true),
        ..Default::default()
    }
}

/// Navigation helpers on top of `JSONSchemaProps`
pub trait SchemaExt {
    /// Declared type, if any
    fn schema_type(&self) -> Option<&str>;

    /// Get a direct property by name
    fn property(&self, name: &str) -> Option<&JSONSchemaProps>;

    /// Get the single item schema of an array
    fn item_schema(&self) -> Option<&JSONSchemaProps>;

    /// Get a nested schema by dot-separated path, `[]` selecting array items
    fn get_nested(&self, path: &str) -> Option<&JSONSchemaProps>;

    /// Whether `x-kubernetes-preserve-unknown-fields` is set to true
    fn preserves_unknown_fields(&self) -> bool;

    /// Check if this node has nested properties
    fn has_nested_properties(&self) -> bool;
}

impl SchemaExt for JSONSchemaProps {
    fn schema_type(&self) -> Option<&str> {
        self.type_.as_deref().filter(|t| !t.is_empty())
    }

    fn property(&self, name: &str) -> Option<&JSONSchemaProps> {
        self.properties.as_ref()?.get(name)
    }

    fn item_schema(&self) -> Option<&JSONSchemaProps> {
        match self.items.as_ref()? {
            JSONSchemaPropsOrArray::Schema(items) => Some(items.as_ref()),
            JSONSchemaPropsOrArray::Schemas(_) => None,
        }
    }

    fn get_nested(&self, path: &str) -> Option<&JSONSchemaProps> {
        let mut current = self;
        for part in path.split('.') {
            current = if part == ITEMS_SEGMENT {
                current.item_schema()?
            } else {
                current.property(part)?
            };
        }
        Some(current)
    }

    fn preserves_unknown_fields(&self) -> bool {
        self.x_kubernetes_preserve_unknown_fields == Some(true)
    }

    fn has_nested_properties(&self) -> bool {
        self.properties.as_ref().is_some_and(|p| !p.is_empty())
    }
}

/// Convert a schema document into `JSONSchemaProps`
///
/// The document is encoded to JSON first and then decoded, so any
/// `Serialize` value works (e.g. `serde_json::Value` read from YAML).
pub fn decode_document<S: Serialize + ?Sized>(
    document: &S,
    crd: &str,
    subject: SchemaSubject,
) -> Result<JSONSchemaProps> {
    let raw = serde_json::to_vec(document).map_err(|source| CrdError::SchemaEncode {
        crd: crd.to_string(),
        subject: subject.clone(),
        source,
    })?;

    serde_json::from_slice(&raw).map_err(|source| CrdError::SchemaDecode {
        crd: crd.to_string(),
        subject,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_property_type_parse() {
        assert_eq!(PropertyType::parse("object"), Some(PropertyType::Object));
        assert_eq!(PropertyType::parse("integer"), Some(PropertyType::Integer));
        assert_eq!(PropertyType::parse("Object"), None);
        assert_eq!(PropertyType::parse("null"), None);
        assert_eq!(PropertyType::Array.to_string(), "array");
    }

    #[test]
    fn test_get_nested_through_arrays() {
        let mut item = BTreeMap::new();
        item.insert("b".to_string(), string());
        let mut root = BTreeMap::new();
        root.insert("a".to_string(), array(object(item)));
        let schema = object(root);

        assert_eq!(schema.get_nested("a.[].b").and_then(|s| s.schema_type()), Some("string"));
        assert!(schema.get_nested("a.b").is_none());
        assert!(schema.get_nested("missing").is_none());
        assert!(schema.has_nested_properties());
    }

    #[test]
    fn test_preserve_unknown_object() {
        let schema = preserve_unknown_object();
        assert_eq!(schema.schema_type(), Some("object"));
        assert!(schema.preserves_unknown_fields());
        assert!(!schema.has_nested_properties());
    }

    #[test]
    fn test_decode_document() {
        let doc = json!({
            "type": "object",
            "properties": {
                "replicas": { "type": "integer", "minimum": 1 },
                "tags": { "type": "array", "items": { "type": "string" } }
            }
        });

        let schema = decode_document(&doc, "widgets.example.com", SchemaSubject::Status).unwrap();
        assert_eq!(schema.property("replicas").unwrap().minimum, Some(1.0));
        assert_eq!(
            schema.get_nested("tags.[]").and_then(|s| s.schema_type()),
            Some("string")
        );
    }

    #[test]
    fn test_decode_document_wrong_shape() {
        let doc = json!({ "type": "object", "properties": ["not", "a", "map"] });

        let err = decode_document(&doc, "widgets.example.com", SchemaSubject::Spec("v1".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            CrdError::SchemaDecode { ref subject, .. } if *subject == SchemaSubject::Spec("v1".into())
        ));
    }
}

//! Field paths and the preserve-unknown-fields marker
//!
//! A field path names a node of a schema tree, e.g. `rules.[].extra`:
//! segments are separated by `.`, a plain segment is a property name and
//! `[]` descends into the item schema of an array.
//!
//! Marking is permissive: a path that does not match the shape of the schema
//! (an array where an object is expected, a missing property, ...) is
//! silently ignored and the schema is left untouched.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{ITEMS_SEGMENT, JSONSchemaProps, JSONSchemaPropsOrArray};

/// A single segment of a [`FieldPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// `[]`, the item schema of an array
    Items,
    /// A key of the property map
    Property(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        if raw == ITEMS_SEGMENT {
            Self::Items
        } else {
            Self::Property(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Items => ITEMS_SEGMENT,
            Self::Property(name) => name,
        }
    }
}

/// Dot-separated path to a schema node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Parse a path such as `spec.rules.[].extra`
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path.split('.').map(Segment::parse).collect(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for FieldPath {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment.as_str())?;
        }
        Ok(())
    }
}

/// Set `x-kubernetes-preserve-unknown-fields: true` on the node `path` points to
///
/// Only the final node is modified. Returns whether a node was marked; a
/// path that diverges from the schema's shape is a no-op and returns false.
pub fn mark_preserve_unknown_fields(schema: &mut JSONSchemaProps, path: &FieldPath) -> bool {
    visit(schema, path.segments())
}

fn visit(schema: &mut JSONSchemaProps, segments: &[Segment]) -> bool {
    match segments {
        [] => false,
        // the last segment always names a property of the current node
        [leaf] => match schema
            .properties
            .as_mut()
            .and_then(|props| props.get_mut(leaf.as_str()))
        {
            Some(child) => {
                child.x_kubernetes_preserve_unknown_fields = Some(true);
                true
            }
            None => false,
        },
        [Segment::Items, rest @ ..] => match schema.items.as_mut() {
            Some(JSONSchemaPropsOrArray::Schema(items)) => visit(items, rest),
            Some(JSONSchemaPropsOrArray::Schemas(tuple)) => tuple
                .iter_mut()
                .fold(false, |marked, items| visit(items, rest) || marked),
            None => false,
        },
        [Segment::Property(name), rest @ ..] => {
            if schema.items.is_some() {
                return false;
            }
            match schema.properties.as_mut().and_then(|props| props.get_mut(name)) {
                Some(child) => visit(child, rest),
                None => false,
            }
        }
    }
}

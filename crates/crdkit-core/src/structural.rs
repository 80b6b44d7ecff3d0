//! Structural schema validation
//!
//! The API server only accepts CRD schemas whose shape is fully determined:
//! every node of the "structural part" (the root, every property, every
//! array item and every `additionalProperties` schema) declares its type,
//! and value validations (`allOf`, `anyOf`, `oneOf`, `not`) only constrain
//! what the structural part already declares. Pruning and defaulting depend
//! on this.
//!
//! Errors are collected rather than returned on the first hit, and rendered
//! the way the API server reports them, e.g.
//! `properties[spec].properties[replicas].type: Required value: must not be
//! empty for specified object fields`.

use std::fmt;

use crate::schema::{
    self, JSONSchemaProps, JSONSchemaPropsOrArray, JSONSchemaPropsOrBool, PropertyType, SchemaExt,
};

/// Location of a schema node, rendered like a Kubernetes field path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaPath(String);

impl SchemaPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Append a named child (`a.b`)
    pub fn child(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}.{}", self.0, name))
        }
    }

    /// Append a map key (`a[key]`)
    pub fn key(&self, key: &str) -> Self {
        Self(format!("{}[{}]", self.0, key))
    }

    /// Append a list index (`a[0]`)
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of a structural violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Required,
    Invalid { value: String },
    Forbidden,
    NotSupported { value: String, supported: Vec<String> },
}

/// A single structural violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: SchemaPath,
    pub kind: ErrorKind,
    pub detail: String,
}

impl FieldError {
    fn required(path: SchemaPath, detail: &str) -> Self {
        Self {
            path,
            kind: ErrorKind::Required,
            detail: detail.to_string(),
        }
    }

    fn invalid(path: SchemaPath, value: impl Into<String>, detail: &str) -> Self {
        Self {
            path,
            kind: ErrorKind::Invalid {
                value: value.into(),
            },
            detail: detail.to_string(),
        }
    }

    fn forbidden(path: SchemaPath, detail: &str) -> Self {
        Self {
            path,
            kind: ErrorKind::Forbidden,
            detail: detail.to_string(),
        }
    }

    fn not_supported(path: SchemaPath, value: &str) -> Self {
        Self {
            path,
            kind: ErrorKind::NotSupported {
                value: value.to_string(),
                supported: PropertyType::ALL.iter().map(|t| t.to_string()).collect(),
            },
            detail: String::new(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Required => write!(f, "{}: Required value: {}", self.path, self.detail),
            ErrorKind::Invalid { value } => {
                write!(f, "{}: Invalid value: {:?}: {}", self.path, value, self.detail)
            }
            ErrorKind::Forbidden => write!(f, "{}: Forbidden: {}", self.path, self.detail),
            ErrorKind::NotSupported { value, supported } => {
                let supported = supported
                    .iter()
                    .map(|s| format!("{:?}", s))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "{}: Unsupported value: {:?}: supported values: {}",
                    self.path, value, supported
                )
            }
        }
    }
}

/// Every violation found in a schema, in traversal order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralErrors(Vec<FieldError>);

impl StructuralErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }
}

impl fmt::Display for StructuralErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "{}", single),
            errors => {
                f.write_str("[")?;
                for (i, error) in errors.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", error)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Root,
    Field,
    Item,
}

impl Level {
    fn missing_type_detail(self) -> &'static str {
        match self {
            Level::Root => "must not be empty at the root",
            Level::Field => "must not be empty for specified object fields",
            Level::Item => "must not be empty for specified array items",
        }
    }
}

/// Check that a CRD version schema (`openAPIV3Schema`) is structural
pub fn validate_structural(schema: &JSONSchemaProps) -> Result<(), StructuralErrors> {
    let mut errors = Vec::new();
    let root = SchemaPath::root();

    check_node(schema, Level::Root, &root, &mut errors);
    check_root(schema, &root, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(StructuralErrors(errors))
    }
}

fn check_node(s: &JSONSchemaProps, level: Level, path: &SchemaPath, errors: &mut Vec<FieldError>) {
    let type_ = s.schema_type();
    let int_or_string = s.x_kubernetes_int_or_string == Some(true);
    let embedded = s.x_kubernetes_embedded_resource == Some(true);

    match type_ {
        None if !int_or_string && !embedded => {
            errors.push(FieldError::required(
                path.child("type"),
                level.missing_type_detail(),
            ));
        }
        Some(t) if PropertyType::parse(t).is_none() => {
            errors.push(FieldError::not_supported(path.child("type"), t));
        }
        _ => {}
    }

    if let (true, Some(t)) = (int_or_string, type_) {
        errors.push(FieldError::invalid(
            path.child("type"),
            t,
            "must be empty if x-kubernetes-int-or-string is true",
        ));
    }

    if embedded {
        match type_ {
            Some("object") => {
                if s.additional_properties.is_some() {
                    errors.push(FieldError::forbidden(
                        path.child("additionalProperties"),
                        "must not be used if x-kubernetes-embedded-resource is set",
                    ));
                }
            }
            Some(t) => errors.push(FieldError::invalid(
                path.child("type"),
                t,
                "must be object if x-kubernetes-embedded-resource is true",
            )),
            None => errors.push(FieldError::required(
                path.child("type"),
                "must be object if x-kubernetes-embedded-resource is true",
            )),
        }

        if !s.preserves_unknown_fields() && !s.has_nested_properties() {
            errors.push(FieldError::required(
                path.child("properties"),
                "must not be empty if x-kubernetes-embedded-resource is true without x-kubernetes-preserve-unknown-fields",
            ));
        }
    }

    if s.x_kubernetes_preserve_unknown_fields == Some(false) {
        errors.push(FieldError::invalid(
            path.child("x-kubernetes-preserve-unknown-fields"),
            "false",
            "must be true or undefined",
        ));
    }

    match &s.items {
        Some(JSONSchemaPropsOrArray::Schema(items)) => {
            if let Some(t) = type_.filter(|t| *t != "array") {
                errors.push(FieldError::invalid(
                    path.child("type"),
                    t,
                    "must be array if items are specified",
                ));
            }
            check_node(items, Level::Item, &path.child("items"), errors);
        }
        Some(JSONSchemaPropsOrArray::Schemas(_)) => {
            errors.push(FieldError::forbidden(
                path.child("items"),
                "items must be a schema object and not an array",
            ));
        }
        None if type_ == Some("array") => {
            errors.push(FieldError::required(path.child("items"), "must be specified"));
        }
        None => {}
    }

    if let Some(props) = s.properties.as_ref().filter(|p| !p.is_empty()) {
        if let Some(t) = type_.filter(|t| *t != "object") {
            errors.push(FieldError::invalid(
                path.child("type"),
                t,
                "must be object if properties are specified",
            ));
        }

        if matches!(
            s.additional_properties,
            Some(JSONSchemaPropsOrBool::Schema(_)) | Some(JSONSchemaPropsOrBool::Bool(false))
        ) {
            errors.push(FieldError::forbidden(
                path.child("additionalProperties"),
                "additionalProperties and properties are mutual exclusive",
            ));
        }

        let props_path = path.child("properties");
        for (name, prop) in props {
            check_node(prop, Level::Field, &props_path.key(name), errors);
        }
    }

    if let Some(JSONSchemaPropsOrBool::Schema(additional)) = &s.additional_properties {
        check_node(
            additional,
            Level::Field,
            &path.child("additionalProperties"),
            errors,
        );
    }

    // int-or-string fields may spell out their two alternatives
    let skip_any_of = int_or_string && is_int_or_string_any_of(s.any_of.as_ref());
    let skip_first_all_of_any_of = int_or_string
        && s.all_of
            .as_ref()
            .and_then(|all_of| all_of.first())
            .is_some_and(|first| is_int_or_string_any_of(first.any_of.as_ref()));
    check_junctors(s, s, path, skip_any_of, skip_first_all_of_any_of, errors);

    if level == Level::Root || embedded {
        check_object_meta(s, level, path, errors);
    }
}

/// `anyOf: [{type: integer}, {type: string}]`
fn is_int_or_string_any_of(any_of: Option<&Vec<JSONSchemaProps>>) -> bool {
    any_of.is_some_and(|alternatives| *alternatives == [schema::integer(), schema::string()])
}

/// Walk the value validations of `v`, checking them against the structural node `s`
fn check_junctors(
    v: &JSONSchemaProps,
    s: &JSONSchemaProps,
    path: &SchemaPath,
    skip_any_of: bool,
    skip_first_all_of_any_of: bool,
    errors: &mut Vec<FieldError>,
) {
    let lists = [
        ("allOf", &v.all_of, false),
        ("anyOf", &v.any_of, skip_any_of),
        ("oneOf", &v.one_of, false),
    ];
    for (name, list, skip) in lists {
        let Some(list) = list.as_ref().filter(|_| !skip) else {
            continue;
        };
        let list_path = path.child(name);
        for (i, nested) in list.iter().enumerate() {
            let nested_skip_any_of = name == "allOf" && i == 0 && skip_first_all_of_any_of;
            check_value_validation(nested, s, &list_path.index(i), nested_skip_any_of, errors);
        }
    }

    if let Some(not) = &v.not {
        check_value_validation(not, s, &path.child("not"), false, errors);
    }
}

fn check_value_validation(
    v: &JSONSchemaProps,
    s: &JSONSchemaProps,
    path: &SchemaPath,
    skip_any_of: bool,
    errors: &mut Vec<FieldError>,
) {
    const UNDEFINED: &str = "must be undefined to be structural";
    const FALSE: &str = "must be false to be structural";

    if v.type_.is_some() {
        errors.push(FieldError::forbidden(path.child("type"), "must be empty to be structural"));
    }
    if v.default.is_some() {
        errors.push(FieldError::forbidden(path.child("default"), UNDEFINED));
    }
    if v.description.is_some() {
        errors.push(FieldError::forbidden(path.child("description"), UNDEFINED));
    }
    if v.additional_properties.is_some() {
        errors.push(FieldError::forbidden(path.child("additionalProperties"), UNDEFINED));
    }
    if v.nullable == Some(true) {
        errors.push(FieldError::forbidden(path.child("nullable"), FALSE));
    }

    let flags = [
        ("x-kubernetes-preserve-unknown-fields", v.x_kubernetes_preserve_unknown_fields),
        ("x-kubernetes-embedded-resource", v.x_kubernetes_embedded_resource),
        ("x-kubernetes-int-or-string", v.x_kubernetes_int_or_string),
    ];
    for (name, flag) in flags {
        if flag == Some(true) {
            errors.push(FieldError::forbidden(path.child(name), FALSE));
        }
    }
    if v.x_kubernetes_list_type.is_some() {
        errors.push(FieldError::forbidden(path.child("x-kubernetes-list-type"), UNDEFINED));
    }
    if v.x_kubernetes_list_map_keys.is_some() {
        errors.push(FieldError::forbidden(
            path.child("x-kubernetes-list-map-keys"),
            UNDEFINED,
        ));
    }
    if v.x_kubernetes_map_type.is_some() {
        errors.push(FieldError::forbidden(path.child("x-kubernetes-map-type"), UNDEFINED));
    }

    if let Some(props) = &v.properties {
        let props_path = path.child("properties");
        for (name, nested) in props {
            match s.property(name) {
                Some(counterpart) => check_value_validation(
                    nested,
                    counterpart,
                    &props_path.key(name),
                    false,
                    errors,
                ),
                None => errors.push(FieldError::required(
                    props_path.key(name),
                    "must be specified in the structural part of the schema",
                )),
            }
        }
    }

    match &v.items {
        Some(JSONSchemaPropsOrArray::Schema(items)) => match s.item_schema() {
            Some(counterpart) => {
                check_value_validation(items, counterpart, &path.child("items"), false, errors)
            }
            None => errors.push(FieldError::required(
                path.child("items"),
                "must be specified in the structural part of the schema",
            )),
        },
        Some(JSONSchemaPropsOrArray::Schemas(_)) => {
            errors.push(FieldError::forbidden(
                path.child("items"),
                "items must be a schema object and not an array",
            ));
        }
        None => {}
    }

    check_junctors(v, s, path, skip_any_of, false, errors);
}

fn check_root(s: &JSONSchemaProps, path: &SchemaPath, errors: &mut Vec<FieldError>) {
    if let Some(t) = s.schema_type().filter(|t| *t != "object") {
        errors.push(FieldError::invalid(
            path.child("type"),
            t,
            "must be object at the root",
        ));
    }
}

/// Rules for the object meta of the root and of embedded resources
fn check_object_meta(
    s: &JSONSchemaProps,
    level: Level,
    path: &SchemaPath,
    errors: &mut Vec<FieldError>,
) {
    let props_path = path.child("properties");

    for name in ["kind", "apiVersion"] {
        if let Some(t) = s
            .property(name)
            .and_then(|prop| prop.schema_type())
            .filter(|t| *t != "string")
        {
            errors.push(FieldError::invalid(
                props_path.key(name).child("type"),
                t,
                "must be string",
            ));
        }
    }

    let Some(metadata) = s.property("metadata") else {
        return;
    };
    let metadata_path = props_path.key("metadata");

    if let Some(t) = metadata.schema_type().filter(|t| *t != "object") {
        errors.push(FieldError::invalid(metadata_path.child("type"), t, "must be object"));
    }

    // embedded resources may restrict their metadata freely
    if level != Level::Root {
        return;
    }
    let Some(props) = &metadata.properties else {
        return;
    };

    let meta_props_path = metadata_path.child("properties");
    for (name, prop) in props {
        if name != "name" && name != "generateName" {
            errors.push(FieldError::forbidden(
                meta_props_path.key(name),
                "must not be specified, only name and generateName may be restricted in metadata",
            ));
            continue;
        }
        if let Some(t) = prop.schema_type().filter(|t| *t != "string") {
            errors.push(FieldError::invalid(
                meta_props_path.key(name).child("type"),
                t,
                "must be string",
            ));
        }
    }
}

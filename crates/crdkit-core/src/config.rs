//! Generation configuration
//!
//! A `crdkit.yaml` file lists the CRDs to complete, where their skeletons and
//! schema documents live, and how the result is written:
//!
//! ```yaml
//! apiVersion: crdkit.io/v1
//! crds:
//!   - skeleton: crds/widgets.yaml
//!     schemas:
//!       v1: schemas/widget-v1.json
//!     status: schemas/widget-status.yaml
//!     preserveUnknownFields:
//!       v1: [config, "rules.[].extra"]
//! output:
//!   path: out/crds.yaml
//!   stripGenerated: false
//! ```
//!
//! Relative paths are resolved against the directory of the config file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use serde::{Deserialize, Serialize};

use crate::complete::{CompletionReport, CrdCompleter};
use crate::error::{CrdError, Result, read_file};
use crate::manifest::{self, RenderOptions};
use crate::visitor::FieldPath;

/// API version of the config file format
pub const CONFIG_API_VERSION: &str = "crdkit.io/v1";

/// Default config file name
pub const DEFAULT_CONFIG_FILE: &str = "crdkit.yaml";

/// Generation config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// CRDs to complete, in output order
    #[serde(default)]
    pub crds: Vec<CrdEntry>,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    base_dir: PathBuf,
}

fn default_api_version() -> String {
    CONFIG_API_VERSION.to_string()
}

/// A single CRD to complete
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdEntry {
    /// CRD skeleton manifest
    pub skeleton: PathBuf,

    /// Schema document of each version's `spec`
    #[serde(default)]
    pub schemas: BTreeMap<String, PathBuf>,

    /// Status schema shared by versions with a status subresource
    #[serde(default)]
    pub status: Option<PathBuf>,

    /// Paths to mark with `x-kubernetes-preserve-unknown-fields`, per version
    #[serde(default)]
    pub preserve_unknown_fields: BTreeMap<String, Vec<FieldPath>>,
}

/// Output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    /// Output file (stdout when unset)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Drop the empty status block and null creation timestamp
    #[serde(default)]
    pub strip_generated: bool,
}

impl GenerationConfig {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = read_file(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_yaml(&content, base_dir)
    }

    /// Parse configuration, resolving relative paths against `base_dir`
    pub fn from_yaml(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(content)
            .map_err(|e| CrdError::InvalidConfig(e.to_string()))?;
        config.base_dir = base_dir.into();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.api_version != CONFIG_API_VERSION {
            return Err(CrdError::InvalidConfig(format!(
                "unsupported apiVersion '{}', expected '{}'",
                self.api_version, CONFIG_API_VERSION
            )));
        }

        if self.crds.is_empty() {
            return Err(CrdError::InvalidConfig("no CRDs configured".to_string()));
        }

        if let Some(entry) = self.crds.iter().find(|e| e.skeleton.as_os_str().is_empty()) {
            return Err(CrdError::InvalidConfig(format!(
                "empty skeleton path for CRD with versions {:?}",
                entry.schemas.keys().collect::<Vec<_>>()
            )));
        }

        Ok(())
    }

    /// Resolve a config-relative path
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Output file, resolved
    pub fn output_path(&self) -> Option<PathBuf> {
        self.output.path.as_deref().map(|p| self.resolve(p))
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            strip_generated: self.output.strip_generated,
        }
    }

    /// Load the skeleton of an entry
    pub fn load_skeleton(&self, entry: &CrdEntry) -> Result<CustomResourceDefinition> {
        manifest::load_crd(&self.resolve(&entry.skeleton))
    }

    /// Load every schema document of an entry into a completer
    pub fn build_completer(&self, entry: &CrdEntry) -> Result<CrdCompleter> {
        let mut completer = CrdCompleter::new();

        for (version, path) in &entry.schemas {
            let document = manifest::load_schema_document(&self.resolve(path))?;
            completer = completer.with_version_schema(version.clone(), document);
        }

        if let Some(path) = &entry.status {
            let document = manifest::load_schema_document(&self.resolve(path))?;
            completer = completer.with_status_schema(document);
        }

        for (version, paths) in &entry.preserve_unknown_fields {
            completer = completer.with_preserve_unknown_fields(version.clone(), paths.clone());
        }

        Ok(completer)
    }

    /// Load and complete a single entry
    pub fn complete_entry(
        &self,
        entry: &CrdEntry,
    ) -> Result<(CustomResourceDefinition, CompletionReport)> {
        let mut crd = self.load_skeleton(entry)?;
        let report = self.build_completer(entry)?.complete(&mut crd)?;
        Ok((crd, report))
    }
}

//! CLI error types with exit code handling
//!
//! Every failure of a command ends up as a [`CliError`], which carries the
//! exit code the process terminates with.

use crdkit_core::CrdError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// A version schema violates the structural schema rules
    #[error("Schema error: {message}")]
    #[diagnostic(
        code(crdkit::cli::schema),
        help("paths are relative to the version's openAPIV3Schema, `spec` is the version's schema document")
    )]
    Schema { message: String },

    /// Missing or malformed CRD skeleton or schema document
    #[error("Manifest error: {message}")]
    #[diagnostic(code(crdkit::cli::manifest))]
    Manifest {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Invalid generation config
    #[error("Config error: {message}")]
    #[diagnostic(code(crdkit::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// `check` found structural violations
    #[error("Check failed with {violations} violation(s) in {versions} version(s)")]
    #[diagnostic(code(crdkit::cli::check))]
    CheckFailed { violations: usize, versions: usize },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(crdkit::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(crdkit::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Schema { .. } | CliError::CheckFailed { .. } => exit_codes::SCHEMA_ERROR,
            CliError::Manifest { .. } => exit_codes::MANIFEST_ERROR,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a manifest error
    pub fn manifest(message: impl Into<String>) -> Self {
        Self::Manifest {
            message: message.into(),
            help: None,
        }
    }

    /// Create a manifest error with help text
    pub fn manifest_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Manifest {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a config error with help text
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a check failure error
    pub fn check_failed(violations: usize, versions: usize) -> Self {
        Self::CheckFailed {
            violations,
            versions,
        }
    }

    /// Attach the file an IO error happened on
    pub fn io_at(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{}: {}", path.display(), err),
        }
    }
}

impl From<CrdError> for CliError {
    fn from(err: CrdError) -> Self {
        let message = err.to_string();
        match err {
            CrdError::NonStructural { .. } => CliError::Schema { message },
            CrdError::MissingSchema { ref version, .. } => CliError::manifest_with_help(
                message,
                format!("add a schema document for '{}' under `schemas` in the config", version),
            ),
            CrdError::SchemaEncode { .. }
            | CrdError::SchemaDecode { .. }
            | CrdError::InvalidManifest(_) => CliError::manifest(message),
            CrdError::InvalidConfig(_) => CliError::Config {
                message,
                help: None,
            },
            CrdError::ReadFile { path, source } => CliError::io_at(&path, source),
            _ => CliError::Other { message },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

#![allow(dead_code)]

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Schema error - a CRD version schema is not structural
pub const SCHEMA_ERROR: i32 = 2;

/// Manifest error - missing or malformed CRD skeleton or schema document
pub const MANIFEST_ERROR: i32 = 3;

/// Config error - invalid crdkit.yaml
pub const CONFIG_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;

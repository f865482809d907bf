//! # Error Handling
//!
//! This module defines the centralized error type for `stackweave`. It uses
//! `thiserror` to build a single `Error` enum covering every failure that can
//! escape the library as an `Err`.
//!
//! Not every problem is an `Err`. While units are composing, problems are
//! recorded as [`Diagnostic`](crate::mutation::Diagnostic) values on the
//! mutation set so that one run can surface every warning and the first fatal
//! error together. `Error` is reserved for:
//!
//! - Loading the `.stackweave.yaml` project file.
//! - Reading, parsing and writing documents and files during Commit.
//! - Calling a pipeline phase from the wrong state.
//! - Wrapped library errors (I/O, YAML, JSON, TOML, regex, semver, URL).

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for stackweave operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error occurred while parsing the `.stackweave.yaml` project file.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A unit was invoked by a name that is not in the registry.
    #[error("Unknown unit: {name}")]
    UnknownUnit { name: String },

    /// A unit composed itself, directly or through other units.
    #[error("Cycle detected in unit composition: {cycle}")]
    CycleDetected { cycle: String },

    /// A unit reported that it cannot proceed.
    #[error("Unit '{unit}' failed: {message}")]
    Unit { unit: String, message: String },

    /// An operation payload is malformed (empty name, path outside the tree).
    #[error("{message}")]
    InvalidOperation { message: String },

    /// A structured document (manifest or configuration) could not be
    /// read, navigated or written.
    #[error("Document error in {}: {message}", path.display())]
    Document { path: PathBuf, message: String },

    /// A patch transform could not be applied to a file's content.
    #[error("Patch failed for {}: {message}", path.display())]
    Transform { path: PathBuf, message: String },

    /// A file to be created already exists with different content.
    #[error("{} already exists with different content", path.display())]
    FileExists { path: PathBuf },

    /// A store read or write failed.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// A pipeline phase was invoked from a state that does not allow it.
    #[error("Cannot {action} while pipeline is {state}")]
    InvalidTransition { action: String, state: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A TOML parsing error, wrapped from `toml::de::Error`.
    #[error("TOML parsing error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// A TOML serialization error, wrapped from `toml::ser::Error`.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A semantic versioning parsing error, wrapped from `semver::Error`.
    #[error("Semver parsing error: {0}")]
    Semver(#[from] semver::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

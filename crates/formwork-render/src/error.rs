//! Error types for value assignment, rendering and directory walks.
//!
//! This module provides [`FormworkError`], the single error type returned by
//! every fallible operation in this crate. It abstracts over the underlying
//! template engine's errors so callers never see `minijinja` types directly.

use std::path::PathBuf;

/// Convenience alias used throughout the crate.
pub type Result<T, E = FormworkError> = std::result::Result<T, E>;

/// Error type for all formwork operations.
#[derive(Debug, thiserror::Error)]
pub enum FormworkError {
    /// A `--value` path could not be parsed.
    #[error("invalid value path `{path}` at offset {offset}: {message}")]
    PathSyntax {
        /// The full path as given by the caller.
        path: String,
        /// Byte offset of the offending character.
        offset: usize,
        /// What was expected at that offset.
        message: String,
    },

    /// A path navigates a node as a map when it is already a list (or the
    /// other way around), or descends into a scalar.
    #[error("cannot access `{path}` as a {expected}: node is already a {found}")]
    ShapeConflict {
        /// The path prefix that reached the conflicting node.
        path: String,
        /// The role the access implied.
        expected: &'static str,
        /// The role the node already has.
        found: &'static str,
    },

    /// A template file does not exist.
    #[error("template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// Any failure while compiling or rendering a template.
    #[error("render error: {0}")]
    Render(String),

    /// Bad arguments handed to an operation (e.g. a source directory that is
    /// not a directory).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A directory walk stopped because one entry failed.
    #[error("directory walk aborted at {}: {source}", path.display())]
    WalkAborted {
        /// The source entry being processed when the failure occurred.
        path: PathBuf,
        /// The failure itself.
        #[source]
        source: Box<FormworkError>,
    },

    /// Text could not be decoded from or encoded to the configured encoding.
    #[error("{encoding} encoding error: {message}")]
    Encoding {
        /// Canonical name of the encoding involved.
        encoding: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// A format name that does not map to any formatter variant.
    #[error("unknown template format `{0}` (expected one of: jinja2, format, fstring, python)")]
    UnknownFormat(String),

    /// A user-defined function source could not be turned into a callable.
    #[error("invalid function `{name}`: {message}")]
    FunctionDefinition {
        /// Name the function was to be registered under.
        name: String,
        /// Why the definition was rejected.
        message: String,
    },

    /// I/O failure on a specific path.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl FormworkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FormworkError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn render(message: impl Into<String>) -> Self {
        FormworkError::Render(message.into())
    }
}

impl From<minijinja::Error> for FormworkError {
    fn from(err: minijinja::Error) -> Self {
        let mut message = err.to_string();
        if let Some(detail) = err.detail() {
            if !message.contains(detail) {
                message = format!("{message} ({detail})");
            }
        }
        FormworkError::Render(message)
    }
}

impl From<serde_json::Error> for FormworkError {
    fn from(err: serde_json::Error) -> Self {
        FormworkError::Render(format!("value conversion failed: {err}"))
    }
}

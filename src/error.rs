//! Error types for dialect resolution, bundling and transformation.

use std::path::PathBuf;
use thiserror::Error;

use crate::pointer::Pointer;

/// Errors raised while resolving, framing, bundling or transforming schemas.
#[derive(Debug, Error)]
pub enum SchemaError {
    // Unknown-dialect class
    #[error("could not determine the dialect of the schema")]
    UnknownDialect,

    #[error("could not determine the base dialect of the schema")]
    UnknownBaseDialect,

    #[error("unrecognized base dialect: {dialect}")]
    BaseDialect { dialect: String },

    // Resolution-failure class
    #[error("could not resolve {uri}: {message}")]
    Resolution { uri: String, message: String },

    #[error("relative metaschema URIs cannot be resolved: {uri}")]
    RelativeMetaschemaResolution { uri: String },

    // Reference-integrity class
    #[error("could not resolve reference {uri} at {pointer}: {message}")]
    Reference {
        uri: String,
        pointer: Pointer,
        message: String,
    },

    #[error("identifier {identifier} is hidden by a sibling $ref in this dialect")]
    ReferenceObjectResource { identifier: String },

    #[error("reference {reference} at {pointer} no longer resolves after transformation")]
    BrokenReference { reference: String, pointer: Pointer },

    // Conflict class
    #[error("cannot bundle: conflicting definitions for {identifier}")]
    Conflict { identifier: String },

    #[error("rules {first} and {second} both match {pointer}")]
    TransformConflict {
        pointer: Pointer,
        first: String,
        second: String,
    },

    #[error("rule {rule} matched {pointer} again after being applied")]
    TransformRepeated { pointer: Pointer, rule: String },

    // Malformed-identity class and everything else
    #[error("invalid schema: {message}")]
    Invalid { message: String },
}

impl SchemaError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SchemaError::Invalid {
            message: message.into(),
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }

    /// Whether this error belongs to the resolution-failure class.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            SchemaError::Resolution { .. } | SchemaError::RelativeMetaschemaResolution { .. }
        )
    }
}

/// Errors while loading schema documents from disk or the network.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

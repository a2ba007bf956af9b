use std::path::PathBuf;

use pbgen_schema::ModelError;
use thiserror::Error;

/// Problems found while turning schema text into a [`pbgen_schema::Protobuf`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// The root file could not be read. The compiler logs and skips it.
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[error("{file}: parse error at line {line}, column {column}: {msg}")]
    Parse {
        file:   String,
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("{file}: cannot resolve import {import}")]
    UnresolvedImport {
        file:   String,
        import: String,
    },

    #[error("{file}: the type {name} is not defined for field {field}")]
    UnknownType {
        file:  String,
        name:  String,
        field: String,
    },

    #[error("{file}: import cycle through {import}")]
    ImportCycle {
        file:   String,
        import: String,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl LoadError {
    /// Whether the compiler may skip the file and keep going.
    pub fn is_advisory(&self) -> bool {
        matches!(self, LoadError::Unreadable { .. })
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ResolveError {
    #[error("map field {field} cannot nest another map")]
    NestedMap {
        field: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid skip pattern \"{pattern}\": {source}")]
    SkipPattern {
        pattern: String,
        source:  regex::Error,
    },

    #[error("output root {path} is not usable: {reason}")]
    OutputRoot {
        path:   PathBuf,
        reason: String,
    },

    #[error("cannot read config {path}: {source}")]
    Read {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path:   PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum GenError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Schema error: {0}")]
    Load(#[from] LoadError),

    #[error("Type error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[error("no output file is open")]
    NoOutput,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

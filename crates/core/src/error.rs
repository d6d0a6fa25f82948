//! Error types shared across the core crate.

use std::{io, path::PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Malformed wire JSON for a game, profile or content descriptor.
#[derive(Debug, Error)]
#[error("failed to decode {what}: {source}")]
pub struct DecodeError {
    /// Short description of what was being decoded.
    pub what: String,
    /// Underlying parser error.
    #[source]
    pub source: serde_json::Error,
}

impl DecodeError {
    /// Wrap a `serde_json` error with a description of the decoded value.
    pub fn new(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self {
            what: what.into(),
            source,
        }
    }
}

/// A game could not be turned into something displayable.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The internal view name does not match any built-in screen.
    #[error("unknown internal view \"{0}\"")]
    UnknownView(String),
    /// The game has no content descriptor.
    #[error("game \"{game}\" has no content to launch")]
    MissingContent {
        /// Display name of the game.
        game: String,
    },
    /// The inline markup could not be written to a local document.
    #[error("failed to write document {path}: {source}")]
    Document {
        /// Target document path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// The key-value persistence layer rejected a read or write.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O failed for {key}: {source}")]
    Io {
        /// Storage key or file involved.
        key: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The value could not be serialised.
    #[error("failed to serialise {key}: {source}")]
    Serialize {
        /// Storage key involved.
        key: String,
        /// Underlying serialiser error.
        #[source]
        source: serde_json::Error,
    },
}

/// A game with the same content already exists in the target profile.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("\"{name}\" already exists in the library of {profile}")]
pub struct DuplicateError {
    /// Name of the rejected game.
    pub name: String,
    /// Name of the target profile.
    pub profile: String,
}

/// Failures of the profile store's higher-level mutations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No profile carries the requested id.
    #[error("no profile with id {0}")]
    UnknownProfile(Uuid),
    /// The game duplicates an existing entry.
    #[error(transparent)]
    Duplicate(#[from] DuplicateError),
    /// The mutation was committed in memory but could not be persisted.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

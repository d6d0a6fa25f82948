#![warn(clippy::all, missing_docs)]

//! Core domain logic for the SwitchOS console shell.
//!
//! This crate hosts the profile and game models, the content descriptor
//! codec, configuration handling, the persisted profile store, import/export,
//! the remote store catalog, and content resolution used by any frontend.

pub mod catalog;
pub mod config;
pub mod content;
pub mod defaults;
pub mod error;
pub mod models;
pub mod persistence;
pub mod render;
pub mod storage;
pub mod transfer;

pub use catalog::{CatalogClient, CatalogEvent, CatalogSnapshot};
pub use config::AppConfig;
pub use content::{AppId, GameContent};
pub use error::{DecodeError, DuplicateError, PersistenceError, RenderError, StorageError};
pub use models::{Game, GameDraft, Profile, UserIcon};
pub use persistence::{FileStore, KeyValueStore, MemoryStore};
pub use render::{InternalView, RenderTarget, Renderer};
pub use storage::{repair, SwitchStorage, PROFILE_DATA_KEY};
pub use transfer::ImportReport;

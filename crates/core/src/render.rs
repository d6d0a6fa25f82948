//! Resolves a game into something a front end can display.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use reqwest::Url;
use tracing::debug;

use crate::{
    content::{AppId, GameContent, SETTINGS_APP_ID, STORE_APP_ID},
    error::RenderError,
    models::Game,
};

/// File name of the local document written for inline markup.
pub const DOCUMENT_FILE: &str = "index.html";

/// Built-in screens reachable through internal view content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternalView {
    /// The game catalog.
    Store,
    /// Application settings.
    Settings,
}

impl InternalView {
    /// Resolve a view name, `None` if no such screen exists.
    pub fn from_app_id(id: &AppId) -> Option<Self> {
        match id.as_str() {
            STORE_APP_ID => Some(Self::Store),
            SETTINGS_APP_ID => Some(Self::Settings),
            _ => None,
        }
    }

    /// Name used in content descriptors.
    pub fn app_id(self) -> &'static str {
        match self {
            Self::Store => STORE_APP_ID,
            Self::Settings => SETTINGS_APP_ID,
        }
    }
}

impl fmt::Display for InternalView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.app_id())
    }
}

/// What to show for a launched game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    /// Load a remote page.
    Web {
        /// Page address.
        url: Url,
        /// Network identity to present.
        user_agent: Option<String>,
    },
    /// Load a local document written from inline markup.
    Document {
        /// Location of the written document.
        path: PathBuf,
        /// The markup that was written.
        markup: String,
        /// Network identity to present.
        user_agent: Option<String>,
    },
    /// Show a built-in screen.
    Internal(InternalView),
}

/// Turns games into [`RenderTarget`]s.
#[derive(Debug, Clone)]
pub struct Renderer {
    document_dir: PathBuf,
    default_user_agent: Option<String>,
}

impl Renderer {
    /// Renderer writing documents into `document_dir`.
    pub fn new(document_dir: impl Into<PathBuf>, default_user_agent: Option<String>) -> Self {
        Self {
            document_dir: document_dir.into(),
            default_user_agent,
        }
    }

    /// Path of the document used for inline markup.
    pub fn document_path(&self) -> PathBuf {
        self.document_dir.join(DOCUMENT_FILE)
    }

    /// Resolve `game` into a render target.
    pub fn prepare(&self, game: &Game) -> Result<RenderTarget, RenderError> {
        let user_agent = game
            .user_agent
            .clone()
            .or_else(|| self.default_user_agent.clone());

        match &game.content {
            None => Err(RenderError::MissingContent {
                game: game.name.clone(),
            }),
            Some(GameContent::Url(url)) => Ok(RenderTarget::Web {
                url: url.clone(),
                user_agent,
            }),
            Some(GameContent::Html(markup)) => {
                let path = self.document_path();
                write_document(&path, markup)?;
                Ok(RenderTarget::Document {
                    path,
                    markup: markup.clone(),
                    user_agent,
                })
            }
            Some(GameContent::InternalView(id)) => InternalView::from_app_id(id)
                .map(RenderTarget::Internal)
                .ok_or_else(|| RenderError::UnknownView(id.to_string())),
        }
    }
}

fn write_document(path: &Path, markup: &str) -> Result<(), RenderError> {
    let to_error = |source| RenderError::Document {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(to_error)?;
    }
    fs::write(path, markup).map_err(to_error)?;
    debug!("wrote {} bytes of markup to {}", markup.len(), path.display());
    Ok(())
}

//! Authoring helper that turns free-form input into a [`Game`].

use reqwest::Url;
use thiserror::Error;

use crate::{content::GameContent, error::DecodeError};

use super::Game;

/// Content kinds that can be authored by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftKind {
    /// Website address.
    #[default]
    Url,
    /// Inline markup.
    Html,
}

/// Why a draft could not produce a game.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DraftError {
    /// The name is blank.
    #[error("a name is required")]
    MissingName,
    /// The icon location is not an absolute URL.
    #[error("icon URL \"{0}\" is not valid")]
    InvalidIcon(String),
    /// No content was provided.
    #[error("content is required")]
    MissingContent,
    /// The website address is not an absolute URL.
    #[error("website URL \"{0}\" is not valid")]
    InvalidUrl(String),
}

/// Raw authoring input for a new game.
#[derive(Debug, Clone, Default)]
pub struct GameDraft {
    /// Display name.
    pub name: String,
    /// Icon location as typed.
    pub image_url: String,
    /// Which kind of content `content` holds.
    pub kind: DraftKind,
    /// Website address or markup.
    pub content: String,
    /// Optional user agent; blank means none.
    pub user_agent: Option<String>,
}

impl GameDraft {
    /// Validate the input and build a game with a fresh id.
    pub fn build(&self) -> Result<Game, DraftError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DraftError::MissingName);
        }
        let icon = Url::parse(self.image_url.trim())
            .map_err(|_| DraftError::InvalidIcon(self.image_url.clone()))?;
        if self.content.trim().is_empty() {
            return Err(DraftError::MissingContent);
        }
        let content = match self.kind {
            DraftKind::Html => GameContent::Html(self.content.clone()),
            DraftKind::Url => GameContent::Url(
                Url::parse(self.content.trim())
                    .map_err(|_| DraftError::InvalidUrl(self.content.clone()))?,
            ),
        };

        let mut game = Game::new(icon, name, Some(content));
        game.user_agent = self
            .user_agent
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Ok(game)
    }
}

/// Render a game the way it is shared with other users.
pub fn to_pretty_json(game: &Game) -> Result<String, DecodeError> {
    serde_json::to_string_pretty(game).map_err(|err| DecodeError::new("game", err))
}

//! Shared domain models.

pub mod draft;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::{url_string, GameContent};

pub use draft::{to_pretty_json, DraftError, DraftKind, GameDraft};

/// One launchable entry of a profile's library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Game {
    /// Stable identifier assigned at creation.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Icon location.
    #[serde(rename = "imageURL", with = "url_string")]
    pub image_url: Url,
    /// Display name.
    pub name: String,
    /// How the game is launched; `None` cannot be rendered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<GameContent>,
    /// Network identity override used when rendering web content.
    #[serde(
        rename = "userAgent",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub user_agent: Option<String>,
}

impl Game {
    /// Create a game with a fresh identifier.
    pub fn new(image_url: Url, name: impl Into<String>, content: Option<GameContent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            image_url,
            name: name.into(),
            content,
            user_agent: None,
        }
    }

    /// Builder-style user agent override.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Whether both games launch the same content.
    ///
    /// This, not id or name, decides whether an install is a duplicate.
    pub fn same_content(&self, other: &Game) -> bool {
        self.content == other.content
    }

    /// Whether this entry opens the built-in store.
    pub fn is_store(&self) -> bool {
        self.content.as_ref().is_some_and(GameContent::is_store)
    }
}

/// Profile picture, either inline bytes or a remote image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "UserIconWire", into = "UserIconWire")]
pub enum UserIcon {
    /// Raw image bytes.
    Data(Vec<u8>),
    /// Remote image location.
    Url(Url),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum UserIconWire {
    Data {
        #[serde(rename = "_0")]
        value: String,
    },
    Url {
        #[serde(rename = "_0")]
        value: String,
    },
}

impl From<UserIcon> for UserIconWire {
    fn from(icon: UserIcon) -> Self {
        match icon {
            UserIcon::Data(bytes) => Self::Data {
                value: BASE64_STANDARD.encode(bytes),
            },
            UserIcon::Url(url) => Self::Url {
                value: url.to_string(),
            },
        }
    }
}

impl TryFrom<UserIconWire> for UserIcon {
    type Error = String;

    fn try_from(wire: UserIconWire) -> Result<Self, Self::Error> {
        match wire {
            UserIconWire::Data { value } => BASE64_STANDARD
                .decode(value.as_bytes())
                .map(UserIcon::Data)
                .map_err(|err| format!("invalid icon data: {err}")),
            UserIconWire::Url { value } => Url::parse(&value)
                .map(UserIcon::Url)
                .map_err(|err| format!("invalid icon URL \"{value}\": {err}")),
        }
    }
}

/// A user of the console shell and their ordered library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Profile {
    /// Stable identifier assigned at creation.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Games in carousel order.
    pub games: Vec<Game>,
    /// Profile picture.
    #[serde(rename = "userIcon")]
    pub user_icon: UserIcon,
}

impl Profile {
    /// Create a profile with a fresh identifier.
    pub fn new(name: impl Into<String>, games: Vec<Game>, user_icon: UserIcon) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            games,
            user_icon,
        }
    }

    /// Whether a game with the same content is already installed.
    pub fn contains_content(&self, game: &Game) -> bool {
        self.games.iter().any(|existing| existing.same_content(game))
    }

    /// Whether the profile carries a store entry.
    pub fn has_store(&self) -> bool {
        self.games.iter().any(Game::is_store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn icon() -> Url {
        Url::parse("https://example.com/icon.png").unwrap()
    }

    #[test]
    fn game_uses_wire_key_names() {
        let game = Game::new(
            icon(),
            "Sample",
            Some(GameContent::Html("<p>x</p>".into())),
        )
        .with_user_agent("Agent/1.0");
        let value = serde_json::to_value(&game).unwrap();
        assert_eq!(value["imageURL"], json!("https://example.com/icon.png"));
        assert_eq!(value["userAgent"], json!("Agent/1.0"));
        assert_eq!(value["content"]["type"], json!("html"));
        assert_eq!(value["id"], json!(game.id.to_string()));
    }

    #[test]
    fn absent_optionals_are_omitted_and_missing_id_is_generated() {
        let decoded: Game = serde_json::from_value(json!({
            "imageURL": "https://example.com/icon.png",
            "name": "Bare"
        }))
        .unwrap();
        assert!(decoded.content.is_none());
        assert!(decoded.user_agent.is_none());

        let value = serde_json::to_value(&decoded).unwrap();
        assert!(value.get("content").is_none());
        assert!(value.get("userAgent").is_none());
    }

    #[test]
    fn game_rejects_bad_icon_url() {
        let result: Result<Game, _> = serde_json::from_value(json!({
            "imageURL": "icon.png",
            "name": "Broken"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn uppercase_ids_are_accepted() {
        let decoded: Game = serde_json::from_value(json!({
            "id": "5CC02A33-F5D1-48E4-B14B-7DD6A5EDDB90",
            "imageURL": "https://example.com/icon.png",
            "name": "Upper"
        }))
        .unwrap();
        assert_eq!(
            decoded.id.to_string(),
            "5cc02a33-f5d1-48e4-b14b-7dd6a5eddb90"
        );
    }

    #[test]
    fn user_icon_wire_layout() {
        let data = UserIcon::Data(vec![1, 2, 3]);
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({"data": {"_0": "AQID"}})
        );
        let url = UserIcon::Url(icon());
        assert_eq!(
            serde_json::to_value(&url).unwrap(),
            json!({"url": {"_0": "https://example.com/icon.png"}})
        );

        let decoded: UserIcon = serde_json::from_value(json!({"data": {"_0": "AQID"}})).unwrap();
        assert_eq!(decoded, data);
        assert!(serde_json::from_value::<UserIcon>(json!({"data": {"_0": "%%%"}})).is_err());
    }

    #[test]
    fn duplicate_detection_ignores_id_and_name() {
        let content = Some(GameContent::Url(Url::parse("https://gpadtester.com").unwrap()));
        let first = Game::new(icon(), "Controller Test", content.clone());
        let second = Game::new(icon(), "Another Name", content);
        let profile = Profile::new("P", vec![first], UserIcon::Url(icon()));
        assert!(profile.contains_content(&second));
        assert!(!profile.has_store());
    }
}

//! Game content descriptors and their JSON wire encoding.
//!
//! Content is encoded as `{"type": <kind>, "value": <payload>}` where the kind
//! is one of `url`, `html` or `swiftUIView`. Internal view names are stored
//! verbatim; whether a name maps to a real screen is only decided when the
//! game is rendered.

use std::fmt;

use reqwest::Url;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DecodeError;

/// Name of the built-in store screen.
pub const STORE_APP_ID: &str = "Store";
/// Name of the built-in settings screen.
pub const SETTINGS_APP_ID: &str = "Settings";

/// Identifier of a built-in screen, kept uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppId(String);

impl AppId {
    /// Wrap a raw view name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw view name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AppId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a game's content is materialised.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GameContent {
    /// Load the address in a web view.
    Url(Url),
    /// Load the markup as a local document.
    Html(String),
    /// Dispatch to a built-in screen.
    InternalView(AppId),
}

impl GameContent {
    /// Content pointing at the built-in store screen.
    pub fn store() -> Self {
        Self::InternalView(AppId::new(STORE_APP_ID))
    }

    /// Whether this is the store screen entry every profile must carry.
    pub fn is_store(&self) -> bool {
        matches!(self, Self::InternalView(id) if id.as_str() == STORE_APP_ID)
    }

    /// Wire discriminator of this content.
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Url(_) => ContentKind::Url,
            Self::Html(_) => ContentKind::Html,
            Self::InternalView(_) => ContentKind::SwiftUiView,
        }
    }

    /// Raw payload carried by the variant.
    pub fn payload(&self) -> &str {
        match self {
            Self::Url(url) => url.as_str(),
            Self::Html(html) => html,
            Self::InternalView(id) => id.as_str(),
        }
    }

    /// Encode to the `{type, value}` JSON object.
    pub fn encode(&self) -> serde_json::Value {
        serde_json::json!({ "type": self.kind(), "value": self.payload() })
    }

    /// Decode from a `{type, value}` JSON object.
    pub fn decode(value: serde_json::Value) -> Result<Self, DecodeError> {
        serde_json::from_value(value).map_err(|err| DecodeError::new("game content", err))
    }
}

/// Wire discriminator for [`GameContent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    /// Remote address.
    #[serde(rename = "url")]
    Url,
    /// Inline markup.
    #[serde(rename = "html")]
    Html,
    /// Built-in screen.
    #[serde(rename = "swiftUIView")]
    SwiftUiView,
}

#[derive(Serialize)]
struct WireOut<'a> {
    #[serde(rename = "type")]
    kind: ContentKind,
    value: &'a str,
}

#[derive(Deserialize)]
struct WireIn {
    #[serde(rename = "type")]
    kind: ContentKind,
    value: String,
}

impl Serialize for GameContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireOut {
            kind: self.kind(),
            value: self.payload(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GameContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireIn::deserialize(deserializer)?;
        Ok(match wire.kind {
            ContentKind::Url => Self::Url(parse_url::<D::Error>(&wire.value)?),
            ContentKind::Html => Self::Html(wire.value),
            ContentKind::SwiftUiView => Self::InternalView(AppId(wire.value)),
        })
    }
}

pub(crate) fn parse_url<E: de::Error>(raw: &str) -> Result<Url, E> {
    Url::parse(raw).map_err(|err| E::custom(format!("invalid URL \"{raw}\": {err}")))
}

/// Serde adapter storing a [`Url`] as its string form.
pub(crate) mod url_string {
    use reqwest::Url;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(url: &Url, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(url.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Url, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_url(&raw)
    }
}

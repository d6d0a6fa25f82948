//! Remote store catalog.
//!
//! The catalog is a plain repository of JSON files, one game per file. Its tree
//! listing is fetched first; every blob except the README is then downloaded
//! and decoded as a single [`Game`].

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    config::CatalogConfig,
    content::GameContent,
    error::DecodeError,
    models::Game,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

static README_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)readme\.md").expect("invalid readme regex"));

/// Repository tree listing.
#[derive(Debug, Clone, Deserialize)]
pub struct GitTree {
    /// Commit or tree hash of the listing.
    pub sha: Option<String>,
    /// Entries at the root of the tree.
    pub tree: Vec<GitTreeEntry>,
    /// Whether the listing was cut short by the server.
    #[serde(default)]
    pub truncated: Option<bool>,
}

/// One file or directory of a [`GitTree`].
#[derive(Debug, Clone, Deserialize)]
pub struct GitTreeEntry {
    /// Repository-relative path.
    pub path: String,
    /// `blob` for files, `tree` for directories.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Size in bytes for blobs.
    pub size: Option<u64>,
}

/// Decode a tree listing.
pub fn parse_tree(bytes: &[u8]) -> Result<GitTree, DecodeError> {
    serde_json::from_slice(bytes).map_err(|err| DecodeError::new("catalog listing", err))
}

/// Raw URLs of every catalog entry in `tree`, README excluded.
pub fn entry_urls(config: &CatalogConfig, tree: &GitTree) -> Vec<String> {
    tree.tree
        .iter()
        .filter(|entry| entry.kind.as_deref() == Some("blob"))
        .map(|entry| config.raw_url(&entry.path))
        .filter(|url| !README_RE.is_match(url))
        .collect()
}

/// Decode a single catalog entry.
pub fn decode_entry(bytes: &[u8]) -> Result<Game, DecodeError> {
    serde_json::from_slice(bytes).map_err(|err| DecodeError::new("catalog entry", err))
}

/// Decode downloaded entries, skipping the ones that failed.
///
/// Returns the games in listing order and the number of skipped entries.
pub fn collect_games<I>(entries: I) -> (Vec<Game>, usize)
where
    I: IntoIterator<Item = (String, Result<Vec<u8>>)>,
{
    let mut games = Vec::new();
    let mut skipped = 0;
    for (url, body) in entries {
        match body.and_then(|bytes| decode_entry(&bytes).map_err(anyhow::Error::from)) {
            Ok(game) => games.push(game),
            Err(err) => {
                warn!("Failed to decode {url}: {err:#}");
                skipped += 1;
            }
        }
    }
    (games, skipped)
}

/// Label shown for a content kind in catalog details.
pub fn describe_content(content: &GameContent) -> &'static str {
    match content {
        GameContent::Url(_) => "Website URL",
        GameContent::Html(_) => "HTML",
        GameContent::InternalView(_) => "Internal View",
    }
}

/// Games available in the remote catalog at one point in time.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    /// Decoded games in listing order.
    pub games: Vec<Game>,
    /// Hash of the listed tree.
    pub commit: Option<String>,
    /// Entries that could not be downloaded or decoded.
    pub skipped: usize,
    /// When the listing was fetched.
    pub fetched_at: DateTime<Utc>,
}

/// Events emitted by a background catalog refresh.
#[derive(Debug)]
pub enum CatalogEvent {
    /// The catalog was fetched.
    Loaded(CatalogSnapshot),
    /// The listing could not be fetched.
    Failed(anyhow::Error),
}

/// Fetches the store catalog over HTTPS.
pub struct CatalogClient {
    config: CatalogConfig,
    http: reqwest::Client,
}

impl CatalogClient {
    /// Create a client for the configured repository.
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("switchos/", env!("CARGO_PKG_VERSION")))
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { config, http })
    }

    /// Catalog location.
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Fetch the listing and every entry.
    ///
    /// Only a failure to fetch or decode the listing is an error.
    pub async fn fetch(&self) -> Result<CatalogSnapshot> {
        if self.config.request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
        }

        let listing_url = self.config.tree_url();
        info!("fetching catalog listing {listing_url}");
        let listing = self
            .get_bytes(&listing_url)
            .await
            .context("failed to fetch catalog listing")?;
        let tree = parse_tree(&listing)?;
        if tree.truncated.unwrap_or(false) {
            warn!("catalog listing is truncated");
        }

        let mut downloads = Vec::new();
        for url in entry_urls(&self.config, &tree) {
            debug!("fetching catalog entry {url}");
            let body = self.get_bytes(&url).await;
            downloads.push((url, body));
        }
        let (games, skipped) = collect_games(downloads);
        info!("catalog holds {} game(s), {} skipped", games.len(), skipped);

        Ok(CatalogSnapshot {
            games,
            commit: tree.sha,
            skipped,
            fetched_at: Utc::now(),
        })
    }

    /// Fetch once and report the outcome on `sender`.
    pub async fn run(self, sender: mpsc::Sender<CatalogEvent>) -> Result<()> {
        let event = match self.fetch().await {
            Ok(snapshot) => CatalogEvent::Loaded(snapshot),
            Err(err) => CatalogEvent::Failed(err),
        };
        sender
            .send(event)
            .await
            .context("failed to send catalog event")
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{url} returned an error status"))?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("failed to read body of {url}"))?;
        Ok(bytes.to_vec())
    }
}

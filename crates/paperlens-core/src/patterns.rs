//! Pattern metadata as shown by the read-only viewer
//!
//! The display build never writes pattern metadata: it reads one static
//! `Patterns.json` document and falls back to an empty store whenever that
//! document cannot be fetched or understood.

use std::collections::BTreeMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
#[cfg(feature = "remote")]
use url::Url;

/// Location of the metadata document relative to the site root
pub const PATTERNS_JSON_PATH: &str = "/Patterns.json";

/// Version reported by an empty store
pub const DEFAULT_STORAGE_VERSION: &str = "1.0.0";

/// Describes one saved annotation template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatternMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

/// All known patterns, versioned as a whole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMetadataStorage {
    #[serde(default)]
    pub patterns: BTreeMap<String, PatternMetadata>,
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for PatternMetadataStorage {
    fn default() -> Self {
        Self {
            patterns: BTreeMap::new(),
            version: default_version(),
        }
    }
}

fn default_version() -> String {
    DEFAULT_STORAGE_VERSION.to_string()
}

/// Read access to pattern metadata
///
/// Implementations never fail: every error degrades to an empty store.
#[async_trait]
pub trait PatternStore: Send + Sync {
    /// Load the whole store
    async fn load(&self) -> PatternMetadataStorage;

    /// Look up a single pattern; `None` when unknown or when loading failed
    async fn get_pattern_info(&self, pattern_id: &str) -> Option<PatternMetadata> {
        self.load().await.patterns.remove(pattern_id)
    }

    /// Drop patterns that are no longer referenced by any annotation
    async fn cleanup_empty_patterns(&self, active_pattern_ids: &[String]);
}

/// Where the metadata document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSource {
    #[cfg(feature = "remote")]
    Http(Url),
    File(PathBuf),
}

impl fmt::Display for PatternSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "remote")]
            PatternSource::Http(url) => write!(f, "{url}"),
            PatternSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Read-only store backed by a static `Patterns.json`
///
/// Every call to [`PatternStore::load`] reads the document again; nothing is
/// cached and concurrent calls are independent.
#[derive(Debug, Clone)]
pub struct DisplayPatternStore {
    source: PatternSource,
    #[cfg(feature = "remote")]
    client: reqwest::Client,
}

impl DisplayPatternStore {
    pub fn new(source: PatternSource) -> Result<Self> {
        Ok(Self {
            source,
            #[cfg(feature = "remote")]
            client: reqwest::Client::builder()
                .user_agent(format!("paperlens-core/{}", env!("CARGO_PKG_VERSION")))
                .build()
                .context("failed to create HTTP client")?,
        })
    }

    /// Store reading `{base_url}/Patterns.json`
    #[cfg(feature = "remote")]
    pub fn from_base_url(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("invalid base URL: {base_url}"))?;
        let url = base
            .join(PATTERNS_JSON_PATH)
            .with_context(|| format!("cannot resolve {PATTERNS_JSON_PATH} against {base}"))?;
        Self::new(PatternSource::Http(url))
    }

    /// Store reading a local copy of the document
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(PatternSource::File(path.into()))
    }

    pub fn source(&self) -> &PatternSource {
        &self.source
    }

    /// `Ok(None)` when the document is simply not there
    async fn fetch_document(&self) -> Result<Option<PatternMetadataStorage>> {
        let body: JsonValue = match &self.source {
            #[cfg(feature = "remote")]
            PatternSource::Http(url) => {
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .with_context(|| format!("failed to fetch {url}"))?;

                let status = response.status();
                if !status.is_success() {
                    tracing::warn!(%url, %status, "pattern metadata not available");
                    return Ok(None);
                }

                response
                    .json()
                    .await
                    .with_context(|| format!("failed to parse response body from {url}"))?
            }
            PatternSource::File(path) => {
                let text = match tokio::fs::read_to_string(path).await {
                    Ok(text) => text,
                    Err(err) if err.kind() == ErrorKind::NotFound => {
                        tracing::warn!(path = %path.display(), "pattern metadata file not found");
                        return Ok(None);
                    }
                    Err(err) => {
                        return Err(err)
                            .with_context(|| format!("failed to read {}", path.display()));
                    }
                };
                serde_json::from_str(&text)
                    .with_context(|| format!("failed to parse {}", path.display()))?
            }
        };

        storage_from_value(body).map(Some)
    }
}

#[async_trait]
impl PatternStore for DisplayPatternStore {
    async fn load(&self) -> PatternMetadataStorage {
        match self.fetch_document().await {
            Ok(Some(storage)) => storage,
            Ok(None) => PatternMetadataStorage::default(),
            Err(err) => {
                tracing::error!(
                    source = %self.source,
                    error = %format!("{err:#}"),
                    "error loading pattern metadata"
                );
                PatternMetadataStorage::default()
            }
        }
    }

    async fn cleanup_empty_patterns(&self, active_pattern_ids: &[String]) {
        // Read-only build: nothing to remove
        tracing::info!(
            active = ?active_pattern_ids,
            "cleanup would remove patterns not in the active set"
        );
    }
}

fn storage_from_value(value: JsonValue) -> Result<PatternMetadataStorage> {
    if !value.is_object() {
        bail!("pattern metadata must be a JSON object");
    }
    serde_json::from_value(value).context("unexpected pattern metadata shape")
}

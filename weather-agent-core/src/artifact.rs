//! Persistence of weather reports as host-managed artifacts.

use std::{collections::BTreeMap, fmt::Debug, path::PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const JSON_MIME_TYPE: &str = "application/json";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Artifact rejected: {0}")]
    Rejected(String),
}

/// Who an artifact belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactScope {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

#[derive(Debug, Clone)]
pub struct ArtifactRequest {
    pub scope: ArtifactScope,
    pub filename: String,
    pub mime_type: String,
    pub content: Vec<u8>,
    pub metadata: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl ArtifactRequest {
    /// Pretty-printed JSON artifact named `<base>_<YYYYmmdd_HHMMSS>.json`.
    pub fn json<T: Serialize>(
        scope: ArtifactScope,
        base: &str,
        value: &T,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ArtifactError> {
        Ok(Self {
            scope,
            filename: format!("{base}_{}.json", timestamp.format("%Y%m%d_%H%M%S")),
            mime_type: JSON_MIME_TYPE.to_string(),
            content: serde_json::to_vec_pretty(value)?,
            metadata: BTreeMap::new(),
            timestamp,
        })
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactReceipt {
    pub status: String,
    /// Where the store put the artifact, if it exposes that.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync + Debug {
    async fn save(&self, request: ArtifactRequest) -> Result<ArtifactReceipt, ArtifactError>;
}

/// Stores artifacts under `<root>/<app>/<user>/<session>/` with a `.meta.json` sidecar.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

#[derive(Debug, Serialize)]
struct Sidecar<'a> {
    filename: &'a str,
    mime_type: &'a str,
    size: usize,
    timestamp: DateTime<Utc>,
    scope: &'a ArtifactScope,
    metadata: &'a BTreeMap<String, String>,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn dir_for(&self, scope: &ArtifactScope) -> PathBuf {
        self.root
            .join(sanitize_component(&scope.app_name))
            .join(sanitize_component(&scope.user_id))
            .join(sanitize_component(&scope.session_id))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn save(&self, request: ArtifactRequest) -> Result<ArtifactReceipt, ArtifactError> {
        if request.filename.trim().is_empty() {
            return Err(ArtifactError::Rejected("empty filename".to_string()));
        }

        let dir = self.dir_for(&request.scope);
        tokio::fs::create_dir_all(&dir).await?;

        let filename = sanitize_component(&request.filename);
        let path = dir.join(&filename);
        tokio::fs::write(&path, &request.content).await?;

        let sidecar = Sidecar {
            filename: &filename,
            mime_type: &request.mime_type,
            size: request.content.len(),
            timestamp: request.timestamp,
            scope: &request.scope,
            metadata: &request.metadata,
        };
        let meta_path = dir.join(format!("{filename}.meta.json"));
        tokio::fs::write(&meta_path, serde_json::to_vec_pretty(&sidecar)?).await?;

        debug!(path = %path.display(), "Artifact written");

        Ok(ArtifactReceipt {
            status: "success".to_string(),
            uri: Some(path.display().to_string()),
        })
    }
}

/// Make a string safe as a single path component.
fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ',') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}

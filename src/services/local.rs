use crate::models::{Listing, Profile};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

const PROFILES_FILE: &str = "profiles.json";
const LISTINGS_FILE: &str = "listings.json";

/// Errors reading the local data directory
#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Profile and listing source backed by JSON files in a directory
///
/// Expects `profiles.json` and `listings.json`, each a JSON array. A missing
/// file reads as an empty pool. Profiles are normalized on load.
#[derive(Debug, Clone)]
pub struct LocalJsonStore {
    data_dir: PathBuf,
}

impl LocalJsonStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    async fn read_array<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, LocalStoreError> {
        let path = self.data_dir.join(file);
        let path_str = path.display().to_string();

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("{} not found, treating as empty", path_str);
                return Ok(Vec::new());
            }
            Err(source) => return Err(LocalStoreError::Io { path: path_str, source }),
        };

        serde_json::from_slice(&bytes).map_err(|source| LocalStoreError::Json { path: path_str, source })
    }

    pub async fn fetch_all_profiles(&self) -> Result<Vec<Profile>, LocalStoreError> {
        let profiles: Vec<Profile> = self.read_array(PROFILES_FILE).await?;
        tracing::debug!("Loaded {} profiles from {}", profiles.len(), self.data_dir.display());
        Ok(profiles)
    }

    pub async fn fetch_all_listings(&self) -> Result<Vec<Listing>, LocalStoreError> {
        let listings: Vec<Listing> = self.read_array(LISTINGS_FILE).await?;
        tracing::debug!("Loaded {} listings from {}", listings.len(), self.data_dir.display());
        Ok(listings)
    }

    pub async fn fetch_by_id(&self, id: &str) -> Result<Option<Profile>, LocalStoreError> {
        Ok(self
            .fetch_all_profiles()
            .await?
            .into_iter()
            .find(|p| p.id.as_deref() == Some(id)))
    }
}

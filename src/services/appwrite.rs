use crate::models::{Listing, Profile};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Documents requested per list call
const PAGE_SIZE: usize = 100;

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid API key or project")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub profiles: String,
    pub listings: String,
}

/// Appwrite document store client
///
/// Read-only source of seeker profiles and room listings:
/// - Listing all profiles (normalized on load)
/// - Listing all room listings
/// - Fetching one profile by document id
pub struct AppwriteClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
}

impl AppwriteClient {
    /// Create a new Appwrite client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
    ) -> Result<Self, AppwriteError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
        })
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            collection
        )
    }

    async fn get_json(&self, url: &str) -> Result<Value, AppwriteError> {
        let response = self
            .client
            .get(url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppwriteError::Unauthorized),
            StatusCode::NOT_FOUND => Err(AppwriteError::NotFound(url.to_string())),
            status => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read body".to_string());
                tracing::error!("Appwrite request failed: {} - {}", status, body);
                Err(AppwriteError::ApiError(format!("{} from {}", status, url)))
            }
        }
    }

    /// Page through every document of a collection
    async fn list_documents<T: DeserializeOwned>(
        &self,
        collection: &str,
    ) -> Result<Vec<T>, AppwriteError> {
        let base = self.documents_url(collection);
        let mut items = Vec::new();
        let mut offset = 0usize;

        loop {
            let queries = [format!("limit({})", PAGE_SIZE), format!("offset({})", offset)];
            let query_string = queries
                .iter()
                .map(|q| format!("queries[]={}", urlencoding::encode(q)))
                .collect::<Vec<_>>()
                .join("&");

            let json = self.get_json(&format!("{}?{}", base, query_string)).await?;

            let total = json.get("total").and_then(|t| t.as_u64()).unwrap_or(0) as usize;
            let documents = json
                .get("documents")
                .and_then(|d| d.as_array())
                .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))?;

            let page_len = documents.len();
            let before = items.len();
            items.extend(documents.iter().filter_map(|doc| document_body::<T>(doc)));

            if items.len() - before < page_len {
                tracing::warn!(
                    "Skipped {} malformed documents in {}",
                    page_len - (items.len() - before),
                    collection
                );
            }

            offset += page_len;
            if page_len < PAGE_SIZE || offset >= total {
                break;
            }
        }

        tracing::debug!("Listed {} documents from {}", items.len(), collection);
        Ok(items)
    }

    /// Fetch every seeker profile
    pub async fn list_profiles(&self) -> Result<Vec<Profile>, AppwriteError> {
        self.list_documents(&self.collections.profiles).await
    }

    /// Fetch every room listing
    pub async fn list_listings(&self) -> Result<Vec<Listing>, AppwriteError> {
        self.list_documents(&self.collections.listings).await
    }

    /// Get a single profile by document id; `None` when it does not exist
    pub async fn get_profile(&self, id: &str) -> Result<Option<Profile>, AppwriteError> {
        let url = format!(
            "{}/{}",
            self.documents_url(&self.collections.profiles),
            urlencoding::encode(id)
        );

        tracing::debug!("Fetching profile {}", id);

        match self.get_json(&url).await {
            Ok(doc) => document_body(&doc).map(Some).ok_or_else(|| {
                AppwriteError::InvalidResponse(format!("Failed to parse profile {}", id))
            }),
            Err(AppwriteError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Document payload, possibly nested under `data`, with `$id` standing in
/// for a missing `id`
fn document_body<T: DeserializeOwned>(doc: &Value) -> Option<T> {
    let mut body = doc.get("data").unwrap_or(doc).clone();
    if let (Some(obj), Some(doc_id)) = (body.as_object_mut(), doc.get("$id").cloned()) {
        if !obj.contains_key("id") {
            obj.insert("id".to_string(), doc_id);
        }
    }
    serde_json::from_value(body).ok()
}

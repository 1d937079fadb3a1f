use crate::config::IngestionConfig;
use crate::ingestion::error::{IngestionError, IngestionResult};
use crate::models::Record;
use crate::state::DocumentStore;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use validator::Validate;

/// Request to ingest a JSON document from a URL
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestRequest {
    #[validate(url)]
    pub url: String,

    #[validate(length(min = 1, max = 255))]
    pub technology: String,

    #[serde(default)]
    pub version: Option<String>,
}

/// Fetches documents and stores them as records
#[derive(Clone)]
pub struct IngestionService {
    client: Client,
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl IngestionService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        config: &IngestionConfig,
    ) -> IngestionResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| IngestionError::Validation(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            store,
            collection: collection.into(),
        })
    }

    /// Fetch `request.url`, decode it as JSON and store it as a new record
    pub async fn ingest_url(&self, request: &IngestRequest) -> IngestionResult<Record> {
        request.validate()?;
        if request.technology.trim().is_empty() {
            return Err(IngestionError::Validation(
                "technology must not be blank".to_string(),
            ));
        }

        let content = self.fetch(&request.url).await.map_err(|e| {
            error!(url = %request.url, error = %e, "Document fetch failed");
            e
        })?;

        self.ingest_document(&request.technology, request.version.clone(), content)
            .await
    }

    /// Store an in-hand JSON document as a new record
    pub async fn ingest_document(
        &self,
        technology: &str,
        version: Option<String>,
        content: Value,
    ) -> IngestionResult<Record> {
        let technology = technology.trim();
        if technology.is_empty() {
            return Err(IngestionError::Validation(
                "technology must not be blank".to_string(),
            ));
        }

        let record = Record::new(technology, version, content);
        let document = record.to_document()?;
        self.store
            .insert_one(&self.collection, &record.id, &document)
            .await?;

        info!(
            id = %record.id,
            technology = %record.technology,
            version = %record.version,
            "Record ingested"
        );
        Ok(record)
    }

    async fn fetch(&self, url: &str) -> IngestionResult<Value> {
        let fetch_error = |message: String| IngestionError::Fetch {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| IngestionError::Decode(e.to_string()))
    }
}

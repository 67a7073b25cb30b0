//! Input providers for raw category and document collections.
//!
//! Providers return untyped JSON records; shape checking happens in
//! [`crate::schema`] so every provider gets the same tolerance rules.

use std::path::{Path, PathBuf};

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{ArchiveConfig, SourceKind};
use crate::error::SourceError;

/// A provider of category and document records.
#[async_trait::async_trait]
pub trait ArchiveSource: Send + Sync {
    fn name(&self) -> &str;
    async fn categories(&self) -> Result<Vec<Value>, SourceError>;
    async fn documents(&self) -> Result<Vec<Value>, SourceError>;
}

/// Build the provider selected by the config.
pub fn from_config(config: &ArchiveConfig) -> Result<Box<dyn ArchiveSource>, SourceError> {
    match config.source {
        SourceKind::Rest => {
            let base_url = config
                .api_url
                .clone()
                .ok_or_else(|| SourceError::Misconfigured("rest source needs api_url".to_string()))?;
            Ok(Box::new(RestSource {
                client: Client::new(),
                base_url,
                token: config.api_token.clone(),
                categories_endpoint: config.categories_endpoint.clone(),
                documents_endpoint: config.documents_endpoint.clone(),
            }))
        }
        SourceKind::File => Ok(Box::new(FileSource::new(
            config.categories_path.clone(),
            config.documents_path.clone(),
        ))),
    }
}

/// Reads both collections from the CMS REST backend.
#[derive(Clone)]
pub struct RestSource {
    client: Client,
    base_url: String,
    token: Option<String>,
    categories_endpoint: String,
    documents_endpoint: String,
}

impl RestSource {
    async fn get_records(&self, endpoint: &str) -> Result<Vec<Value>, SourceError> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        let mut req = self.client.get(&url).header("Accept", "application/json");
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                endpoint: endpoint.to_string(),
                status,
                body,
            });
        }

        let payload: Value = resp.json().await?;
        let records = unwrap_records(payload, endpoint)?;
        debug!("GET {}: {} records", url, records.len());
        Ok(records)
    }
}

#[async_trait::async_trait]
impl ArchiveSource for RestSource {
    fn name(&self) -> &str {
        "rest"
    }

    async fn categories(&self) -> Result<Vec<Value>, SourceError> {
        self.get_records(&self.categories_endpoint).await
    }

    async fn documents(&self) -> Result<Vec<Value>, SourceError> {
        self.get_records(&self.documents_endpoint).await
    }
}

/// Reads both collections from local JSON files.
#[derive(Debug, Clone)]
pub struct FileSource {
    categories_path: PathBuf,
    documents_path: PathBuf,
}

impl FileSource {
    pub fn new(categories_path: PathBuf, documents_path: PathBuf) -> Self {
        Self {
            categories_path,
            documents_path,
        }
    }

    async fn read_records(path: &Path) -> Result<Vec<Value>, SourceError> {
        let content = tokio::fs::read_to_string(path).await?;
        let payload: Value = serde_json::from_str(&content)?;
        let records = unwrap_records(payload, &path.display().to_string())?;
        info!("Read {} records from {:?}", records.len(), path);
        Ok(records)
    }
}

#[async_trait::async_trait]
impl ArchiveSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn categories(&self) -> Result<Vec<Value>, SourceError> {
        Self::read_records(&self.categories_path).await
    }

    async fn documents(&self) -> Result<Vec<Value>, SourceError> {
        Self::read_records(&self.documents_path).await
    }
}

/// Accept a bare array or an object wrapping it under `results` or `data`.
fn unwrap_records(payload: Value, origin: &str) -> Result<Vec<Value>, SourceError> {
    match payload {
        Value::Array(records) => Ok(records),
        Value::Object(mut obj) => match obj.remove("results").or_else(|| obj.remove("data")) {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(SourceError::UnexpectedShape(origin.to_string())),
        },
        _ => Err(SourceError::UnexpectedShape(origin.to_string())),
    }
}

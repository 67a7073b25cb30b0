//! Host configuration.
//!
//! Read from a JSON file when `ARCHIVE_CONFIG` is set, otherwise from
//! `ARCHIVE_*` environment variables (a `.env` file is honoured by `main`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Rest,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default = "default_source")]
    pub source: SourceKind,
    /// Base URL of the REST backend, e.g. `https://cms.example.org/api`.
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_categories_endpoint")]
    pub categories_endpoint: String,
    #[serde(default = "default_documents_endpoint")]
    pub documents_endpoint: String,
    #[serde(default = "default_categories_path")]
    pub categories_path: PathBuf,
    #[serde(default = "default_documents_path")]
    pub documents_path: PathBuf,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_source() -> SourceKind {
    SourceKind::File
}

fn default_categories_endpoint() -> String {
    "archive/categories/".to_string()
}

fn default_documents_endpoint() -> String {
    "archive/documents/".to_string()
}

fn default_categories_path() -> PathBuf {
    PathBuf::from("data/categories.json")
}

fn default_documents_path() -> PathBuf {
    PathBuf::from("data/documents.json")
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            api_url: None,
            api_token: None,
            categories_endpoint: default_categories_endpoint(),
            documents_endpoint: default_documents_endpoint(),
            categories_path: default_categories_path(),
            documents_path: default_documents_path(),
            listen_addr: default_listen_addr(),
        }
    }
}

impl ArchiveConfig {
    /// `ARCHIVE_CONFIG` file if set, else environment variables.
    pub fn load() -> Result<Self> {
        match std::env::var("ARCHIVE_CONFIG") {
            Ok(path) => Self::load_from_file(Path::new(&path)),
            Err(_) => Self::from_lookup(|key| std::env::var(key).ok()),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: ArchiveConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        config.validate()?;
        info!("Loaded archive config from {:?}", path);
        Ok(config)
    }

    /// Build from a key lookup keyed by `ARCHIVE_*` variable names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(source) = lookup("ARCHIVE_SOURCE") {
            config.source = match source.as_str() {
                "rest" => SourceKind::Rest,
                "file" => SourceKind::File,
                other => anyhow::bail!("Unknown ARCHIVE_SOURCE: {} (expected rest|file)", other),
            };
        }
        config.api_url = lookup("ARCHIVE_API_URL").or(config.api_url);
        config.api_token = lookup("ARCHIVE_API_TOKEN").or(config.api_token);
        if let Some(v) = lookup("ARCHIVE_CATEGORIES_ENDPOINT") {
            config.categories_endpoint = v;
        }
        if let Some(v) = lookup("ARCHIVE_DOCUMENTS_ENDPOINT") {
            config.documents_endpoint = v;
        }
        if let Some(v) = lookup("ARCHIVE_CATEGORIES_PATH") {
            config.categories_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ARCHIVE_DOCUMENTS_PATH") {
            config.documents_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ARCHIVE_LISTEN_ADDR") {
            config.listen_addr = v;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.source == SourceKind::Rest && self.api_url.is_none() {
            anyhow::bail!("ARCHIVE_API_URL is required when the source is rest");
        }
        Ok(())
    }
}

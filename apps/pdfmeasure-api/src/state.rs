//! Application state: the single "current document" and service settings

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use pdfmeasure_core::PdfDocument;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApiError;

/// Where `/table-of-contents` gets its entries from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TocSource {
    /// Always answer with the fixed placeholder entry
    Fixed,
    /// Read the bookmarks of the uploaded document
    Outline,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub toc_source: TocSource,
    pub max_upload_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            toc_source: TocSource::Fixed,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

/// A successfully parsed upload
#[derive(Debug)]
pub struct LoadedDocument {
    pub id: Uuid,
    pub file_name: String,
    pub sha256: String,
    pub size_bytes: usize,
    pub loaded_at: DateTime<Utc>,
    pub pdf: PdfDocument,
}

impl LoadedDocument {
    pub fn parse(file_name: String, bytes: &[u8]) -> Result<Self, ApiError> {
        let pdf = PdfDocument::from_bytes(bytes)?;

        Ok(Self {
            id: Uuid::new_v4(),
            file_name,
            sha256: hex::encode(Sha256::digest(bytes)),
            size_bytes: bytes.len(),
            loaded_at: Utc::now(),
            pdf,
        })
    }
}

pub struct AppState {
    pub config: ServiceConfig,
    current: RwLock<Option<Arc<LoadedDocument>>>,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            current: RwLock::new(None),
        }
    }

    /// The current document, or `NoDocument` before the first successful upload
    pub async fn current(&self) -> Result<Arc<LoadedDocument>, ApiError> {
        self.current.read().await.clone().ok_or(ApiError::NoDocument)
    }

    /// Swap in a new current document, returning the one it replaced
    pub async fn replace(&self, document: LoadedDocument) -> Option<Arc<LoadedDocument>> {
        let mut slot = self.current.write().await;
        slot.replace(Arc::new(document))
    }
}

//! Request and response bodies

use chrono::{DateTime, Utc};
use pdfmeasure_core::{PageGeometry, Point};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub document_id: Uuid,
    pub page_count: u32,
}

/// Two points on a page, sent either as query parameters or as a JSON body
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MeasureRequest {
    /// Zero-based page index; negative values count back from the last page
    #[serde(default)]
    pub page_num: i64,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl MeasureRequest {
    pub fn points(&self) -> (Point, Point) {
        (Point::new(self.x1, self.y1), Point::new(self.x2, self.y2))
    }
}

/// Metadata about the current document
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub id: Uuid,
    pub file_name: String,
    pub sha256: String,
    pub size_bytes: usize,
    pub page_count: u32,
    pub pdf_version: String,
    pub loaded_at: DateTime<Utc>,
    pub first_page: PageGeometry,
}

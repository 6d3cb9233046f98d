//! HTTP handlers for the PDF measurement API

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use pdfmeasure_core::{extract_outline, measure, placeholder_toc, Measurement, PageDimensions, TocEntry};

use crate::error::ApiError;
use crate::models::*;
use crate::state::{AppState, LoadedDocument, TocSource};

/// Multipart field carrying the PDF
const UPLOAD_FIELD: &str = "file";

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pdfmeasure-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Upload a PDF and make it the current document
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Failed to read upload: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            tracing::debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "upload.pdf".to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to read file data: {}", e)))?;

        tracing::debug!("Received '{}' ({} bytes)", file_name, data.len());

        // Parsing is CPU bound, keep it off the async workers
        let document = tokio::task::spawn_blocking(move || LoadedDocument::parse(file_name, &data))
            .await
            .map_err(|e| ApiError::Internal(e.into()))??;

        let document_id = document.id;
        let page_count = document.pdf.page_count();

        tracing::info!(
            "Loaded '{}' as {}: {} pages, sha256 {}",
            document.file_name,
            document_id,
            page_count,
            document.sha256
        );

        if let Some(previous) = state.replace(document).await {
            tracing::debug!("Replaced document {} ('{}')", previous.id, previous.file_name);
        }

        return Ok(Json(UploadResponse {
            message: "PDF loaded successfully".to_string(),
            document_id,
            page_count,
        }));
    }

    Err(ApiError::InvalidRequest(format!(
        "Missing multipart field '{}'",
        UPLOAD_FIELD
    )))
}

/// Width and height of a zero-based page of the current document.
///
/// Negative indices count back from the last page. A missing document is
/// reported before a malformed page number.
pub async fn dimensions(
    State(state): State<Arc<AppState>>,
    Path(page_num): Path<String>,
) -> Result<Json<PageDimensions>, ApiError> {
    let document = state.current().await?;
    let index = parse_page_num(&page_num)?;
    let page = document.pdf.resolve_page_index(index)?;
    Ok(Json(document.pdf.page_dimensions(page)?))
}

fn parse_page_num(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::InvalidRequest(format!("Invalid page number: '{}'", raw)))
}

/// Measure the distance between two points on a page of the current document
pub async fn measure_element(
    State(state): State<Arc<AppState>>,
    query: Option<Query<MeasureRequest>>,
    body: Option<Json<MeasureRequest>>,
) -> Result<Json<Measurement>, ApiError> {
    let document = state.current().await?;

    let req = match (query, body) {
        (Some(Query(req)), _) => req,
        (None, Some(Json(req))) => req,
        (None, None) => {
            return Err(ApiError::InvalidRequest(
                "Expected page_num, x1, y1, x2 and y2 as query parameters or a JSON body"
                    .to_string(),
            ))
        }
    };

    // Only checks that the page exists; points are measured in the caller's units
    let page = document.pdf.resolve_page_index(req.page_num)?;

    let (a, b) = req.points();
    let measurement = measure(a, b)?;

    tracing::debug!(
        "Measured page {} ({}, {}) -> ({}, {}): {:?}",
        page,
        req.x1,
        req.y1,
        req.x2,
        req.y2,
        measurement
    );

    Ok(Json(measurement))
}

/// Table of contents of the current document
pub async fn table_of_contents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TocEntry>>, ApiError> {
    let document = state.current().await?;

    let toc = match state.config.toc_source {
        TocSource::Fixed => placeholder_toc(),
        TocSource::Outline => extract_outline(&document.pdf),
    };

    Ok(Json(toc))
}

/// Metadata of the current document
pub async fn document_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DocumentInfo>, ApiError> {
    let document = state.current().await?;
    let first_page = document.pdf.page_geometry(0)?;

    Ok(Json(DocumentInfo {
        id: document.id,
        file_name: document.file_name.clone(),
        sha256: document.sha256.clone(),
        size_bytes: document.size_bytes,
        page_count: document.pdf.page_count(),
        pdf_version: document.pdf.version().to_string(),
        loaded_at: document.loaded_at,
        first_page,
    }))
}

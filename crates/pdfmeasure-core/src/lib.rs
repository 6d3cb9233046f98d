//! PDF page geometry and measurement
//!
//! This crate holds everything the measurement service does with a PDF:
//! - `PdfDocument`: parse uploaded bytes, resolve page boxes and rotation
//! - `measure`: width, height and diagonal between two points
//! - `extract_outline` / `placeholder_toc`: table of contents entries

pub mod document;
pub mod error;
pub mod geometry;
pub mod outline;

pub use document::{PageBox, PageDimensions, PageGeometry, PdfDocument};
pub use error::{MeasureError, Result};
pub use geometry::{measure, Measurement, Point};
pub use outline::{extract_outline, placeholder_toc, TocEntry};

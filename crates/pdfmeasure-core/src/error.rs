use thiserror::Error;

pub type Result<T> = std::result::Result<T, MeasureError>;

#[derive(Error, Debug)]
pub enum MeasureError {
    #[error("Failed to parse PDF: {0}")]
    InvalidPdf(String),

    #[error("Page {page} out of bounds (total: {total})")]
    PageOutOfBounds { page: i64, total: u32 },

    #[error("Invalid page box: {0}")]
    InvalidPageBox(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

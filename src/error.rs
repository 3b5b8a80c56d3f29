// File: src/error.rs
use crate::core::types::Category;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate endpoint returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Unknown unit '{unit}' for {category}")]
    UnknownUnit { category: Category, unit: String },

    #[error("Converting {from} to {to} ({category}) is out of range")]
    OutOfRange {
        category: Category,
        from: String,
        to: String,
    },

    #[error("Could not find a valid home/data directory")]
    NoDataDir,
}

pub type Result<T> = std::result::Result<T, Error>;

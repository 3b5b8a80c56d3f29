// src/lib.rs

pub mod clock;
pub mod config;
pub mod core;
pub mod error;
pub mod history;
pub mod persistence;
pub mod rates;
pub mod settings;
pub mod view;

pub use crate::config::Config;
pub use crate::core::engine::ConverterEngine;
pub use crate::core::types::Category;
pub use crate::error::{Error, Result};

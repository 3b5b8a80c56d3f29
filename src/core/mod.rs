// src/core/mod.rs

pub mod catalog;
pub mod converter;
pub mod debounce;
pub mod engine;
pub mod types;

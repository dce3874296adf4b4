//! Browser-facing PDF upload service.
//!
//! Uploads arrive as multipart forms, are validated by the [`upload`] stage
//! and land as records in a [`storage::FileStore`] document collection, payload
//! included. [`routes::router`] wires the pages and endpoints around a store
//! handle built once at startup.

pub mod config;
pub mod errors;
pub mod pages;
pub mod routes;
pub mod storage;
pub mod upload;

pub use config::AppConfig;
pub use routes::{AppState, router};

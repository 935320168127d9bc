//! Bibliotheca Library Catalog Server
//!
//! Authors, books and users behind a GraphQL API, with borrow and return
//! operations that keep every book's available-copy count consistent under
//! concurrent use.

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<services::Services>,
    pub schema: api::LibrarySchema,
    /// Used by the readiness check
    pub pool: Pool<Postgres>,
}

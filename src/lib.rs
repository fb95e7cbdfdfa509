//! Lending server
//!
//! REST JSON API for a small library: members register and request books,
//! administrators manage the catalog and approve, reject and close loans.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use api::create_router;
pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    pub fn new(config: AppConfig, services: services::Services) -> Self {
        AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}

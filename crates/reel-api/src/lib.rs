//! Axum HTTP API server.
//!
//! This crate provides:
//! - Run creation endpoints for clip and script mode
//! - Server-sent progress streams with last-state replay
//! - Run snapshots, health checks and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;

//! kubeassist API Module
//!
//! HTTP surface for the cluster assistant: one query endpoint consumed by
//! the UI plus health checks.

pub mod handlers;
pub mod models;
pub mod server;

pub use handlers::ApiState;
pub use models::{ApiConfig, ErrorBody, HealthResponse, QueryRequest};
pub use server::{create_router, ApiServer};

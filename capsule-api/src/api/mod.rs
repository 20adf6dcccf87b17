//! HTTP API handlers for capsule-api

pub mod catalog;
pub mod cors;
pub mod health;
pub mod sign;

pub use catalog::get_catalog;
pub use cors::{cors_headers, preflight};
pub use health::health_routes;
pub use sign::sign_url;

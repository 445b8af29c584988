//! HTTP API handlers for tagscan-server
//!
//! - `POST /api/scan`: batch submission
//! - `GET /api/tags/stream`: live new-tag stream (SSE)
//! - `GET /health`

pub mod auth;
pub mod health;
pub mod live;
pub mod scan;

pub use auth::AuthenticatedUser;
pub use health::health_routes;
pub use live::live_routes;
pub use scan::scan_routes;

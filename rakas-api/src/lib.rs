//! Rakas HTTP surface
//!
//! JSON API for resolution, the manifest/segment streaming proxy, dead-link
//! reports and the admin telemetry surface.

pub mod http;

pub use http::{create_router, AppState};

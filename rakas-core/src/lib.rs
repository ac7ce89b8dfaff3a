//! Rakas core: resolution engine, cache, network shaping, telemetry and the
//! background refresh loop.

pub mod alert;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod network;
pub mod resolver;
pub mod telemetry;

pub use config::{load_config, Config};
pub use error::{Error, Result};

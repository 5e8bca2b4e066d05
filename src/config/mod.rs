//! Configuration constants and structures for poolmap
//!
//! This module centralizes tunables, error codes and the environment-driven
//! application settings so behavior can be adjusted in one place.

pub mod errors;
pub mod limits;
pub mod settings;
pub mod timeouts;

pub use settings::AppConfig;

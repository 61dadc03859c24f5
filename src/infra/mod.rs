//! Infrastructure layer: configuration, logging, and error surfaces.

pub mod config;
pub mod error;
pub mod logging;

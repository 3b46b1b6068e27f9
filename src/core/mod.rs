//! Core module - configuration and error types shared by every fleet component
//!
//! - [`config`] - [`FleetConfig`] and its nested retry/sync/agent sections
//! - [`error`] - one error enum per layer plus result aliases

pub mod config;
pub mod error;

pub use config::*;
pub use error::*;

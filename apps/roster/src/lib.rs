//! # roster
//!
//! HTTP server, CLI and configuration for the Roster records engine.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;

pub use error::AppError;

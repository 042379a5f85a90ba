//! # Application Errors
//!
//! Failures outside the records engine: configuration, files, sockets.

use crate::config::ConfigError;
use roster_core::{RosterError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid seed file: {0}")]
    Seed(String),
}

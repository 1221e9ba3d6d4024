use std::io;

use thiserror::Error;

use crate::{scope::HookError, store::StoreError};

/// Main error type for the leasehold crate.
///
/// Lease contention itself is not an error: claims report denial through
/// [`crate::lease::Claim`]. This enum covers setup failures that must reach
/// the host (store, interception, runtime, configuration) and the CLI's
/// reporting paths.
#[derive(Debug, Error)]
pub enum Error {
   /// I/O error occurred during file operations.
   #[error("io error: {0}")]
   Io(#[from] io::Error),

   /// Error reported by the shared store adapter.
   #[error("store error: {0}")]
   Store(#[from] StoreError),

   /// Navigation interception could not be installed.
   #[error("hook error: {0}")]
   Hook(#[from] HookError),

   /// Configuration-related error occurred.
   #[error("config error: {0}")]
   Config(#[from] ConfigError),

   /// JSON serialization or deserialization error occurred.
   #[error("json error: {0}")]
   Json(#[from] serde_json::Error),

   /// No async runtime is available to drive the heartbeat.
   #[error("no tokio runtime available for {0}")]
   Runtime(&'static str),

   /// The lease is held by another context.
   #[error("lease busy: held by {owner}")]
   Denied { owner: String },

   /// Error already reported to the user.
   #[error("{message}")]
   Reported { message: String, exit_code: i32 },
}

impl Error {
   pub fn exit_code(&self) -> i32 {
      match self {
         Self::Reported { exit_code, .. } => *exit_code,
         Self::Denied { .. } => 10,
         Self::Store(StoreError::Unavailable(_)) => 11,
         Self::Config(_) => 12,
         _ => 1,
      }
   }
}

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
   /// Configuration sources could not be merged or parsed.
   #[error("failed to load config: {0}")]
   Load(String),

   /// A configuration value is out of range or inconsistent.
   #[error("invalid config: {0}")]
   Invalid(String),
}

/// Standard result type using [`enum@Error`] as the default error type
pub type Result<T, E = Error> = std::result::Result<T, E>;

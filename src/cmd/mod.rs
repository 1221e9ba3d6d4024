//! CLI command implementations for leasehold.
//!
//! Each module corresponds to one subcommand. All of them operate on the
//! file-backed store under the configured `store_dir`.

pub mod hold;
pub mod release;
pub mod status;

use std::sync::Arc;

use crate::{
   Result, clock::SystemClock, config::Config, lease::LeaseCoordinator, store::FileStore,
};

fn open_coordinator(cfg: &Config) -> Result<LeaseCoordinator> {
   let store = FileStore::open(cfg.store_dir())?;
   Ok(LeaseCoordinator::new(Arc::new(store), Arc::new(SystemClock), &cfg.storage_key))
}

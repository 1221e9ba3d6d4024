//! Single-active-session leases over a shared key-value store.
//!
//! Contexts sharing one store contend for a named lease. The owner renews it
//! with a heartbeat; a lease silent for three heartbeats may be taken over.
//! [`session::SessionGuard`] binds the lease to a protected location scope.

pub mod clock;
pub mod cmd;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod lease;
pub mod scope;
pub mod session;
pub mod store;
pub mod util;

pub use error::{Error, Result};

//! Wall-clock sources for lease timestamps.

use std::sync::{
   Arc,
   atomic::{AtomicU64, Ordering},
};

use chrono::Utc;

/// Source of the current time in milliseconds since the Unix epoch.
///
/// Every context contending for a lease must read the same notion of time;
/// staleness is computed by the claimant against a timestamp the owner wrote.
pub trait Clock: Send + Sync {
   fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
   fn now_ms(&self) -> u64 {
      Utc::now().timestamp_millis().max(0) as u64
   }
}

/// Clock advanced by hand. Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
   now: Arc<AtomicU64>,
}

impl ManualClock {
   pub fn new(start_ms: u64) -> Self {
      Self { now: Arc::new(AtomicU64::new(start_ms)) }
   }

   pub fn set(&self, now_ms: u64) {
      self.now.store(now_ms, Ordering::SeqCst);
   }

   pub fn advance(&self, delta_ms: u64) {
      self.now.fetch_add(delta_ms, Ordering::SeqCst);
   }
}

impl Clock for ManualClock {
   fn now_ms(&self) -> u64 {
      self.now.load(Ordering::SeqCst)
   }
}

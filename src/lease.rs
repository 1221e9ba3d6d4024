//! Lease coordination (single owner + heartbeat liveness).
//!
//! A lease lives in two store entries: `<key>` holds the owner token and
//! `<key>:timestamp` holds the last renewal time in epoch milliseconds.
//! Liveness is read without touching ownership. A lease whose timestamp is
//! older than the staleness threshold may be taken over by any claimant.

use std::{fmt, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
   clock::Clock,
   store::{SharedStore, StoreError},
};

/// Consecutive missed heartbeats after which an owner is declared dead.
pub const MISSED_HEARTBEATS_BEFORE_TAKEOVER: u32 = 3;

pub const TIMESTAMP_SUFFIX: &str = ":timestamp";

/// Staleness threshold for a given heartbeat period.
pub fn stale_after(heartbeat_interval: Duration) -> Duration {
   heartbeat_interval * MISSED_HEARTBEATS_BEFORE_TAKEOVER
}

/// Opaque token identifying one contending context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
   pub fn generate() -> Self {
      Self(Uuid::new_v4().to_string())
   }

   pub fn as_str(&self) -> &str {
      &self.0
   }
}

impl From<&str> for OwnerId {
   fn from(value: &str) -> Self {
      Self(value.to_string())
   }
}

impl From<String> for OwnerId {
   fn from(value: String) -> Self {
      Self(value)
   }
}

impl fmt::Display for OwnerId {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(&self.0)
   }
}

/// Snapshot of the lease as currently stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaseRecord {
   pub owner_id:           String,
   pub last_renewed_at_ms: u64,
}

impl LeaseRecord {
   pub fn age(&self, now_ms: u64) -> Duration {
      Duration::from_millis(now_ms.saturating_sub(self.last_renewed_at_ms))
   }

   pub fn is_stale(&self, now_ms: u64, stale_after: Duration) -> bool {
      self.age(now_ms) > stale_after
   }
}

/// How a granted claim came about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
   /// No owner was recorded.
   Vacant,
   /// The caller already owned the lease.
   Reentrant,
   /// The previous owner stopped renewing and was displaced.
   Takeover { previous: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
   /// A live owner holds the lease.
   Held { owner: String, age: Duration },
   /// Another claimant wrote ownership between our read and our write.
   LostRace { winner: Option<String> },
   /// The store could not be read or written; fail closed.
   StoreUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
   Granted(Grant),
   Denied(DenyReason),
}

impl Claim {
   pub const fn is_granted(&self) -> bool {
      matches!(self, Self::Granted(_))
   }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Renewal {
   Renewed,
   /// The stored owner is someone else, or nobody.
   Lost { owner: Option<String> },
   /// The store failed; callers treat this as lost ownership.
   Failed,
}

/// Claim/renew/release state machine for one named lease.
#[derive(Clone)]
pub struct LeaseCoordinator {
   store:         Arc<dyn SharedStore>,
   clock:         Arc<dyn Clock>,
   owner_key:     String,
   timestamp_key: String,
}

impl fmt::Debug for LeaseCoordinator {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("LeaseCoordinator")
         .field("owner_key", &self.owner_key)
         .finish_non_exhaustive()
   }
}

impl LeaseCoordinator {
   pub fn new(store: Arc<dyn SharedStore>, clock: Arc<dyn Clock>, lease_key: &str) -> Self {
      Self {
         store,
         clock,
         owner_key: lease_key.to_string(),
         timestamp_key: format!("{lease_key}{TIMESTAMP_SUFFIX}"),
      }
   }

   /// Attempts to become (or stay) the owner.
   ///
   /// Granted when the lease is vacant, already ours, or its last renewal is
   /// strictly older than `stale_after`. Store failures deny.
   pub fn try_claim(&self, owner: &OwnerId, stale_after: Duration) -> Claim {
      match self.claim_inner(owner, stale_after) {
         Ok(claim) => {
            match &claim {
               Claim::Granted(Grant::Takeover { previous }) => tracing::info!(
                  key = %self.owner_key,
                  %owner,
                  previous = %previous,
                  "took over stale lease"
               ),
               Claim::Granted(_) => tracing::debug!(key = %self.owner_key, %owner, "lease claimed"),
               Claim::Denied(reason) => {
                  tracing::debug!(key = %self.owner_key, %owner, ?reason, "lease claim denied");
               },
            }
            claim
         },
         Err(err) => {
            tracing::warn!(key = %self.owner_key, %owner, "lease claim failed closed: {err}");
            Claim::Denied(DenyReason::StoreUnavailable)
         },
      }
   }

   fn claim_inner(&self, owner: &OwnerId, stale_after: Duration) -> Result<Claim, StoreError> {
      let now = self.clock.now_ms();
      let current = self.store.get(&self.owner_key)?;

      let grant = match current.as_deref() {
         None => Grant::Vacant,
         Some(existing) if existing == owner.as_str() => Grant::Reentrant,
         Some(existing) => {
            let record = LeaseRecord {
               owner_id:           existing.to_string(),
               last_renewed_at_ms: self.read_timestamp()?,
            };
            if !record.is_stale(now, stale_after) {
               let age = record.age(now);
               return Ok(Claim::Denied(DenyReason::Held { owner: record.owner_id, age }));
            }
            Grant::Takeover { previous: record.owner_id }
         },
      };

      if self.store.supports_conditional_writes() {
         if !self
            .store
            .compare_and_swap(&self.owner_key, current.as_deref(), owner.as_str())?
         {
            let winner = self.store.get(&self.owner_key)?;
            return Ok(Claim::Denied(DenyReason::LostRace { winner }));
         }
      } else {
         self.store.set(&self.owner_key, owner.as_str())?;
      }
      self.store.set(&self.timestamp_key, &now.to_string())?;

      // Read back: a claimant that wrote after us owns the lease.
      let stored = self.store.get(&self.owner_key)?;
      if stored.as_deref() != Some(owner.as_str()) {
         return Ok(Claim::Denied(DenyReason::LostRace { winner: stored }));
      }

      Ok(Claim::Granted(grant))
   }

   /// Refreshes the timestamp if `owner` still holds the lease.
   pub fn renew(&self, owner: &OwnerId) -> Renewal {
      let current = match self.store.get(&self.owner_key) {
         Ok(current) => current,
         Err(err) => {
            tracing::warn!(key = %self.owner_key, %owner, "lease renew failed: {err}");
            return Renewal::Failed;
         },
      };

      if current.as_deref() != Some(owner.as_str()) {
         tracing::warn!(key = %self.owner_key, %owner, current = ?current, "lease ownership lost");
         return Renewal::Lost { owner: current };
      }

      let now = self.clock.now_ms();
      match self.store.set(&self.timestamp_key, &now.to_string()) {
         Ok(()) => Renewal::Renewed,
         Err(err) => {
            tracing::warn!(key = %self.owner_key, %owner, "lease renew failed: {err}");
            Renewal::Failed
         },
      }
   }

   /// Deletes both entries if `owner` holds the lease. Returns whether
   /// anything was released.
   pub fn release(&self, owner: &OwnerId) -> bool {
      match self.store.get(&self.owner_key) {
         Ok(Some(current)) if current == owner.as_str() => {},
         Ok(_) => return false,
         Err(err) => {
            tracing::warn!(key = %self.owner_key, %owner, "lease release skipped: {err}");
            return false;
         },
      }

      if let Err(err) = self.store.remove(&self.owner_key) {
         tracing::warn!(key = %self.owner_key, %owner, "lease release failed: {err}");
         return false;
      }
      if let Err(err) = self.store.remove(&self.timestamp_key) {
         tracing::warn!(key = %self.timestamp_key, %owner, "lease timestamp not removed: {err}");
      }
      tracing::debug!(key = %self.owner_key, %owner, "lease released");
      true
   }

   /// Reads the stored lease without modifying it.
   pub fn inspect(&self) -> Result<Option<LeaseRecord>, StoreError> {
      let Some(owner_id) = self.store.get(&self.owner_key)? else {
         return Ok(None);
      };
      Ok(Some(LeaseRecord { owner_id, last_renewed_at_ms: self.read_timestamp()? }))
   }

   pub fn now_ms(&self) -> u64 {
      self.clock.now_ms()
   }

   /// Missing or unparseable timestamps read as the epoch, i.e. stale.
   fn read_timestamp(&self) -> Result<u64, StoreError> {
      Ok(self
         .store
         .get(&self.timestamp_key)?
         .and_then(|raw| raw.trim().parse::<u64>().ok())
         .unwrap_or(0))
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::{clock::ManualClock, store::MemoryStore};

   fn coordinator(store: &MemoryStore, clock: &ManualClock) -> LeaseCoordinator {
      LeaseCoordinator::new(Arc::new(store.clone()), Arc::new(clock.clone()), "editor")
   }

   #[test]
   fn stale_after_is_three_heartbeats() {
      assert_eq!(stale_after(Duration::from_millis(1000)), Duration::from_millis(3000));
   }

   #[test]
   fn reclaim_by_same_owner_is_reentrant() {
      let store = MemoryStore::new();
      let clock = ManualClock::new(0);
      let lease = coordinator(&store, &clock);
      let owner = OwnerId::from("a");

      assert_eq!(lease.try_claim(&owner, Duration::from_secs(3)), Claim::Granted(Grant::Vacant));
      clock.advance(50);
      assert_eq!(lease.try_claim(&owner, Duration::from_secs(3)), Claim::Granted(Grant::Reentrant));
      assert_eq!(store.get("editor:timestamp").unwrap().as_deref(), Some("50"));
   }

   #[test]
   fn threshold_is_exclusive() {
      let store = MemoryStore::new();
      let clock = ManualClock::new(0);
      let lease = coordinator(&store, &clock);
      let stale = Duration::from_millis(3000);
      assert!(lease.try_claim(&OwnerId::from("a"), stale).is_granted());

      clock.set(3000);
      assert!(!lease.try_claim(&OwnerId::from("b"), stale).is_granted());
      clock.set(3001);
      assert_eq!(
         lease.try_claim(&OwnerId::from("b"), stale),
         Claim::Granted(Grant::Takeover { previous: "a".to_string() })
      );
   }

   #[test]
   fn garbage_timestamp_reads_as_stale() {
      let store = MemoryStore::new();
      let clock = ManualClock::new(10_000);
      store.set("editor", "ghost").unwrap();
      store.set("editor:timestamp", "not-a-number").unwrap();
      let lease = coordinator(&store, &clock);
      assert!(lease.try_claim(&OwnerId::from("b"), Duration::from_secs(3)).is_granted());
   }

   #[test]
   fn renew_reports_foreign_owner() {
      let store = MemoryStore::new();
      let clock = ManualClock::new(0);
      let lease = coordinator(&store, &clock);
      lease.try_claim(&OwnerId::from("a"), Duration::from_secs(3));
      store.set("editor", "b").unwrap();

      assert_eq!(
         lease.renew(&OwnerId::from("a")),
         Renewal::Lost { owner: Some("b".to_string()) }
      );
      assert_eq!(store.get("editor:timestamp").unwrap().as_deref(), Some("0"));
   }

   #[test]
   fn inspect_reports_owner_and_age() {
      let store = MemoryStore::new();
      let clock = ManualClock::new(1_000);
      let lease = coordinator(&store, &clock);
      assert_eq!(lease.inspect().unwrap(), None);
      lease.try_claim(&OwnerId::from("a"), Duration::from_secs(3));
      clock.advance(400);
      let record = lease.inspect().unwrap().expect("record");
      assert_eq!(record.owner_id, "a");
      assert_eq!(record.age(lease.now_ms()), Duration::from_millis(400));
   }
}

mod support;

use std::{sync::Arc, time::Duration};

use leasehold::{
   clock::ManualClock,
   lease::{LeaseCoordinator, OwnerId, Renewal, stale_after},
   store::{MemoryStore, SharedStore},
};
use proptest::prelude::*;
use support::shared;

const CONTEXTS: usize = 4;

#[derive(Debug, Clone)]
enum Step {
   Claim(usize),
   Renew(usize),
   Release(usize),
   Sleep(u64),
   Check,
}

fn step() -> impl Strategy<Value = Step> {
   prop_oneof![
      (0..CONTEXTS).prop_map(Step::Claim),
      (0..CONTEXTS).prop_map(Step::Renew),
      (0..CONTEXTS).prop_map(Step::Release),
      (0u64..5_000).prop_map(Step::Sleep),
      Just(Step::Check),
   ]
}

proptest! {
   /// Contexts may stall between heartbeats and be taken over. Once every
   /// believer has run its heartbeat, at most one context still believes it
   /// is active, and that context is the stored owner.
   #[test]
   fn at_most_one_active_after_heartbeat_check(steps in prop::collection::vec(step(), 1..64)) {
      let store = MemoryStore::last_write_wins();
      let clock = ManualClock::new(0);
      let stale = stale_after(Duration::from_millis(1000));
      let owners: Vec<OwnerId> = (0..CONTEXTS).map(|i| OwnerId::from(format!("ctx-{i}"))).collect();
      let lease = LeaseCoordinator::new(shared(&store), Arc::new(clock.clone()), "editor");
      let mut active = [false; CONTEXTS];

      for step in steps {
         match step {
            Step::Claim(i) => active[i] = lease.try_claim(&owners[i], stale).is_granted(),
            Step::Renew(i) => {
               if active[i] {
                  active[i] = lease.renew(&owners[i]) == Renewal::Renewed;
               }
            },
            Step::Release(i) => {
               if active[i] {
                  lease.release(&owners[i]);
                  active[i] = false;
               }
            },
            Step::Sleep(ms) => clock.advance(ms),
            Step::Check => {
               for i in 0..CONTEXTS {
                  if active[i] && lease.renew(&owners[i]) != Renewal::Renewed {
                     active[i] = false;
                  }
               }

               let believers: Vec<usize> = (0..CONTEXTS).filter(|&i| active[i]).collect();
               prop_assert!(believers.len() <= 1, "multiple active contexts: {believers:?}");
               if let Some(&i) = believers.first() {
                  let stored = store.get("editor").unwrap();
                  prop_assert_eq!(stored.as_deref(), Some(owners[i].as_str()));
               }
            },
         }
      }
   }

   /// Releasing never removes a lease that belongs to someone else.
   #[test]
   fn release_only_clears_own_lease(holder in 0..CONTEXTS, other in 0..CONTEXTS) {
      prop_assume!(holder != other);
      let store = MemoryStore::new();
      let clock = ManualClock::new(0);
      let owners: Vec<OwnerId> = (0..CONTEXTS).map(|i| OwnerId::from(format!("ctx-{i}"))).collect();
      let lease = LeaseCoordinator::new(shared(&store), Arc::new(clock.clone()), "editor");

      prop_assert!(lease.try_claim(&owners[holder], Duration::from_secs(3)).is_granted());
      prop_assert!(!lease.release(&owners[other]));
      let stored = store.get("editor").unwrap();
      prop_assert_eq!(stored.as_deref(), Some(owners[holder].as_str()));
   }
}

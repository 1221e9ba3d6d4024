#![allow(dead_code, reason = "each test binary uses a different subset of the helpers")]

use std::sync::{
   Arc,
   atomic::{AtomicBool, AtomicUsize, Ordering},
};

use leasehold::{
   config::Config,
   session::HostUi,
   store::{MemoryStore, SharedStore, StoreError},
};
use parking_lot::Mutex;

/// Records every message shown to the user.
#[derive(Default)]
pub struct RecordingUi {
   messages: Mutex<Vec<String>>,
}

impl RecordingUi {
   pub fn messages(&self) -> Vec<String> {
      self.messages.lock().clone()
   }
}

impl HostUi for RecordingUi {
   fn notify(&self, message: &str) {
      self.messages.lock().push(message.to_string());
   }
}

/// Store whose every call fails while `down` is set.
#[derive(Default)]
pub struct FlakyStore {
   inner: MemoryStore,
   down:  AtomicBool,
}

impl FlakyStore {
   pub fn new(inner: MemoryStore) -> Self {
      Self { inner, down: AtomicBool::new(false) }
   }

   pub fn set_down(&self, down: bool) {
      self.down.store(down, Ordering::SeqCst);
   }

   fn check(&self) -> Result<(), StoreError> {
      if self.down.load(Ordering::SeqCst) {
         return Err(StoreError::Unavailable("injected outage".to_string()));
      }
      Ok(())
   }
}

impl SharedStore for FlakyStore {
   fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
      self.check()?;
      self.inner.get(key)
   }

   fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
      self.check()?;
      self.inner.set(key, value)
   }

   fn remove(&self, key: &str) -> Result<(), StoreError> {
      self.check()?;
      self.inner.remove(key)
   }
}

type Interleave = Box<dyn FnOnce() + Send>;

/// Store that runs `interleave` right before the `nth` write (plain or
/// conditional) to `key`, simulating another context scheduled between a
/// claimant's read and its write.
pub struct RacingStore {
   inner:      MemoryStore,
   key:        String,
   nth:        usize,
   writes:     AtomicUsize,
   interleave: Mutex<Option<Interleave>>,
}

impl RacingStore {
   pub fn new(inner: MemoryStore, key: &str, nth: usize, interleave: Interleave) -> Self {
      Self {
         inner,
         key: key.to_string(),
         nth,
         writes: AtomicUsize::new(0),
         interleave: Mutex::new(Some(interleave)),
      }
   }

   fn before_write(&self, key: &str) {
      if key != self.key || self.writes.fetch_add(1, Ordering::SeqCst) + 1 != self.nth {
         return;
      }
      let interleave = self.interleave.lock().take();
      if let Some(interleave) = interleave {
         interleave();
      }
   }
}

impl SharedStore for RacingStore {
   fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
      self.inner.get(key)
   }

   fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
      self.before_write(key);
      self.inner.set(key, value)
   }

   fn remove(&self, key: &str) -> Result<(), StoreError> {
      self.inner.remove(key)
   }

   fn supports_conditional_writes(&self) -> bool {
      self.inner.supports_conditional_writes()
   }

   fn compare_and_swap(
      &self,
      key: &str,
      expected: Option<&str>,
      new: &str,
   ) -> Result<bool, StoreError> {
      self.before_write(key);
      self.inner.compare_and_swap(key, expected, new)
   }
}

pub fn editor_config() -> Config {
   Config {
      url_pattern: "/createpost/".to_string(),
      storage_key: "createpost-tab".to_string(),
      heartbeat_interval_ms: 1000,
      message_text: "You already have an editor open in another tab.".to_string(),
      redirect_path: "/profile".to_string(),
      store_dir: None,
   }
}

pub fn shared(store: &MemoryStore) -> Arc<dyn SharedStore> {
   Arc::new(store.clone())
}

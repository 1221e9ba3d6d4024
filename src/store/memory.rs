//! In-process store, shared between contexts by cloning.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

use super::{SharedStore, StoreError};

/// Map-backed store. Clones share the same entries.
#[derive(Debug, Clone)]
pub struct MemoryStore {
   entries:     Arc<Mutex<HashMap<String, String>>>,
   conditional: bool,
}

impl Default for MemoryStore {
   fn default() -> Self {
      Self::new()
   }
}

impl MemoryStore {
   pub fn new() -> Self {
      Self { entries: Arc::default(), conditional: true }
   }

   /// A store without conditional writes, behaving like a plain
   /// last-write-wins key/value store.
   pub fn last_write_wins() -> Self {
      Self { entries: Arc::default(), conditional: false }
   }

   pub fn is_empty(&self) -> bool {
      self.entries.lock().is_empty()
   }
}

impl SharedStore for MemoryStore {
   fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
      Ok(self.entries.lock().get(key).cloned())
   }

   fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
      self
         .entries
         .lock()
         .insert(key.to_string(), value.to_string());
      Ok(())
   }

   fn remove(&self, key: &str) -> Result<(), StoreError> {
      self.entries.lock().remove(key);
      Ok(())
   }

   fn supports_conditional_writes(&self) -> bool {
      self.conditional
   }

   fn compare_and_swap(
      &self,
      key: &str,
      expected: Option<&str>,
      new: &str,
   ) -> Result<bool, StoreError> {
      if !self.conditional {
         return Err(StoreError::ConditionalWriteUnsupported);
      }
      let mut entries = self.entries.lock();
      if entries.get(key).map(String::as_str) != expected {
         return Ok(false);
      }
      entries.insert(key.to_string(), new.to_string());
      Ok(true)
   }
}

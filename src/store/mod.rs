//! Shared key/value store adapters.
//!
//! The store is the only thing contending contexts share. Adapters carry no
//! lease logic; they read, write and delete string values by key.

mod file;
mod memory;

use std::io;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors that can occur while talking to the shared store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
   #[error("store unavailable: {0}")]
   Unavailable(String),

   #[error("store io failed on {key}: {source}")]
   Io {
      key:    String,
      #[source]
      source: io::Error,
   },

   #[error("conditional writes not supported by this store")]
   ConditionalWriteUnsupported,
}

/// Key/value interface over the persistent store shared by all contexts.
///
/// Reads and writes are synchronous from the caller's perspective. The store
/// only promises last-write-wins per key; adapters that can do better expose
/// it through [`SharedStore::compare_and_swap`].
pub trait SharedStore: Send + Sync {
   fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

   fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

   fn remove(&self, key: &str) -> Result<(), StoreError>;

   /// Whether [`SharedStore::compare_and_swap`] is implemented.
   fn supports_conditional_writes(&self) -> bool {
      false
   }

   /// Writes `new` under `key` only if the current value equals `expected`
   /// (`None` meaning absent). Returns whether the write happened.
   fn compare_and_swap(
      &self,
      key: &str,
      expected: Option<&str>,
      new: &str,
   ) -> Result<bool, StoreError> {
      let _ = (key, expected, new);
      Err(StoreError::ConditionalWriteUnsupported)
   }
}

impl<S: SharedStore + ?Sized> SharedStore for std::sync::Arc<S> {
   fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
      (**self).get(key)
   }

   fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
      (**self).set(key, value)
   }

   fn remove(&self, key: &str) -> Result<(), StoreError> {
      (**self).remove(key)
   }

   fn supports_conditional_writes(&self) -> bool {
      (**self).supports_conditional_writes()
   }

   fn compare_and_swap(
      &self,
      key: &str,
      expected: Option<&str>,
      new: &str,
   ) -> Result<bool, StoreError> {
      (**self).compare_and_swap(key, expected, new)
   }
}

//! Directory-backed store shared between OS processes.
//!
//! Each key is one file. Values are replaced with write-to-temp + rename, and
//! mutations serialize on an exclusive `fs4` lock so conditional writes are
//! atomic across processes on the same host.

use std::{
   fs::{self, File, OpenOptions},
   io,
   path::PathBuf,
};

use fs4::FileExt;

use super::{SharedStore, StoreError};
use crate::util::fsync_dir;

const LOCK_FILE: &str = ".store.lock";
const VALUE_EXT: &str = "val";

#[derive(Debug, Clone)]
pub struct FileStore {
   dir: PathBuf,
}

impl FileStore {
   pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
      let dir = dir.into();
      fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
         key: dir.display().to_string(),
         source,
      })?;
      Ok(Self { dir })
   }

   fn value_path(&self, key: &str) -> PathBuf {
      self.dir.join(format!("{}.{VALUE_EXT}", encode_key(key)))
   }

   fn lock(&self) -> Result<StoreLock, StoreError> {
      let path = self.dir.join(LOCK_FILE);
      let io_err = |source| StoreError::Io { key: LOCK_FILE.to_string(), source };
      let file = OpenOptions::new()
         .create(true)
         .read(true)
         .write(true)
         .truncate(false)
         .open(&path)
         .map_err(io_err)?;
      file.lock_exclusive().map_err(io_err)?;
      Ok(StoreLock { file })
   }

   fn read_value(&self, key: &str) -> Result<Option<String>, StoreError> {
      match fs::read_to_string(self.value_path(key)) {
         Ok(value) => Ok(Some(value)),
         Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
         Err(source) => Err(StoreError::Io { key: key.to_string(), source }),
      }
   }

   fn write_value(&self, key: &str, value: &str) -> Result<(), StoreError> {
      let path = self.value_path(key);
      let tmp_path = path.with_extension(format!("{}.tmp", std::process::id()));
      let io_err = |source| StoreError::Io { key: key.to_string(), source };
      fs::write(&tmp_path, value).map_err(io_err)?;
      fs::rename(&tmp_path, &path).map_err(io_err)?;
      fsync_dir(&self.dir).map_err(io_err)?;
      Ok(())
   }
}

impl SharedStore for FileStore {
   fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
      self.read_value(key)
   }

   fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
      let _lock = self.lock()?;
      self.write_value(key, value)
   }

   fn remove(&self, key: &str) -> Result<(), StoreError> {
      let _lock = self.lock()?;
      match fs::remove_file(self.value_path(key)) {
         Ok(()) => Ok(()),
         Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
         Err(source) => Err(StoreError::Io { key: key.to_string(), source }),
      }
   }

   fn supports_conditional_writes(&self) -> bool {
      true
   }

   fn compare_and_swap(
      &self,
      key: &str,
      expected: Option<&str>,
      new: &str,
   ) -> Result<bool, StoreError> {
      let _lock = self.lock()?;
      if self.read_value(key)?.as_deref() != expected {
         return Ok(false);
      }
      self.write_value(key, new)?;
      Ok(true)
   }
}

struct StoreLock {
   file: File,
}

impl Drop for StoreLock {
   fn drop(&mut self) {
      let _ = self.file.unlock();
   }
}

/// Maps a key to a portable file stem. Bytes outside `[A-Za-z0-9_-]` are
/// written as `%XX`, so `lease:timestamp` and `lease-timestamp` stay distinct.
fn encode_key(key: &str) -> String {
   let mut out = String::with_capacity(key.len());
   for byte in key.bytes() {
      if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
         out.push(byte as char);
      } else {
         out.push_str(&format!("%{byte:02X}"));
      }
   }
   out
}

//! Small filesystem and formatting helpers.

use std::{io, path::Path, time::Duration};

/// Flushes directory metadata so a preceding rename is durable.
#[cfg(unix)]
pub fn fsync_dir(dir: &Path) -> io::Result<()> {
   std::fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
pub fn fsync_dir(_dir: &Path) -> io::Result<()> {
   Ok(())
}

/// Formats an elapsed duration as a short human-readable string.
pub fn format_age(age: Duration) -> String {
   let ms = age.as_millis();
   if ms < 1_000 {
      format!("{ms}ms")
   } else if ms < 60_000 {
      format!("{:.1}s", age.as_secs_f64())
   } else {
      let secs = age.as_secs();
      format!("{}m{:02}s", secs / 60, secs % 60)
   }
}

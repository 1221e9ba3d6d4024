//! Lease status command.

use console::style;
use serde::Serialize;

use crate::{Result, config::Config, util::format_age};

#[derive(Debug, Serialize)]
struct StatusReport {
   key:                String,
   held:               bool,
   owner_id:           Option<String>,
   last_renewed_at_ms: Option<u64>,
   age_ms:             Option<u64>,
   stale:              bool,
}

pub fn execute(cfg: &Config, json: bool) -> Result<()> {
   let coordinator = super::open_coordinator(cfg)?;
   let record = coordinator.inspect()?;
   let now = coordinator.now_ms();
   let stale_after = cfg.stale_after();

   if json {
      let report = StatusReport {
         key:                cfg.storage_key.clone(),
         held:               record.is_some(),
         owner_id:           record.as_ref().map(|r| r.owner_id.clone()),
         last_renewed_at_ms: record.as_ref().map(|r| r.last_renewed_at_ms),
         age_ms:             record.as_ref().map(|r| r.age(now).as_millis() as u64),
         stale:              record.as_ref().is_some_and(|r| r.is_stale(now, stale_after)),
      };
      println!("{}", serde_json::to_string_pretty(&report)?);
      return Ok(());
   }

   let Some(record) = record else {
      println!("{} {} is free", style("●").dim(), cfg.storage_key);
      return Ok(());
   };

   let age = format_age(record.age(now));
   if record.is_stale(now, stale_after) {
      println!(
         "{} {} held by {} {}",
         style("●").yellow(),
         cfg.storage_key,
         record.owner_id,
         style(format!("(stale, last heartbeat {age} ago)")).dim()
      );
   } else {
      println!(
         "{} {} held by {} {}",
         style("●").green(),
         cfg.storage_key,
         record.owner_id,
         style(format!("(last heartbeat {age} ago)")).dim()
      );
   }
   Ok(())
}

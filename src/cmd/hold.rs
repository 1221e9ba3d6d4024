//! Hold command.
//!
//! Mounts a session at a location, keeps the lease alive until interrupted
//! or the optional deadline passes, then releases it.

use std::{sync::Arc, time::Duration};

use console::style;
use tokio::time;

use crate::{
   Result,
   clock::SystemClock,
   config::Config,
   error::Error,
   lease::DenyReason,
   scope::History,
   session::{HostUi, SessionGuard},
   store::{FileStore, StoreError},
};

/// Prints denial messages to stderr.
pub struct TerminalUi;

impl HostUi for TerminalUi {
   fn notify(&self, message: &str) {
      eprintln!("{} {}", style("!").yellow().bold(), style(message).yellow());
   }
}

pub async fn execute(cfg: &Config, path: String, seconds: Option<u64>) -> Result<()> {
   let store = Arc::new(FileStore::open(cfg.store_dir())?);
   let history = History::new(path.clone());
   let guard =
      SessionGuard::mount(cfg, store, Arc::new(SystemClock), &history, Arc::new(TerminalUi))?;

   if !cfg.scope().matches(&path) {
      println!(
         "{} {} is outside {}; nothing to hold",
         style("●").dim(),
         path,
         style(&cfg.url_pattern).bold()
      );
      return Ok(());
   }

   if !guard.is_active() {
      return Err(denial_error(guard.last_denial()));
   }

   println!(
      "{} holding {} as {} (redirected contexts go to {})",
      style("●").green(),
      style(&cfg.storage_key).bold(),
      guard.owner_id(),
      cfg.redirect_path
   );

   let deadline = async {
      match seconds {
         Some(secs) => time::sleep(Duration::from_secs(secs)).await,
         None => std::future::pending().await,
      }
   };

   tokio::select! {
      res = tokio::signal::ctrl_c() => res?,
      () = deadline => {},
      () = wait_until_demoted(&guard, cfg.heartbeat_interval()) => {
         let message = "lease lost to another holder".to_string();
         eprintln!("{} {}", style("●").red(), message);
         return Err(Error::Reported { message, exit_code: 10 });
      },
   }

   history.unload();
   drop(guard);
   println!("{} released {}", style("●").dim(), cfg.storage_key);
   Ok(())
}

async fn wait_until_demoted(guard: &SessionGuard, interval: Duration) {
   while guard.is_active() {
      time::sleep(interval).await;
   }
}

fn denial_error(reason: Option<DenyReason>) -> Error {
   match reason {
      Some(DenyReason::Held { owner, .. }) => Error::Denied { owner },
      Some(DenyReason::LostRace { winner }) => {
         Error::Denied { owner: winner.unwrap_or_else(|| "unknown".to_string()) }
      },
      Some(DenyReason::StoreUnavailable) | None => {
         StoreError::Unavailable("lease store unreachable".to_string()).into()
      },
   }
}

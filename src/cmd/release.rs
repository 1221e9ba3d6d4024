//! Owner-scoped release command.
//!
//! Only the recorded owner's token releases the lease; anything else leaves
//! the store untouched.

use console::style;

use crate::{Result, config::Config, lease::OwnerId};

pub fn execute(cfg: &Config, owner: String) -> Result<()> {
   let coordinator = super::open_coordinator(cfg)?;
   if coordinator.release(&OwnerId::from(owner.clone())) {
      println!("{} released {}", style("●").green(), cfg.storage_key);
   } else {
      println!(
         "{} {} is not held by {}; nothing released",
         style("●").yellow(),
         cfg.storage_key,
         owner
      );
   }
   Ok(())
}

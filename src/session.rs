//! Single-active-session guard for one context.
//!
//! A [`SessionGuard`] ties the lease to the context's location: entering the
//! protected scope claims the lease and starts the heartbeat, leaving it (or
//! unloading) releases the lease in the same call. A denied context is told
//! why and redirected away from the protected view.

use std::{
   ops::ControlFlow,
   sync::{Arc, Weak},
   time::Duration,
};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;

use crate::{
   Result,
   clock::Clock,
   config::Config,
   error::Error,
   heartbeat::Heartbeat,
   lease::{Claim, DenyReason, LeaseCoordinator, OwnerId, Renewal},
   scope::{History, HookHandle, NavigationEvent, NavigationHook, NavigationKind, ScopePattern},
   store::SharedStore,
};

/// Host surface used to tell a denied context why it was turned away.
pub trait HostUi: Send + Sync {
   fn notify(&self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
   Unclaimed,
   Active,
   Standby,
}

struct SessionCore {
   state:       SessionState,
   heartbeat:   Option<Heartbeat>,
   last_denial: Option<DenyReason>,
}

struct SessionInner {
   owner:              OwnerId,
   coordinator:        LeaseCoordinator,
   scope:              ScopePattern,
   heartbeat_interval: Duration,
   stale_after:        Duration,
   message_text:       String,
   redirect_path:      String,
   ui:                 Arc<dyn HostUi>,
   history:            History,
   runtime:            Handle,
   core:               Mutex<SessionCore>,
}

impl SessionInner {
   fn evaluate(self: &Arc<Self>, path: &str) {
      if !self.scope.matches(path) {
         self.leave();
         return;
      }

      let denied = {
         let mut core = self.core.lock();
         if core.state == SessionState::Active {
            return;
         }
         match self.coordinator.try_claim(&self.owner, self.stale_after) {
            Claim::Granted(grant) => {
               tracing::info!(owner = %self.owner, ?grant, path, "session active");
               core.state = SessionState::Active;
               core.last_denial = None;
               core.heartbeat = Some(self.start_heartbeat());
               false
            },
            Claim::Denied(reason) => {
               tracing::info!(owner = %self.owner, ?reason, path, "session on standby");
               core.state = SessionState::Standby;
               core.heartbeat = None;
               core.last_denial = Some(reason);
               true
            },
         }
      };

      if denied {
         self.turn_away();
      }
   }

   fn start_heartbeat(self: &Arc<Self>) -> Heartbeat {
      let session = Arc::downgrade(self);
      Heartbeat::spawn(&self.runtime, self.heartbeat_interval, move || {
         match session.upgrade() {
            Some(session) => session.heartbeat_tick(),
            None => ControlFlow::Break(()),
         }
      })
   }

   fn heartbeat_tick(&self) -> ControlFlow<()> {
      {
         let mut core = self.core.lock();
         if core.state != SessionState::Active {
            return ControlFlow::Break(());
         }
         let reason = match self.coordinator.renew(&self.owner) {
            Renewal::Renewed => return ControlFlow::Continue(()),
            Renewal::Lost { owner } => {
               tracing::warn!(owner = %self.owner, current = ?owner, "demoted: lease taken over");
               DenyReason::LostRace { winner: owner }
            },
            Renewal::Failed => {
               tracing::warn!(owner = %self.owner, "demoted: lease renewal failed");
               DenyReason::StoreUnavailable
            },
         };
         core.state = SessionState::Standby;
         core.heartbeat = None;
         core.last_denial = Some(reason);
      }

      self.turn_away();
      ControlFlow::Break(())
   }

   /// Tells the user why and leaves the protected view. Must run without the
   /// core lock: the redirect re-enters through the hook.
   fn turn_away(&self) {
      self.ui.notify(&self.message_text);
      self.history.replace_state(self.redirect_path.clone());
   }

   /// Leaves the protected scope, releasing the lease if held. The heartbeat
   /// is stopped under the same lock a tick renews under. A standby context
   /// stays on standby.
   fn leave(&self) {
      let mut core = self.core.lock();
      core.heartbeat = None;
      if core.state == SessionState::Active {
         self.coordinator.release(&self.owner);
         core.state = SessionState::Unclaimed;
         tracing::info!(owner = %self.owner, "session released");
      }
   }
}

/// Interception hook wired into the context's [`History`].
struct ScopeHook {
   session: Weak<SessionInner>,
}

impl NavigationHook for ScopeHook {
   fn on_navigate(&self, _history: &History, event: &NavigationEvent) {
      let Some(session) = self.session.upgrade() else {
         return;
      };
      match event.kind {
         NavigationKind::Unload => session.leave(),
         NavigationKind::Push | NavigationKind::Replace | NavigationKind::Pop => {
            session.evaluate(&event.path);
         },
      }
   }
}

/// Lease protection for one mounted view. Dropping the guard releases the
/// lease, stops the heartbeat and uninstalls the navigation hook.
pub struct SessionGuard {
   inner: Arc<SessionInner>,
   hook:  Option<HookHandle>,
}

impl SessionGuard {
   /// Mounts protection on `history` and evaluates its current location.
   ///
   /// Fails when the configuration is invalid, when no tokio runtime is
   /// available for the heartbeat, or when the hook cannot be installed.
   /// Contention is not a failure: check [`SessionGuard::is_active`].
   pub fn mount(
      config: &Config,
      store: Arc<dyn SharedStore>,
      clock: Arc<dyn Clock>,
      history: &History,
      ui: Arc<dyn HostUi>,
   ) -> Result<Self> {
      config.validate()?;
      let runtime = Handle::try_current().map_err(|_| Error::Runtime("lease heartbeat"))?;

      let inner = Arc::new(SessionInner {
         owner: OwnerId::generate(),
         coordinator: LeaseCoordinator::new(store, clock, &config.storage_key),
         scope: config.scope(),
         heartbeat_interval: config.heartbeat_interval(),
         stale_after: config.stale_after(),
         message_text: config.message_text.clone(),
         redirect_path: config.redirect_path.clone(),
         ui,
         history: history.clone(),
         runtime,
         core: Mutex::new(SessionCore {
            state:       SessionState::Unclaimed,
            heartbeat:   None,
            last_denial: None,
         }),
      });

      let hook = history.install(
         &format!("leasehold:{}", config.storage_key),
         Arc::new(ScopeHook { session: Arc::downgrade(&inner) }),
      )?;

      let guard = Self { inner, hook: Some(hook) };
      guard.recheck();
      Ok(guard)
   }

   /// Whether this context may render the protected view.
   pub fn is_active(&self) -> bool {
      self.state() == SessionState::Active
   }

   pub fn state(&self) -> SessionState {
      self.inner.core.lock().state
   }

   pub fn owner_id(&self) -> &OwnerId {
      &self.inner.owner
   }

   pub fn last_denial(&self) -> Option<DenyReason> {
      self.inner.core.lock().last_denial.clone()
   }

   /// Re-evaluates the current location, e.g. to retry from standby.
   pub fn recheck(&self) {
      let path = self.inner.history.current_path();
      self.inner.evaluate(&path);
   }
}

impl Drop for SessionGuard {
   fn drop(&mut self) {
      self.inner.leave();
      self.hook.take();
   }
}

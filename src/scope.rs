//! Protected scope matching and navigation interception.
//!
//! [`History`] models the host's location stack. Both programmatic changes
//! (`push_state`, `replace_state`) and passive ones (`back`, `forward`)
//! notify installed [`NavigationHook`]s, so routers that never emit passive
//! events are still observed. A hook stays installed exactly as long as its
//! [`HookHandle`] lives.

use std::{
   fmt,
   sync::{Arc, Weak},
};

use parking_lot::Mutex;

/// Prefix identifying the protected part of the location space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePattern(String);

impl ScopePattern {
   pub fn new(prefix: impl Into<String>) -> Self {
      Self(prefix.into())
   }

   pub fn matches(&self, path: &str) -> bool {
      path.starts_with(&self.0)
   }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
   Push,
   Replace,
   Pop,
   /// The context is terminating.
   Unload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent {
   pub kind: NavigationKind,
   pub path: String,
}

/// Observer notified after every location change.
///
/// Hooks run without any history lock held and may navigate again.
pub trait NavigationHook: Send + Sync {
   fn on_navigate(&self, history: &History, event: &NavigationEvent);
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
   #[error("history already unloaded")]
   Closed,

   #[error("hook {0} already installed")]
   AlreadyInstalled(String),
}

struct InstalledHook {
   id:   u64,
   name: String,
   hook: Arc<dyn NavigationHook>,
}

struct HistoryState {
   entries: Vec<String>,
   index:   usize,
   hooks:   Vec<InstalledHook>,
   next_id: u64,
   closed:  bool,
}

impl HistoryState {
   fn current(&self) -> String {
      self.entries[self.index].clone()
   }

   fn hooks(&self) -> Vec<Arc<dyn NavigationHook>> {
      if self.closed {
         return Vec::new();
      }
      self.hooks.iter().map(|h| Arc::clone(&h.hook)).collect()
   }
}

/// Location stack of one context. Clones share state.
#[derive(Clone)]
pub struct History {
   state: Arc<Mutex<HistoryState>>,
}

impl fmt::Debug for History {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let state = self.state.lock();
      f.debug_struct("History")
         .field("entries", &state.entries)
         .field("index", &state.index)
         .field("hooks", &state.hooks.len())
         .field("closed", &state.closed)
         .finish()
   }
}

impl History {
   pub fn new(initial_path: impl Into<String>) -> Self {
      Self {
         state: Arc::new(Mutex::new(HistoryState {
            entries: vec![initial_path.into()],
            index:   0,
            hooks:   Vec::new(),
            next_id: 0,
            closed:  false,
         })),
      }
   }

   pub fn current_path(&self) -> String {
      self.state.lock().current()
   }

   pub fn push_state(&self, path: impl Into<String>) {
      let path = path.into();
      let hooks = {
         let mut state = self.state.lock();
         let keep = state.index + 1;
         state.entries.truncate(keep);
         state.entries.push(path.clone());
         state.index = keep;
         state.hooks()
      };
      self.dispatch(&hooks, NavigationEvent { kind: NavigationKind::Push, path });
   }

   pub fn replace_state(&self, path: impl Into<String>) {
      let path = path.into();
      let hooks = {
         let mut state = self.state.lock();
         let index = state.index;
         state.entries[index].clone_from(&path);
         state.hooks()
      };
      self.dispatch(&hooks, NavigationEvent { kind: NavigationKind::Replace, path });
   }

   /// Moves one entry back. Returns false at the start of the stack.
   pub fn back(&self) -> bool {
      self.traverse(-1)
   }

   /// Moves one entry forward. Returns false at the end of the stack.
   pub fn forward(&self) -> bool {
      self.traverse(1)
   }

   fn traverse(&self, delta: isize) -> bool {
      let (hooks, path) = {
         let mut state = self.state.lock();
         let Some(index) = state.index.checked_add_signed(delta) else {
            return false;
         };
         if index >= state.entries.len() {
            return false;
         }
         state.index = index;
         (state.hooks(), state.current())
      };
      self.dispatch(&hooks, NavigationEvent { kind: NavigationKind::Pop, path });
      true
   }

   /// Terminates the context: hooks observe an unload event, then are
   /// dropped, and no hook can be installed afterwards.
   pub fn unload(&self) {
      let (hooks, path) = {
         let mut state = self.state.lock();
         let hooks = state.hooks();
         state.closed = true;
         state.hooks.clear();
         (hooks, state.current())
      };
      self.dispatch(&hooks, NavigationEvent { kind: NavigationKind::Unload, path });
   }

   pub fn install(
      &self,
      name: &str,
      hook: Arc<dyn NavigationHook>,
   ) -> Result<HookHandle, HookError> {
      let mut state = self.state.lock();
      if state.closed {
         return Err(HookError::Closed);
      }
      if state.hooks.iter().any(|h| h.name == name) {
         return Err(HookError::AlreadyInstalled(name.to_string()));
      }
      let id = state.next_id;
      state.next_id += 1;
      state
         .hooks
         .push(InstalledHook { id, name: name.to_string(), hook });
      Ok(HookHandle { state: Arc::downgrade(&self.state), id })
   }

   pub fn hook_count(&self) -> usize {
      self.state.lock().hooks.len()
   }

   fn dispatch(&self, hooks: &[Arc<dyn NavigationHook>], event: NavigationEvent) {
      tracing::trace!(kind = ?event.kind, path = %event.path, hooks = hooks.len(), "navigation");
      for hook in hooks {
         hook.on_navigate(self, &event);
      }
   }
}

/// Installed hook subscription. Dropping it uninstalls the hook.
#[derive(Debug)]
pub struct HookHandle {
   state: Weak<Mutex<HistoryState>>,
   id:    u64,
}

impl Drop for HookHandle {
   fn drop(&mut self) {
      if let Some(state) = self.state.upgrade() {
         state.lock().hooks.retain(|h| h.id != self.id);
      }
   }
}

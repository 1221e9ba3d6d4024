//! Periodic lease renewal.

use std::{ops::ControlFlow, time::Duration};

use tokio::{
   runtime::Handle,
   task::{self, JoinHandle},
   time,
};
use tokio_util::sync::CancellationToken;

/// Background task invoking a tick callback every `interval` until it is
/// dropped or the callback breaks.
///
/// The first tick fires one full interval after spawning and runs on the
/// blocking pool, so it may do synchronous I/O. Dropping the
/// handle cancels the task; a tick that is already running finishes, so
/// callers that must not write after teardown guard the tick body with the
/// same lock they tear down under.
#[derive(Debug)]
pub struct Heartbeat {
   token:  CancellationToken,
   handle: Option<JoinHandle<()>>,
}

impl Heartbeat {
   pub fn spawn<F>(runtime: &Handle, interval: Duration, mut tick: F) -> Self
   where
      F: FnMut() -> ControlFlow<()> + Send + 'static,
   {
      let token = CancellationToken::new();
      let token_clone = token.clone();
      let handle = runtime.spawn(async move {
         loop {
            tokio::select! {
               () = token_clone.cancelled() => break,
               () = time::sleep(interval) => {
                  if token_clone.is_cancelled() {
                     break;
                  }
                  // Store I/O may block; keep it off the async workers.
                  let Ok((returned, flow)) = task::spawn_blocking(move || {
                     let flow = tick();
                     (tick, flow)
                  })
                  .await
                  else {
                     tracing::warn!("heartbeat tick panicked");
                     break;
                  };
                  tick = returned;
                  if flow.is_break() {
                     tracing::debug!("heartbeat stopped by tick");
                     break;
                  }
               }
            }
         }
      });

      Self { token, handle: Some(handle) }
   }

   pub fn is_finished(&self) -> bool {
      self.handle.as_ref().is_none_or(JoinHandle::is_finished)
   }
}

impl Drop for Heartbeat {
   fn drop(&mut self) {
      self.token.cancel();
      if let Some(handle) = self.handle.take() {
         handle.abort();
      }
   }
}

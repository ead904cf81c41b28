/// Render thread and cooperative cancellation
///
/// One plain task runs on a named thread until it asks to stop or the
/// token is cancelled. The token is checked once per loop iteration, never
/// inside a frame.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::{engine_debug, engine_error};

/// Shared stop flag guarded by a mutex and a condition variable
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake every waiter
    pub fn cancel(&self) {
        let (flag, condvar) = &*self.inner;
        match flag.lock() {
            Ok(mut cancelled) => *cancelled = true,
            Err(poisoned) => *poisoned.into_inner() = true,
        }
        condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (flag, _) = &*self.inner;
        match flag.lock() {
            Ok(cancelled) => *cancelled,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Sleep up to `timeout`, returning early on cancellation
    ///
    /// Returns whether the token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, condvar) = &*self.inner;
        let Ok(guard) = flag.lock() else {
            return true;
        };
        match condvar.wait_timeout_while(guard, timeout, |cancelled| !*cancelled) {
            Ok((cancelled, _)) => *cancelled,
            Err(_) => true,
        }
    }
}

/// What the task wants after one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

/// A named thread running one task in a loop
pub struct RenderThread {
    name: String,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RenderThread {
    /// Start `task` on a new thread named `name`
    ///
    /// The loop exits when `token` is cancelled (checked before every
    /// iteration) or when `task` returns `LoopControl::Stop`.
    pub fn spawn<F>(name: impl Into<String>, token: CancellationToken, mut task: F) -> Result<Self>
    where
        F: FnMut() -> LoopControl + Send + 'static,
    {
        let name = name.into();
        let loop_token = token.clone();
        let thread_name = name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                engine_debug!("sponza::RenderThread", "'{}' started", thread_name);
                let mut iterations: u64 = 0;
                while !loop_token.is_cancelled() {
                    iterations += 1;
                    if task() == LoopControl::Stop {
                        break;
                    }
                }
                engine_debug!(
                    "sponza::RenderThread",
                    "'{}' exited after {} iterations",
                    thread_name, iterations
                );
            })
            .map_err(|e| Error::InitializationFailed(format!("spawning render thread '{}': {}", name, e)))?;

        Ok(Self {
            name,
            token,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether the loop has exited (or the thread was already joined)
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Cancel and join
    ///
    /// The current iteration always completes first. Calling `stop` again
    /// is a no-op.
    pub fn stop(&mut self) -> Result<()> {
        self.token.cancel();
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        handle
            .join()
            .map_err(|_| Error::BackendError(format!("render thread '{}' panicked", self.name)))
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            engine_error!("sponza::RenderThread", "{}", err);
        }
    }
}

#[cfg(test)]
#[path = "render_thread_tests.rs"]
mod tests;

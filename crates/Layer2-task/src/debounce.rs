//! Cancellable delayed action
//!
//! Each `call` replaces whatever is pending and restarts the quiet period.
//! The action runs once, with the last value, after the quiet period passes
//! without another call (trailing edge only).

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Default)]
struct Slot {
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

/// Trailing-edge debouncer
pub struct Debouncer<T> {
    delay: Duration,
    action: Arc<dyn Fn(T) + Send + Sync>,
    slot: Arc<Mutex<Slot>>,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(delay: Duration, action: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            delay,
            action: Arc::new(action),
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `value`, superseding any pending call.
    /// Must be called from within a tokio runtime.
    pub fn call(&self, value: T) {
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        let generation = slot.generation;

        let delay = self.delay;
        let action = Arc::clone(&self.action);
        let shared = Arc::clone(&self.slot);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Held while firing so a concurrent call cannot slip in between
            let mut slot = lock(&shared);
            if slot.generation != generation {
                return;
            }
            slot.pending = None;
            action(value);
        });

        if let Some(previous) = slot.pending.replace(handle) {
            previous.abort();
        }
    }

    /// Drop the pending call, if any
    pub fn cancel(&self) {
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        if let Some(pending) = slot.pending.take() {
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.slot).pending.is_some()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(pending) = lock(&self.slot).pending.take() {
            pending.abort();
        }
    }
}

//! Cancellable one-shot timer on top of a [`Handler`]

use super::handler::Handler;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A one-shot timer whose task runs on a handler.
///
/// At most one firing is outstanding: scheduling again or cancelling
/// invalidates whatever was scheduled before.
pub struct Alarm {
    handler: Handler,
    generation: Arc<AtomicU64>,
    armed: Arc<AtomicBool>,
}

impl Alarm {
    /// Create an alarm firing on `handler`
    pub fn new(handler: Handler) -> Self {
        Self {
            handler,
            generation: Arc::new(AtomicU64::new(0)),
            armed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Schedule `task` to run after `delay`, replacing any earlier schedule
    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let scheduled = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.armed.store(true, Ordering::SeqCst);

        let generation = self.generation.clone();
        let armed = self.armed.clone();
        self.handler.post_delayed(delay, move || {
            if generation.load(Ordering::SeqCst) != scheduled {
                return;
            }
            armed.store(false, Ordering::SeqCst);
            task();
        });
    }

    /// Cancel the outstanding firing, if any
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.armed.store(false, Ordering::SeqCst);
    }

    /// Whether a firing is outstanding
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

impl Drop for Alarm {
    fn drop(&mut self) {
        self.cancel();
    }
}

//! Application lifetime notifications.

use std::sync::Mutex;

use crate::cancellation::CancellationToken;

struct CallbackSet {
    fired: bool,
    callbacks: Vec<Box<dyn FnOnce() + Send>>,
}

impl CallbackSet {
    fn new() -> Self {
        Self {
            fired: false,
            callbacks: Vec::new(),
        }
    }
}

/// Lifecycle transition notifications for the running application.
///
/// Registered as a singleton before any component registration action runs,
/// so components can subscribe during their own construction. Subscribing
/// after an event has fired runs the callback immediately.
///
/// The component builder uses the stopping event to cancel scene timers so
/// no engine-level timer fires into a disposed container.
pub struct ApplicationLifetime {
    stopping_token: CancellationToken,
    started: Mutex<CallbackSet>,
    stopping: Mutex<CallbackSet>,
    stopped: Mutex<CallbackSet>,
}

impl ApplicationLifetime {
    pub fn new() -> Self {
        Self {
            stopping_token: CancellationToken::new(),
            started: Mutex::new(CallbackSet::new()),
            stopping: Mutex::new(CallbackSet::new()),
            stopped: Mutex::new(CallbackSet::new()),
        }
    }

    /// Token cancelled when the application begins stopping.
    pub fn stopping_token(&self) -> CancellationToken {
        self.stopping_token.clone()
    }

    /// Runs `f` once all hosted services have started.
    pub fn on_started(&self, f: impl FnOnce() + Send + 'static) {
        Self::subscribe(&self.started, Box::new(f));
    }

    /// Runs `f` when the application begins stopping, before hosted services
    /// are stopped.
    pub fn on_stopping(&self, f: impl FnOnce() + Send + 'static) {
        Self::subscribe(&self.stopping, Box::new(f));
    }

    /// Runs `f` once the stop sweep has finished.
    pub fn on_stopped(&self, f: impl FnOnce() + Send + 'static) {
        Self::subscribe(&self.stopped, Box::new(f));
    }

    fn subscribe(set: &Mutex<CallbackSet>, f: Box<dyn FnOnce() + Send>) {
        {
            let mut set = set.lock().unwrap();
            if !set.fired {
                set.callbacks.push(f);
                return;
            }
        }
        // Late subscription after the event fired runs immediately
        f();
    }

    fn fire(set: &Mutex<CallbackSet>) {
        let callbacks = {
            let mut set = set.lock().unwrap();
            set.fired = true;
            std::mem::take(&mut set.callbacks)
        };
        for callback in callbacks {
            callback();
        }
    }

    pub(crate) fn notify_started(&self) {
        Self::fire(&self.started);
    }

    pub(crate) fn notify_stopping(&self) {
        self.stopping_token.cancel();
        Self::fire(&self.stopping);
    }

    pub(crate) fn notify_stopped(&self) {
        Self::fire(&self.stopped);
    }
}

impl Default for ApplicationLifetime {
    fn default() -> Self {
        Self::new()
    }
}

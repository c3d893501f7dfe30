//! Hook registry for circuit breaker events.
//!
//! Hooks run after the breaker's lock has been released, on the thread that
//! caused the event.

use crate::error::Rejection;
use crate::state::State;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

type NameHookFn = Arc<dyn Fn(&str) + Send + Sync + 'static>;
type TransitionHookFn = Arc<dyn Fn(&str, State, State) + Send + Sync + 'static>;
type RejectHookFn = Arc<dyn Fn(&str, Rejection) + Send + Sync + 'static>;

/// A registry for circuit breaker event hooks.
///
/// Each hook receives the name of the breaker that fired it, so one registry
/// can be shared by every breaker of a [`Manager`](crate::Manager).
pub struct HookRegistry {
    on_state_change: RwLock<Option<TransitionHookFn>>,
    on_open: RwLock<Option<NameHookFn>>,
    on_close: RwLock<Option<NameHookFn>>,
    on_half_open: RwLock<Option<NameHookFn>>,
    on_reject: RwLock<Option<RejectHookFn>>,
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("on_state_change", &self.on_state_change.read().is_some())
            .field("on_open", &self.on_open.read().is_some())
            .field("on_close", &self.on_close.read().is_some())
            .field("on_half_open", &self.on_half_open.read().is_some())
            .field("on_reject", &self.on_reject.read().is_some())
            .finish()
    }
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self {
            on_state_change: RwLock::new(None),
            on_open: RwLock::new(None),
            on_close: RwLock::new(None),
            on_half_open: RwLock::new(None),
            on_reject: RwLock::new(None),
        }
    }

    /// Sets the hook called on every transition with `(name, from, to)`.
    pub fn set_on_state_change<F>(&self, f: F)
    where
        F: Fn(&str, State, State) + Send + Sync + 'static,
    {
        *self.on_state_change.write() = Some(Arc::new(f));
    }

    /// Sets the hook to call when a breaker opens.
    pub fn set_on_open<F>(&self, f: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self.on_open.write() = Some(Arc::new(f));
    }

    /// Sets the hook to call when a breaker closes.
    pub fn set_on_close<F>(&self, f: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self.on_close.write() = Some(Arc::new(f));
    }

    /// Sets the hook to call when a breaker half-opens.
    pub fn set_on_half_open<F>(&self, f: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self.on_half_open.write() = Some(Arc::new(f));
    }

    /// Sets the hook to call when a breaker rejects a call.
    pub fn set_on_reject<F>(&self, f: F)
    where
        F: Fn(&str, Rejection) + Send + Sync + 'static,
    {
        *self.on_reject.write() = Some(Arc::new(f));
    }

    /// Executes the hooks registered for a transition.
    pub fn execute_state_transition_hook(&self, name: &str, from: State, to: State) {
        // Clone the Arc out so a hook may replace hooks without deadlocking.
        let on_change = self.on_state_change.read().clone();
        if let Some(hook) = on_change {
            hook(name, from, to);
        }

        let slot = match to {
            State::Open => &self.on_open,
            State::Closed => &self.on_close,
            State::HalfOpen => &self.on_half_open,
        };
        let hook = slot.read().clone();
        if let Some(hook) = hook {
            hook(name);
        }
    }

    /// Executes the rejection hook.
    pub fn execute_reject_hook(&self, name: &str, rejection: Rejection) {
        let hook = self.on_reject.read().clone();
        if let Some(hook) = hook {
            hook(name, rejection);
        }
    }
}

//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is a single-use flag shared across threads.
//! Cancellation is advisory: the runtime checks the token at function-call
//! boundaries and surfaces a [`crate::errors::EvalErrorKind::Cancelled`]
//! error there, but native code is free to poll it at finer granularity.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Callback invoked when the token is cancelled. Runs synchronously on the
/// cancelling thread and must not block.
pub type CancelCallback = Box<dyn Fn(&str) + Send>;

#[derive(Default)]
struct TokenState {
    cancelled: bool,
    reason: Option<String>,
    callbacks: Vec<CancelCallback>,
}

/// Shared, idempotent cancellation flag with callback registration.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<Mutex<TokenState>>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    /// Cancel the token. The first call wins: it records `reason`, invokes
    /// every registered callback synchronously, and returns `true`. Later
    /// calls return `false` and leave the reason unchanged.
    pub fn cancel(&self, reason: &str) -> bool {
        let callbacks = {
            let mut state = self.0.lock();
            if state.cancelled {
                return false;
            }
            state.cancelled = true;
            state.reason = Some(reason.to_string());
            // Callbacks run outside the lock so they may register others.
            std::mem::take(&mut state.callbacks)
        };
        for callback in &callbacks {
            callback(reason);
        }
        true
    }

    /// Whether the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.lock().cancelled
    }

    /// The reason recorded by the first `cancel` call.
    pub fn reason(&self) -> Option<String> {
        self.0.lock().reason.clone()
    }

    /// Register a callback. If the token is already cancelled the callback
    /// fires immediately, on the registering thread.
    pub fn on_cancel(&self, callback: CancelCallback) {
        let fire_now = {
            let mut state = self.0.lock();
            if state.cancelled {
                state.reason.clone()
            } else {
                state.callbacks.push(callback);
                return;
            }
        };
        if let Some(reason) = fire_now {
            callback(&reason);
        }
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.lock();
        f.debug_struct("CancellationToken")
            .field("cancelled", &state.cancelled)
            .field("reason", &state.reason)
            .field("callbacks", &state.callbacks.len())
            .finish()
    }
}

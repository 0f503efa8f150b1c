//! Single-Flight Initialization
//!
//! Guarantees at most one in-flight initialization. Concurrent callers share
//! the pending attempt; a failed attempt is forgotten so the next caller can
//! start a fresh one.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

type PendingInit<E> = Shared<BoxFuture<'static, Result<(), E>>>;

// == Init Gate ==
/// Runs an initialization routine once, sharing the in-flight attempt.
///
/// The error type must be `Clone` so every waiter receives the outcome.
pub struct InitGate<E> {
    /// Label used in log output
    name: &'static str,
    /// Set once an attempt succeeds
    initialized: AtomicBool,
    /// The attempt currently in flight, if any
    pending: Mutex<Option<PendingInit<E>>>,
}

impl<E> InitGate<E>
where
    E: Clone + Display + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            initialized: AtomicBool::new(false),
            pending: Mutex::new(None),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    // == Run ==
    /// Completes initialization, starting it with `init` only if no attempt is
    /// in flight and none has succeeded yet.
    ///
    /// Every caller that joins an attempt observes that attempt's outcome.
    pub async fn run<F, Fut>(&self, init: F) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        if self.is_initialized() {
            return Ok(());
        }

        let attempt = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            if self.is_initialized() {
                return Ok(());
            }
            match pending.as_ref() {
                Some(in_flight) => {
                    debug!(gate = self.name, "Joining in-flight initialization");
                    in_flight.clone()
                }
                None => {
                    debug!(gate = self.name, "Starting initialization");
                    let attempt = init().boxed().shared();
                    *pending = Some(attempt.clone());
                    attempt
                }
            }
        };

        let outcome = attempt.clone().await;

        {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            if outcome.is_ok() {
                self.initialized.store(true, Ordering::Release);
            }
            if pending.as_ref().is_some_and(|p| p.ptr_eq(&attempt)) {
                *pending = None;
                if let Err(err) = &outcome {
                    warn!(gate = self.name, error = %err, "Initialization failed");
                }
            }
        }

        outcome
    }
}

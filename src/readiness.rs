//! Readiness tracking for the external structural validator.
//!
//! A tiny single-flight state machine: the first request issues exactly one
//! load, requests while it is in flight are dropped, and subscribers are
//! told through a broadcast channel once the validator is available.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::LoadError;

/// Buffered notifications per subscriber before the oldest are dropped.
const NOTIFY_CAPACITY: usize = 16;

/// Notifications sent to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Notify {
    /// Reserved; the tracker itself never sends it.
    Loading,
    /// The validator became available, or already was.
    Refresh,
}

/// Load state of the validator library. No status means never requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Pending,
    Loaded,
}

/// Reports whether a validator is already present without loading it.
pub trait ValidatorProvider: Send + Sync {
    fn validator_available(&self) -> bool;
}

/// Fetches a validator library by identifier.
pub trait ScriptLoader: Send + Sync {
    fn load(&self, library: &str) -> impl Future<Output = Result<(), LoadError>> + Send;
}

/// Tracks availability of the external validator.
pub struct ReadinessTracker {
    status: Mutex<Option<LoadStatus>>,
    notify: broadcast::Sender<Notify>,
    provider: Box<dyn ValidatorProvider>,
}

impl ReadinessTracker {
    pub fn new(provider: impl ValidatorProvider + 'static) -> Self {
        let (notify, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            status: Mutex::new(None),
            notify,
            provider: Box::new(provider),
        }
    }

    /// Subscribe to notifications sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notify> {
        self.notify.subscribe()
    }

    pub fn status(&self) -> Option<LoadStatus> {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make sure the validator is available, loading `library` at most once.
    ///
    /// - already available or loaded: sends [`Notify::Refresh`] immediately;
    /// - a load is in flight: does nothing;
    /// - never requested: moves to `Pending`, loads, and on success moves to
    ///   `Loaded` and sends [`Notify::Refresh`].
    ///
    /// # Errors
    ///
    /// Returns the loader's `LoadError`. The status stays `Pending` after a
    /// failure, so later requests are no-ops.
    pub async fn refresh_schema<L: ScriptLoader>(
        &self,
        library: &str,
        loader: &L,
    ) -> Result<(), LoadError> {
        {
            let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
            let current = *status;
            if self.provider.validator_available() || current == Some(LoadStatus::Loaded) {
                drop(status);
                self.send(Notify::Refresh);
                return Ok(());
            }
            if current == Some(LoadStatus::Pending) {
                debug!(library, "validator load already in flight");
                return Ok(());
            }
            *status = Some(LoadStatus::Pending);
        }

        info!(library, "loading validator library");
        match loader.load(library).await {
            Ok(()) => {
                *self.status.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(LoadStatus::Loaded);
                self.send(Notify::Refresh);
                Ok(())
            }
            Err(err) => {
                warn!(library, error = %err, "validator library failed to load");
                Err(err)
            }
        }
    }

    fn send(&self, notify: Notify) {
        // No subscribers is not an error.
        let _ = self.notify.send(notify);
    }
}

impl std::fmt::Debug for ReadinessTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessTracker")
            .field("status", &self.status())
            .field("subscribers", &self.notify.receiver_count())
            .finish()
    }
}

//! Busy/error bookkeeping shared by every network-backed action.
//!
//! Each action brackets its remote call with [`Activity::begin`] and
//! [`Activity::settle`]:
//!
//! ```ignore
//! let _busy = activity.begin(ACTION);
//! let movies = activity
//!     .settle(ACTION, "Failed to load movies", gateway.list_movies().await)
//!     .await?;
//! cache.replace_all(movies.clone());
//! ```
//!
//! The guard keeps the client busy until the action, including its cache
//! commit, has finished.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{auth::AuthSession, error::GatewayError, notify::Notifier, ClientEvent};

pub struct Activity {
    in_flight: AtomicUsize,
    last_error: Mutex<Option<String>>,
    notifier: Arc<dyn Notifier>,
    session: Arc<AuthSession>,
    events: broadcast::Sender<ClientEvent>,
}

/// Marks one action as outstanding until dropped.
#[must_use = "the action stops counting as busy as soon as the guard is dropped"]
pub struct BusyGuard<'a> {
    activity: &'a Activity,
    action: &'static str,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let remaining = self.activity.in_flight.fetch_sub(1, Ordering::AcqRel) - 1;
        debug!(action = self.action, remaining, "activity: action settled");
    }
}

impl Activity {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        session: Arc<AuthSession>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            last_error: Mutex::new(None),
            notifier,
            session,
            events,
        }
    }

    pub fn begin(&self, action: &'static str) -> BusyGuard<'_> {
        let in_flight = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(action, in_flight, "activity: action started");
        BusyGuard {
            activity: self,
            action,
        }
    }

    /// Records a failed outcome and hands the result back unchanged.
    ///
    /// The recorded message is the server's own when it sent one, otherwise
    /// `default_message`. An unauthorized failure also ends the auth session.
    pub async fn settle<T>(
        &self,
        action: &'static str,
        default_message: &str,
        result: Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let message = err
            .user_message()
            .map(str::to_string)
            .unwrap_or_else(|| default_message.to_string());
        warn!(action, error = %err, "activity: {message}");

        self.set_error(message.clone());
        self.notifier.error(&message);
        let _ = self.events.send(ClientEvent::Error {
            action,
            message,
        });

        if err.is_unauthorized() {
            warn!(action, "activity: session rejected by server, signing out");
            self.session.teardown().await;
            let _ = self.events.send(ClientEvent::LoginRequired);
        }

        Err(err)
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_error(&self, message: impl Into<String>) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.into());
    }

    pub fn clear_error(&self) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
#[path = "tests/activity_tests.rs"]
mod tests;

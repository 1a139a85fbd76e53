use std::sync::Arc;

use anyhow::{Context, Result};
use storage::Storage;
use tokio::sync::broadcast;
use tracing::{error, info};

pub mod activity;
pub mod admin;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod movies;
pub mod notify;
pub mod persistence;
pub mod reservations;
pub mod routes;
pub mod screenings;
pub mod theaters;
pub mod transport;

pub use activity::Activity;
pub use admin::AdminStore;
pub use auth::{AuthSession, AuthState, AuthStore};
pub use config::Settings;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use movies::MovieStore;
pub use notify::{LogNotifier, Notifier, RecordingNotifier};
pub use persistence::{KeyValueStore, MemoryStore};
pub use reservations::ReservationStore;
pub use routes::{Navigation, Route};
pub use screenings::ScreeningStore;
pub use theaters::TheaterStore;
pub use transport::HttpGateway;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    SessionChanged(AuthState),
    /// The server rejected the bearer token; the session has been cleared.
    LoginRequired,
    Error {
        action: &'static str,
        message: String,
    },
}

/// One booking client: the auth session, every entity-family store and the
/// shared busy/error state they report into.
pub struct CinemaClient {
    gateway: Arc<dyn Gateway>,
    session: Arc<AuthSession>,
    activity: Arc<Activity>,
    notifier: Arc<dyn Notifier>,
    events: broadcast::Sender<ClientEvent>,
    auth: AuthStore,
    movies: MovieStore,
    screenings: ScreeningStore,
    theaters: TheaterStore,
    reservations: ReservationStore,
    admin: AdminStore,
}

impl CinemaClient {
    /// Builds a client around an existing gateway, restoring any session
    /// persisted in `store`.
    pub async fn new(
        gateway: Arc<dyn Gateway>,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let session = AuthSession::restore(store, events.clone()).await;
        Self::assemble(gateway, session, notifier, events)
    }

    /// Opens the SQLite session store and an HTTP gateway that signs its
    /// requests with the restored session.
    pub async fn connect(settings: &Settings, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let storage = Storage::new(&settings.storage_url)
            .await
            .with_context(|| format!("failed to open storage at '{}'", settings.storage_url))?;
        storage.health_check().await?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let session = AuthSession::restore(Arc::new(storage), events.clone()).await;
        let gateway = HttpGateway::new(
            &settings.api_url,
            session.clone(),
            settings.request_timeout(),
        )?;
        info!(
            api_url = %gateway.base_url(),
            authenticated = session.is_authenticated(),
            "client: connected"
        );
        Ok(Self::assemble(Arc::new(gateway), session, notifier, events))
    }

    fn assemble(
        gateway: Arc<dyn Gateway>,
        session: Arc<AuthSession>,
        notifier: Arc<dyn Notifier>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        let activity = Arc::new(Activity::new(
            notifier.clone(),
            session.clone(),
            events.clone(),
        ));
        Self {
            auth: AuthStore::new(gateway.clone(), activity.clone(), session.clone()),
            movies: MovieStore::new(gateway.clone(), activity.clone()),
            screenings: ScreeningStore::new(gateway.clone(), activity.clone()),
            theaters: TheaterStore::new(gateway.clone(), activity.clone()),
            reservations: ReservationStore::new(gateway.clone(), activity.clone()),
            admin: AdminStore::new(gateway.clone(), activity.clone()),
            gateway,
            session,
            activity,
            notifier,
            events,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    pub fn movies(&self) -> &MovieStore {
        &self.movies
    }

    pub fn screenings(&self) -> &ScreeningStore {
        &self.screenings
    }

    pub fn theaters(&self) -> &TheaterStore {
        &self.theaters
    }

    pub fn reservations(&self) -> &ReservationStore {
        &self.reservations
    }

    pub fn admin(&self) -> &AdminStore {
        &self.admin
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn navigate(&self, route: &Route) -> Navigation {
        routes::guard(route, &self.session)
    }

    /// Reports an error that escaped every action handler. The user sees
    /// only the generic message.
    pub fn report_unhandled(&self, err: &anyhow::Error) {
        error!("client: unhandled error: {err:#}");
        self.notifier.error(notify::GENERIC_ERROR_MESSAGE);
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

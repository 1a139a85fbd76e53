//! Authentication session and the transitions that change it.
//!
//! [`AuthSession`] is the single holder of the signed-in user and bearer
//! token. It mirrors both into a [`KeyValueStore`] so a restarted client comes
//! back signed in. [`AuthStore`] drives the remote register/login/logout
//! calls through the action protocol and applies their outcome.

use std::sync::{Arc, PoisonError, RwLock};

use shared::{
    domain::User,
    protocol::{Credentials, ProfileUpdate, Registration},
};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    activity::Activity,
    error::GatewayError,
    gateway::Gateway,
    persistence::{KeyValueStore, TOKEN_KEY, USER_KEY},
    transport::CredentialSource,
    ClientEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated,
}

#[derive(Default)]
struct SessionState {
    user: Option<User>,
    token: Option<String>,
}

pub struct AuthSession {
    state: RwLock<SessionState>,
    store: Arc<dyn KeyValueStore>,
    events: broadcast::Sender<ClientEvent>,
}

impl AuthSession {
    /// Loads whatever session was persisted by a previous run.
    ///
    /// A missing or unreadable user record leaves the user empty; the token
    /// alone still counts as signed in.
    pub async fn restore(
        store: Arc<dyn KeyValueStore>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Arc<Self> {
        let token = match store.get(TOKEN_KEY).await {
            Ok(token) => token.filter(|token| !token.is_empty()),
            Err(err) => {
                warn!("auth: failed to read persisted token: {err:#}");
                None
            }
        };
        let user = match store.get(USER_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(err) => {
                    warn!("auth: ignoring malformed persisted user: {err}");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!("auth: failed to read persisted user: {err:#}");
                None
            }
        };

        if token.is_some() {
            info!(
                user_id = user.as_ref().map(|user| user.id.0),
                "auth: restored persisted session"
            );
        }

        Arc::new(Self {
            state: RwLock::new(SessionState { user, token }),
            store,
            events,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|state| state.token.is_some())
    }

    pub fn is_admin(&self) -> bool {
        self.read(|state| {
            state.token.is_some() && state.user.as_ref().is_some_and(User::is_admin)
        })
    }

    pub fn state(&self) -> AuthState {
        if self.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        }
    }

    pub fn user(&self) -> Option<User> {
        self.read(|state| state.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.read(|state| state.token.clone())
    }

    pub(crate) async fn establish(&self, user: User, token: String) {
        let user_json = serde_json::to_string(&user);
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.user = Some(user);
            state.token = Some(token.clone());
        }
        match user_json {
            Ok(user_json) => {
                self.persist(&[(TOKEN_KEY, token.as_str()), (USER_KEY, user_json.as_str())])
                    .await
            }
            Err(err) => warn!("auth: failed to encode user for persistence: {err}"),
        }
        self.announce();
    }

    pub(crate) async fn replace_token(&self, token: String) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .token = Some(token.clone());
        self.persist(&[(TOKEN_KEY, token.as_str())]).await;
        self.announce();
    }

    pub(crate) async fn replace_user(&self, user: User) {
        let user_json = serde_json::to_string(&user);
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .user = Some(user);
        match user_json {
            Ok(user_json) => self.persist(&[(USER_KEY, user_json.as_str())]).await,
            Err(err) => warn!("auth: failed to encode user for persistence: {err}"),
        }
    }

    /// Forgets the user and token in memory and in persisted storage. A
    /// session that holds neither is left alone and not re-announced.
    pub(crate) async fn teardown(&self) {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if state.user.is_none() && state.token.is_none() {
                return;
            }
            state.user = None;
            state.token = None;
        }
        if let Err(err) = self.store.remove_many(&[TOKEN_KEY, USER_KEY]).await {
            warn!("auth: failed to clear persisted session: {err:#}");
        }
        self.announce();
    }

    async fn persist(&self, entries: &[(&str, &str)]) {
        if let Err(err) = self.store.set_many(entries).await {
            warn!("auth: failed to persist session: {err:#}");
        }
    }

    fn announce(&self) {
        let _ = self.events.send(ClientEvent::SessionChanged(self.state()));
    }

    fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl CredentialSource for AuthSession {
    fn bearer_token(&self) -> Option<String> {
        self.token()
    }
}

pub struct AuthStore {
    gateway: Arc<dyn Gateway>,
    activity: Arc<Activity>,
    session: Arc<AuthSession>,
}

impl AuthStore {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        activity: Arc<Activity>,
        session: Arc<AuthSession>,
    ) -> Self {
        Self {
            gateway,
            activity,
            session,
        }
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    pub async fn register(&self, registration: &Registration) -> Result<User, GatewayError> {
        const ACTION: &str = "auth.register";
        let _busy = self.activity.begin(ACTION);
        let response = self
            .activity
            .settle(
                ACTION,
                "Registration failed",
                self.gateway.register(registration).await,
            )
            .await?;
        info!(user_id = response.user.id.0, "auth: registered");
        self.session
            .establish(response.user.clone(), response.token)
            .await;
        Ok(response.user)
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<User, GatewayError> {
        const ACTION: &str = "auth.login";
        let _busy = self.activity.begin(ACTION);
        let response = self
            .activity
            .settle(ACTION, "Login failed", self.gateway.login(credentials).await)
            .await?;
        info!(user_id = response.user.id.0, "auth: logged in");
        self.session
            .establish(response.user.clone(), response.token)
            .await;
        Ok(response.user)
    }

    /// Signs out. The local session is cleared even when the remote call
    /// fails; that failure is recorded but not returned.
    pub async fn logout(&self) {
        const ACTION: &str = "auth.logout";
        let _busy = self.activity.begin(ACTION);
        let outcome = self
            .activity
            .settle(ACTION, "Logout failed", self.gateway.logout().await)
            .await;
        if let Err(err) = outcome {
            warn!("auth: remote logout failed, clearing local session anyway: {err}");
        }
        self.session.teardown().await;
        info!("auth: logged out");
    }

    /// Swaps the bearer token for a fresh one. A failed refresh signs the
    /// user out before the error is returned.
    pub async fn refresh_token(&self) -> Result<String, GatewayError> {
        const ACTION: &str = "auth.refresh_token";
        let _busy = self.activity.begin(ACTION);
        let outcome = self
            .activity
            .settle(
                ACTION,
                "Token refresh failed",
                self.gateway.refresh_token().await,
            )
            .await;
        match outcome {
            Ok(response) => {
                self.session.replace_token(response.token.clone()).await;
                Ok(response.token)
            }
            Err(err) => {
                self.session.teardown().await;
                Err(err)
            }
        }
    }

    pub async fn get_profile(&self) -> Result<User, GatewayError> {
        const ACTION: &str = "auth.get_profile";
        let _busy = self.activity.begin(ACTION);
        let user = self
            .activity
            .settle(
                ACTION,
                "Failed to load profile",
                self.gateway.get_profile().await,
            )
            .await?;
        self.session.replace_user(user.clone()).await;
        Ok(user)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, GatewayError> {
        const ACTION: &str = "auth.update_profile";
        let _busy = self.activity.begin(ACTION);
        let user = self
            .activity
            .settle(
                ACTION,
                "Failed to update profile",
                self.gateway.update_profile(update).await,
            )
            .await?;
        self.session.replace_user(user.clone()).await;
        Ok(user)
    }

    pub async fn delete_account(&self) -> Result<(), GatewayError> {
        const ACTION: &str = "auth.delete_account";
        let _busy = self.activity.begin(ACTION);
        self.activity
            .settle(
                ACTION,
                "Failed to delete account",
                self.gateway.delete_account().await,
            )
            .await?;
        self.session.teardown().await;
        info!("auth: account deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;

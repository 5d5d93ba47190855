use liberclaw_api::endpoints::users::{UpdateProfile, UserProfile};
use liberclaw_api::{Api, ApiError, Client};
use liberclaw_auth::TokenPair;
use tokio::sync::watch;

/// Where the user stands with the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Stored credentials have not been checked yet.
    Loading,
    Unauthenticated,
    Authenticated(UserProfile),
}

impl SessionState {
    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// Session state machine owned by the application root.
///
/// Every transition is published on a watch channel; UI code calls
/// [`AuthSession::subscribe`] instead of polling.
pub struct AuthSession {
    client: Client,
    state: watch::Sender<SessionState>,
}

impl AuthSession {
    pub fn new(client: Client) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self { client, state }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Validate stored credentials. Always ends in a terminal state; a
    /// session that cannot be validated is discarded.
    pub async fn restore(&self) -> SessionState {
        let stored = match self.client.tokens().read() {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!("Failed to read stored tokens: {}", err);
                None
            }
        };

        if stored.is_none() {
            tracing::info!("No stored session");
            self.transition(SessionState::Unauthenticated);
            return self.state();
        }

        match self.client.send(Api::users().me()).await {
            Ok(user) => self.transition(SessionState::Authenticated(user)),
            Err(err) => {
                tracing::warn!("Stored session rejected: {}", err);
                self.clear_tokens();
                self.transition(SessionState::Unauthenticated);
            }
        }
        self.state()
    }

    /// Adopt a freshly issued token pair. If the profile fetch fails the
    /// session is Unauthenticated but the tokens are left in place.
    pub async fn login(&self, tokens: TokenPair) -> Result<UserProfile, ApiError> {
        self.client.tokens().write(&tokens)?;

        match self.client.send(Api::users().me()).await {
            Ok(user) => {
                self.transition(SessionState::Authenticated(user.clone()));
                Ok(user)
            }
            Err(err) => {
                tracing::warn!("Login succeeded but profile fetch failed: {}", err);
                self.transition(SessionState::Unauthenticated);
                Err(err)
            }
        }
    }

    pub async fn login_as_guest(&self, device_id: &str) -> Result<UserProfile, ApiError> {
        let tokens = self.client.send(Api::auth().guest(device_id)).await?;
        self.login(tokens).await
    }

    /// Returns the backend's confirmation message.
    pub async fn request_magic_link(&self, email: &str) -> Result<String, ApiError> {
        let response = self.client.send(Api::auth().magic_link(email)).await?;
        Ok(response.message)
    }

    pub async fn verify_magic_link(
        &self,
        email: &str,
        code: &str,
    ) -> Result<UserProfile, ApiError> {
        let tokens = self
            .client
            .send(Api::auth().verify_code(email, code))
            .await?;
        self.login(tokens).await
    }

    /// Re-fetch the profile without touching tokens.
    pub async fn refresh_user(&self) -> Result<UserProfile, ApiError> {
        match self.client.send(Api::users().me()).await {
            Ok(user) => {
                self.transition(SessionState::Authenticated(user.clone()));
                Ok(user)
            }
            Err(err) => {
                self.observe(&err);
                Err(err)
            }
        }
    }

    pub async fn update_profile(&self, update: UpdateProfile) -> Result<UserProfile, ApiError> {
        match self.client.send(update).await {
            Ok(user) => {
                self.transition(SessionState::Authenticated(user.clone()));
                Ok(user)
            }
            Err(err) => {
                self.observe(&err);
                Err(err)
            }
        }
    }

    /// Sign out locally, revoking the refresh token if possible. Never
    /// fails, including when already signed out.
    pub async fn logout(&self) {
        let stored = self.client.tokens().read().unwrap_or_else(|err| {
            tracing::warn!("Failed to read stored tokens: {}", err);
            None
        });

        if let Some(tokens) = stored {
            if let Err(err) = self
                .client
                .send(Api::auth().logout(tokens.refresh_token))
                .await
            {
                tracing::warn!("Failed to revoke session: {}", err);
            }
        }

        self.clear_tokens();
        self.transition(SessionState::Unauthenticated);
    }

    /// Revoke every session of this user. Signs out locally even when the
    /// revoke fails; the failure is returned for display.
    pub async fn logout_everywhere(&self) -> Result<(), ApiError> {
        let result = self.client.send(Api::auth().logout_all()).await;
        if let Err(err) = &result {
            tracing::warn!("Failed to revoke all sessions: {}", err);
        }

        self.clear_tokens();
        self.transition(SessionState::Unauthenticated);
        result.map(|_| ())
    }

    /// Tear the session down if `err` means it can no longer be refreshed.
    /// Returns true when that happened.
    pub fn observe(&self, err: &ApiError) -> bool {
        if !err.is_session_expired() {
            return false;
        }

        tracing::info!("Session expired: {}", err);
        self.clear_tokens();
        self.transition(SessionState::Unauthenticated);
        true
    }

    fn clear_tokens(&self) {
        if let Err(err) = self.client.tokens().clear() {
            tracing::error!("Failed to clear stored tokens: {}", err);
        }
    }

    fn transition(&self, next: SessionState) {
        match &next {
            SessionState::Authenticated(user) => {
                tracing::info!("Session authenticated as {}", user.label())
            }
            SessionState::Unauthenticated => tracing::info!("Session unauthenticated"),
            SessionState::Loading => tracing::debug!("Session loading"),
        }
        self.state.send_replace(next);
    }
}

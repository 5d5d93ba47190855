pub mod endpoints;
mod error;
mod macros;
mod refresh;
pub mod repositories;
mod request;
pub mod stream;
mod transport;

pub use crate::error::ApiError;
pub use crate::request::{EmptyResponse, FromResponse, NoData, Request, RequestData};
pub use crate::stream::{StreamEnd, StreamingChatClient};
use liberclaw_auth::{Settings, TokenPair, TokenStore};
use refresh::RefreshCoordinator;
use repositories::*;
use std::sync::Arc;
use std::time::Duration;
use transport::Transport;
use uuid::Uuid;

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Executes typed requests against the LiberClaw API.
///
/// Cloning is cheap; clones share the connection pool, the token store and
/// the refresh coordinator, so a 401 seen by any clone joins the same
/// refresh.
#[derive(Clone)]
pub struct Client {
    transport: Transport,
    tokens: Arc<dyn TokenStore>,
    refresh: Arc<RefreshCoordinator>,
    stream_idle_timeout: Duration,
}

impl Client {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        Self::from_settings(
            &Settings {
                server_url: base_url.into(),
                ..Settings::default()
            },
            tokens,
        )
    }

    pub fn from_settings(settings: &Settings, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        // No client-wide timeout: it would also cap long-lived chat streams.
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .connect_timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            transport: Transport::new(http, &settings.server_url, settings.request_timeout()),
            tokens,
            refresh: Arc::new(RefreshCoordinator::default()),
            stream_idle_timeout: settings.stream_idle_timeout(),
        })
    }

    /// Override the chat stream inactivity bound.
    pub fn with_stream_idle_timeout(mut self, timeout: Duration) -> Self {
        self.stream_idle_timeout = timeout;
        self
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub async fn send<R>(&self, request: R) -> Result<R::Response, ApiError>
    where
        R: Request,
    {
        if !request.authenticated() {
            return self.transport.execute(&request, None).await;
        }

        let access_token = self.tokens.read()?.map(|tokens| tokens.access_token);
        match self.transport.execute(&request, access_token.as_deref()).await {
            // Without a token there is nothing to refresh.
            Err(err) if err.is_unauthorized() && access_token.is_some() => {
                tracing::debug!("{} returned 401, refreshing session", request.endpoint());
                let tokens = self.refresh_tokens(access_token.as_deref()).await?;
                // One retry only; a second 401 goes back to the caller.
                self.transport
                    .execute(&request, Some(&tokens.access_token))
                    .await
            }
            result => result,
        }
    }

    /// Exchange the stored refresh token for a new pair, joining any refresh
    /// already in flight.
    ///
    /// `stale_access_token` is the access token a rejected request carried.
    /// When the store holds a different token, or `None` is passed while any
    /// token is stored, no exchange happens and the stored pair is returned:
    /// `None` means "no rejected token known", not "force a refresh".
    pub async fn refresh_tokens(
        &self,
        stale_access_token: Option<&str>,
    ) -> Result<TokenPair, ApiError> {
        self.refresh
            .refresh(&self.transport, &self.tokens, stale_access_token)
            .await
    }

    /// Streaming chat client sharing this client's connection pool and
    /// token store.
    pub fn chat(&self, agent_id: Uuid) -> StreamingChatClient {
        StreamingChatClient::new(
            self.transport.clone(),
            self.tokens.clone(),
            agent_id,
            self.stream_idle_timeout,
        )
    }
}

pub struct Api;

impl Api {
    pub fn agents() -> AgentRepository {
        AgentRepository::new()
    }

    pub fn auth() -> AuthRepository {
        AuthRepository::new()
    }

    pub fn chat(agent_id: Uuid) -> ChatRepository {
        ChatRepository::new(agent_id)
    }

    pub fn usage() -> UsageRepository {
        UsageRepository::new()
    }

    pub fn users() -> UserRepository {
        UserRepository::new()
    }
}

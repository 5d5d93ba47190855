use crate::endpoints::auth::RefreshTokens;
use crate::error::ApiError;
use crate::transport::Transport;
use futures::future::{BoxFuture, FutureExt, Shared};
use liberclaw_auth::{TokenPair, TokenStore};
use reqwest::StatusCode;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type RefreshFuture = Shared<BoxFuture<'static, Result<TokenPair, ApiError>>>;

/// Collapses concurrent refresh demand into a single `POST /auth/refresh`.
///
/// Refresh tokens are single-use, so two refreshes racing would invalidate
/// one another. Every caller that arrives while a refresh is pending awaits
/// the same shared future and sees the same outcome.
#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    slot: Arc<Mutex<Slot>>,
}

#[derive(Default)]
struct Slot {
    next_id: u64,
    inflight: Option<(u64, RefreshFuture)>,
}

impl Slot {
    /// Forget the flight `id` if it is still the current one.
    fn settle(&mut self, id: u64) {
        if matches!(&self.inflight, Some((current, _)) if *current == id) {
            self.inflight = None;
        }
    }
}

impl RefreshCoordinator {
    /// `stale_access_token` is the token the failed request carried. If the
    /// store already holds a different one, a refresh finished after that
    /// request left and the stored pair is returned as is.
    pub(crate) async fn refresh(
        &self,
        transport: &Transport,
        tokens: &Arc<dyn TokenStore>,
        stale_access_token: Option<&str>,
    ) -> Result<TokenPair, ApiError> {
        let flight = {
            let mut slot = lock(&self.slot);
            match &slot.inflight {
                Some((_, flight)) => {
                    tracing::debug!("Joining in-flight token refresh");
                    flight.clone()
                }
                None => {
                    if let Some(current) = tokens.read()? {
                        if stale_access_token != Some(current.access_token.as_str()) {
                            tracing::debug!("Token already rotated, skipping refresh");
                            return Ok(current);
                        }
                    }

                    let id = slot.next_id;
                    slot.next_id += 1;
                    let flight = spawn_refresh(
                        transport.clone(),
                        tokens.clone(),
                        self.slot.clone(),
                        id,
                    );
                    slot.inflight = Some((id, flight.clone()));
                    flight
                }
            }
        };

        flight.await
    }
}

/// Frees the slot however the refresh task ends, panics included.
struct SettleOnDrop {
    slot: Arc<Mutex<Slot>>,
    id: u64,
}

impl Drop for SettleOnDrop {
    fn drop(&mut self) {
        lock(&self.slot).settle(self.id);
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The exchange runs on its own task so the rotated pair is persisted and
/// the slot freed even if every waiting caller is dropped.
fn spawn_refresh(
    transport: Transport,
    tokens: Arc<dyn TokenStore>,
    slot: Arc<Mutex<Slot>>,
    id: u64,
) -> RefreshFuture {
    // The caller holds the slot lock until `inflight` is set, so the guard
    // always settles after it.
    let handle = tokio::spawn(async move {
        let _settle = SettleOnDrop { slot, id };
        run_refresh(transport, tokens).await
    });
    async move {
        handle.await.unwrap_or_else(|err| {
            Err(ApiError::Refresh(Box::new(ApiError::Internal(format!(
                "refresh task failed: {}",
                err
            )))))
        })
    }
    .boxed()
    .shared()
}

async fn run_refresh(
    transport: Transport,
    tokens: Arc<dyn TokenStore>,
) -> Result<TokenPair, ApiError> {
    match exchange(&transport, tokens.as_ref()).await {
        Ok(pair) => {
            tracing::info!("Session tokens refreshed");
            Ok(pair)
        }
        Err(err) => {
            tracing::warn!("Token refresh failed: {}", err);
            if let Err(clear_err) = tokens.clear() {
                tracing::error!("Failed to clear tokens after refresh failure: {}", clear_err);
            }
            Err(ApiError::Refresh(Box::new(err)))
        }
    }
}

async fn exchange(transport: &Transport, tokens: &dyn TokenStore) -> Result<TokenPair, ApiError> {
    let current = tokens.read()?.ok_or_else(|| ApiError::Http {
        status: StatusCode::UNAUTHORIZED,
        message: "Not signed in".to_string(),
    })?;

    let pair = transport
        .execute(&RefreshTokens::new(current.refresh_token), None)
        .await?;

    // Both tokens are replaced together
    tokens.write(&pair)?;
    Ok(pair)
}

mod sse;

pub use sse::{SseDecoder, SseFrame, StreamEvent, parse_payload};

use crate::endpoints::{AgentId, chat::{ChatMessage, SendMessage}};
use crate::error::ApiError;
use crate::transport::Transport;
use futures::{Stream, StreamExt};
use liberclaw_auth::TokenStore;
use reqwest::header::ACCEPT;
use std::str::Utf8Error;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a chat stream ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The server closed the stream.
    Completed,
    /// The caller cancelled; not an error.
    Cancelled,
}

/// Sends chat messages to one agent and decodes the streamed reply.
///
/// Unlike [`crate::Client::send`] a stream is never refreshed or retried:
/// an expired token surfaces as a 401 error to the caller.
#[derive(Clone)]
pub struct StreamingChatClient {
    transport: Transport,
    tokens: Arc<dyn TokenStore>,
    agent_id: AgentId,
    idle_timeout: Duration,
}

impl StreamingChatClient {
    pub(crate) fn new(
        transport: Transport,
        tokens: Arc<dyn TokenStore>,
        agent_id: AgentId,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            tokens,
            agent_id,
            idle_timeout,
        }
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    /// Send `message` and deliver every reply event to `on_event` in arrival
    /// order.
    ///
    /// Returns `Err` at most once per call (transport failure, non-2xx,
    /// or inactivity timeout). Cancelling `cancel` ends the call with
    /// [`StreamEnd::Cancelled`] and no further events.
    pub async fn send<F>(
        &self,
        message: &str,
        cancel: &CancellationToken,
        on_event: F,
    ) -> Result<StreamEnd, ApiError>
    where
        F: FnMut(ChatMessage),
    {
        if cancel.is_cancelled() {
            return Ok(StreamEnd::Cancelled);
        }

        let url = self.transport.url(&format!("/chat/{}", self.agent_id));
        let mut builder = self
            .transport
            .http()
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .json(&SendMessage {
                message: message.to_string(),
            });
        if let Some(tokens) = self.tokens.read()? {
            builder = builder.bearer_auth(tokens.access_token);
        }

        tracing::debug!("POST {} (stream)", url);
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
            response = tokio::time::timeout(self.idle_timeout, builder.send()) => match response {
                Ok(response) => response?,
                Err(_) => {
                    tracing::warn!("No response from {} within {:?}", url, self.idle_timeout);
                    return Err(ApiError::Timeout);
                }
            },
        };

        let status = response.status();
        if !status.is_success() {
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
                body = tokio::time::timeout(self.idle_timeout, response.bytes()) => match body {
                    Ok(body) => body?,
                    Err(_) => {
                        tracing::warn!(
                            "Error body from {} stalled for {:?}",
                            url,
                            self.idle_timeout
                        );
                        return Err(ApiError::Timeout);
                    }
                },
            };
            return Err(ApiError::from_response(status, &body));
        }

        pump(response.bytes_stream(), self.idle_timeout, cancel, on_event).await
    }
}

/// Decode an SSE byte stream into chat events.
///
/// The inactivity watchdog is re-armed on every chunk, keepalive-only
/// chunks included. When it fires the stream is dropped, which cancels the
/// underlying read, and [`ApiError::Timeout`] is returned.
pub async fn pump<S, B, E, F>(
    stream: S,
    idle_timeout: Duration,
    cancel: &CancellationToken,
    mut on_event: F,
) -> Result<StreamEnd, ApiError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<ApiError>,
    F: FnMut(ChatMessage),
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = SseDecoder::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Chat stream cancelled");
                return Ok(StreamEnd::Cancelled);
            }
            next = tokio::time::timeout(idle_timeout, stream.next()) => next,
        };

        let chunk = match next {
            Err(_) => {
                tracing::warn!("Chat stream idle for {:?}, giving up", idle_timeout);
                return Err(ApiError::Timeout);
            }
            Ok(None) => break,
            Ok(Some(Err(err))) => return Err(err.into()),
            Ok(Some(Ok(chunk))) => chunk,
        };

        decoder.push(chunk.as_ref());
        while let Some(frame) = decoder.next_frame() {
            let Some(message) = decode_frame(frame) else {
                continue;
            };
            if cancel.is_cancelled() {
                return Ok(StreamEnd::Cancelled);
            }
            on_event(message);
        }
    }

    if decoder.has_partial_frame() {
        tracing::debug!("Discarding incomplete trailing frame");
    }
    Ok(StreamEnd::Completed)
}

/// Malformed frames are logged and skipped; they never end the stream.
fn decode_frame(frame: Result<SseFrame, Utf8Error>) -> Option<ChatMessage> {
    let data = match frame {
        Ok(SseFrame { data: Some(data) }) => data,
        Ok(SseFrame { data: None }) => return None,
        Err(err) => {
            tracing::warn!("Skipping frame with invalid UTF-8: {}", err);
            return None;
        }
    };

    match parse_payload(&data) {
        Ok(StreamEvent::Keepalive) => None,
        Ok(StreamEvent::Message(message)) => Some(message),
        Err(err) => {
            tracing::warn!("Skipping malformed frame: {}", err);
            None
        }
    }
}

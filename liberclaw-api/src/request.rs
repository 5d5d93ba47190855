use crate::error::ApiError;
use crate::macros::json_response;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;

/// Payload attached to a request.
pub enum RequestData<T> {
    Empty,
    Query(T),
    Json(T),
}

/// A single typed API call.
///
/// Endpoints describe themselves; [`crate::Client`] decides how to send them.
pub trait Request {
    type Data: Serialize;
    type Response: FromResponse;

    const METHOD: Method = Method::GET;

    fn endpoint(&self) -> Cow<'_, str>;

    fn data(&self) -> RequestData<&Self::Data> {
        RequestData::Empty
    }

    /// Whether the bearer token is attached. Pre-session endpoints (login,
    /// guest creation, refresh, logout) must not try to attach a token that
    /// may not exist yet.
    fn authenticated(&self) -> bool {
        true
    }
}

/// Turns a successful (2xx) response into an endpoint's response type.
///
/// Most endpoints answer with JSON and implement this through
/// `json_response!`; file downloads keep the raw bytes.
pub trait FromResponse: Sized {
    fn from_response(
        status: StatusCode,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<Self, ApiError>;
}

/// Response type for endpoints that answer with 204 or a body nobody reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyResponse;

impl<'de> Deserialize<'de> for EmptyResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        IgnoredAny::deserialize(deserializer)?;
        Ok(EmptyResponse)
    }
}

json_response!(EmptyResponse);

/// Placeholder data type for requests that never send a payload.
#[derive(Debug, Serialize)]
pub struct NoData;

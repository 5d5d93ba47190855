use crate::error::ApiError;
use crate::request::{FromResponse, Request, RequestData};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Raw HTTP leg shared by the request executor, the refresh coordinator and
/// the chat stream. Knows nothing about tokens beyond attaching one.
#[derive(Clone)]
pub(crate) struct Transport {
    http: reqwest::Client,
    base_url: Arc<str>,
    request_timeout: Duration,
}

impl Transport {
    pub(crate) fn new(http: reqwest::Client, base_url: &str, request_timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').into(),
            request_timeout,
        }
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    pub(crate) async fn execute<R>(
        &self,
        request: &R,
        access_token: Option<&str>,
    ) -> Result<R::Response, ApiError>
    where
        R: Request,
    {
        let url = self.url(&request.endpoint());
        tracing::debug!("{} {}", R::METHOD, url);

        let mut builder = self
            .http
            .request(R::METHOD, &url)
            .timeout(self.request_timeout);
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        builder = match request.data() {
            RequestData::Empty => builder,
            RequestData::Query(query) => builder.query(query),
            // `json` also sets the content type
            RequestData::Json(body) => builder.json(body),
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        if !status.is_success() {
            tracing::debug!("{} {} failed with {}", R::METHOD, url, status);
            return Err(ApiError::from_response(status, &body));
        }

        <R::Response as FromResponse>::from_response(status, &headers, &body)
    }
}

/// 204 and empty 2xx bodies decode as JSON `null`, so unit-like response
/// types succeed and anything that needs data fails to decode.
pub(crate) fn decode_body<T>(status: StatusCode, body: &[u8]) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    if status == StatusCode::NO_CONTENT || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_value(serde_json::Value::Null)?);
    }

    Ok(serde_json::from_slice(body)?)
}

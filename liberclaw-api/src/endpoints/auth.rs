use crate::macros::{json_response, setter};
use crate::request::{EmptyResponse, NoData, Request, RequestData};
use liberclaw_auth::TokenPair;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// Requests
//
// Everything here except `LogoutAll` runs before a session exists (or while
// it is being replaced), so no bearer token is attached.

#[derive(Debug, Clone, Serialize)]
pub struct RefreshTokens {
    refresh_token: String,
}

impl RefreshTokens {
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
        }
    }
}

impl Request for RefreshTokens {
    type Data = Self;
    type Response = TokenPair;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/auth/refresh".into()
    }

    fn data(&self) -> RequestData<&Self> {
        RequestData::Json(self)
    }

    fn authenticated(&self) -> bool {
        false
    }
}

/// Revokes a single refresh token server-side.
#[derive(Debug, Clone, Serialize)]
pub struct Logout {
    refresh_token: String,
}

impl Logout {
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
        }
    }
}

impl Request for Logout {
    type Data = Self;
    type Response = EmptyResponse;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/auth/logout".into()
    }

    fn data(&self) -> RequestData<&Self> {
        RequestData::Json(self)
    }

    fn authenticated(&self) -> bool {
        false
    }
}

/// Revokes every session of the current user.
#[derive(Debug, Clone, Default)]
pub struct LogoutAll;

impl Request for LogoutAll {
    type Data = NoData;
    type Response = EmptyResponse;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/auth/logout/all".into()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GuestLogin {
    device_id: String,
}

impl GuestLogin {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
        }
    }
}

impl Request for GuestLogin {
    type Data = Self;
    type Response = TokenPair;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/auth/guest".into()
    }

    fn data(&self) -> RequestData<&Self> {
        RequestData::Json(self)
    }

    fn authenticated(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestMagicLink {
    email: String,
}

impl RequestMagicLink {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

impl Request for RequestMagicLink {
    type Data = Self;
    type Response = MagicLinkResponse;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/auth/login/email".into()
    }

    fn data(&self) -> RequestData<&Self> {
        RequestData::Json(self)
    }

    fn authenticated(&self) -> bool {
        false
    }
}

/// Exchanges either a magic-link token or an emailed 6-digit code for a
/// token pair.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyMagicLink {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl VerifyMagicLink {
    pub fn with_code(email: impl Into<String>, code: impl Into<String>) -> Self {
        Self::default().email(email).code(code)
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self::default().token(token)
    }

    setter!(opt token: String);
    setter!(opt email: String);
    setter!(opt code: String);
}

impl Request for VerifyMagicLink {
    type Data = Self;
    type Response = TokenPair;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/auth/verify-magic-link".into()
    }

    fn data(&self) -> RequestData<&Self> {
        RequestData::Json(self)
    }

    fn authenticated(&self) -> bool {
        false
    }
}

// Responses

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicLinkResponse {
    pub message: String,
}

json_response!(TokenPair, MagicLinkResponse);

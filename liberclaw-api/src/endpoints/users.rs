use crate::macros::{json_response, setter};
use crate::request::{NoData, Request, RequestData};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use uuid::Uuid;

// Common

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub tier: String,
    #[serde(default)]
    pub show_tool_calls: bool,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn is_guest(&self) -> bool {
        self.tier == "guest"
    }

    /// Best label for the user: display name, then email, then tier.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.tier)
    }
}

json_response!(UserProfile);

// Requests

#[derive(Debug, Clone, Default)]
pub struct GetProfile;

impl Request for GetProfile {
    type Data = NoData;
    type Response = UserProfile;

    fn endpoint(&self) -> Cow<'_, str> {
        "/users/me".into()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    show_tool_calls: Option<bool>,
}

impl UpdateProfile {
    pub fn new() -> Self {
        Self::default()
    }

    setter!(opt display_name: String);
    setter!(opt show_tool_calls: bool);
}

impl Request for UpdateProfile {
    type Data = Self;
    type Response = UserProfile;
    const METHOD: Method = Method::PATCH;

    fn endpoint(&self) -> Cow<'_, str> {
        "/users/me".into()
    }

    fn data(&self) -> RequestData<&Self> {
        RequestData::Json(self)
    }
}

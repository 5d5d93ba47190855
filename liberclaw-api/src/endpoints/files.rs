use super::AgentId;
use crate::error::ApiError;
use crate::request::{FromResponse, NoData, Request};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap, HeaderName};
use std::borrow::Cow;

// Requests

/// Downloads a file an agent announced with a `file` chat event. The backend
/// proxies it from the agent's VM.
#[derive(Debug, Clone)]
pub struct GetFile {
    agent_id: AgentId,
    path: String,
}

impl GetFile {
    pub fn new(agent_id: AgentId, path: impl Into<String>) -> Self {
        Self {
            agent_id,
            path: path.into(),
        }
    }
}

impl Request for GetFile {
    type Data = NoData;
    type Response = AgentFile;

    fn endpoint(&self) -> Cow<'_, str> {
        format!("/files/{}/{}", self.agent_id, encode_path(&self.path)).into()
    }
}

/// Keep `/` separators, escape what would end the path early.
fn encode_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for c in path.trim_start_matches('/').chars() {
        match c {
            '%' => encoded.push_str("%25"),
            '?' => encoded.push_str("%3F"),
            '#' => encoded.push_str("%23"),
            c => encoded.push(c),
        }
    }
    encoded
}

// Responses

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentFile {
    /// From `Content-Disposition`, when the backend sent one.
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl AgentFile {
    /// Name to save the file under: the backend's, else the last segment of
    /// the requested path. Directory parts are always dropped.
    pub fn save_name<'a>(&'a self, requested_path: &'a str) -> Option<&'a str> {
        self.file_name
            .as_deref()
            .and_then(base_name)
            .or_else(|| base_name(requested_path))
    }
}

fn base_name(path: &str) -> Option<&str> {
    path.rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

impl FromResponse for AgentFile {
    fn from_response(
        _status: StatusCode,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<Self, ApiError> {
        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        Ok(AgentFile {
            file_name: header(CONTENT_DISPOSITION)
                .as_deref()
                .and_then(disposition_file_name),
            content_type: header(CONTENT_TYPE),
            data: body.to_vec(),
        })
    }
}

/// `attachment; filename="report.pdf"` -> `report.pdf`
fn disposition_file_name(value: &str) -> Option<String> {
    value
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("filename="))
        .map(|name| name.trim_matches('"'))
        .find(|name| !name.is_empty())
        .map(str::to_string)
}

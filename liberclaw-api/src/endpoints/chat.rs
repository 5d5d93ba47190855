use super::AgentId;
use crate::macros::json_response;
use crate::request::{EmptyResponse, NoData, Request};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// Common

/// One application event of an agent conversation.
///
/// Keepalive frames exist only on the wire and are filtered out by the
/// stream decoder, so they have no variant here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatMessage {
    Text {
        #[serde(default)]
        content: String,
        /// `"user"` on echoed user turns, absent on agent output.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    ToolUse {
        name: String,
        /// Tool arguments; agents send either an object or a JSON string.
        #[serde(default)]
        input: serde_json::Value,
    },
    File {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Error {
        #[serde(default)]
        content: String,
    },
    Done,
}

impl ChatMessage {
    pub fn is_done(&self) -> bool {
        matches!(self, ChatMessage::Done)
    }
}

// Requests

/// Body of `POST /chat/{agent_id}`; sent by [`crate::StreamingChatClient`].
#[derive(Debug, Clone, Serialize)]
pub struct SendMessage {
    pub message: String,
}

/// Clears the conversation history held by the agent.
#[derive(Debug, Clone)]
pub struct ClearChat {
    agent_id: AgentId,
}

impl ClearChat {
    pub fn new(agent_id: AgentId) -> Self {
        Self { agent_id }
    }
}

impl Request for ClearChat {
    type Data = NoData;
    type Response = EmptyResponse;
    const METHOD: Method = Method::DELETE;

    fn endpoint(&self) -> Cow<'_, str> {
        format!("/chat/{}", self.agent_id).into()
    }
}

/// Proactive messages the agent produced while nobody was streaming.
#[derive(Debug, Clone)]
pub struct GetPending {
    agent_id: AgentId,
}

impl GetPending {
    pub fn new(agent_id: AgentId) -> Self {
        Self { agent_id }
    }
}

impl Request for GetPending {
    type Data = NoData;
    type Response = PendingMessages;

    fn endpoint(&self) -> Cow<'_, str> {
        format!("/chat/{}/pending", self.agent_id).into()
    }
}

// Responses

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingMessages {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

json_response!(PendingMessages);

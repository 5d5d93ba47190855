use super::AgentId;
use crate::macros::json_response;
use crate::request::{NoData, Request};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// Common

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub system_prompt: String,
    pub model: String,
    pub deployment_status: String,
    pub vm_url: Option<String>,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Only running agents accept chat messages.
    pub fn is_running(&self) -> bool {
        self.deployment_status == "running" && self.vm_url.is_some()
    }
}

// Requests
//
// Deployment is owned by the backend; the client only polls it.

#[derive(Debug, Clone, Default)]
pub struct ListAgents;

impl Request for ListAgents {
    type Data = NoData;
    type Response = AgentList;

    fn endpoint(&self) -> Cow<'_, str> {
        "/agents/".into()
    }
}

#[derive(Debug, Clone)]
pub struct GetAgent {
    agent_id: AgentId,
}

impl GetAgent {
    pub fn new(agent_id: AgentId) -> Self {
        Self { agent_id }
    }
}

impl Request for GetAgent {
    type Data = NoData;
    type Response = Agent;

    fn endpoint(&self) -> Cow<'_, str> {
        format!("/agents/{}", self.agent_id).into()
    }
}

#[derive(Debug, Clone)]
pub struct GetDeploymentStatus {
    agent_id: AgentId,
}

impl GetDeploymentStatus {
    pub fn new(agent_id: AgentId) -> Self {
        Self { agent_id }
    }
}

impl Request for GetDeploymentStatus {
    type Data = NoData;
    type Response = DeploymentStatus;

    fn endpoint(&self) -> Cow<'_, str> {
        format!("/agents/{}/status", self.agent_id).into()
    }
}

#[derive(Debug, Clone)]
pub struct CheckAgentHealth {
    agent_id: AgentId,
}

impl CheckAgentHealth {
    pub fn new(agent_id: AgentId) -> Self {
        Self { agent_id }
    }
}

impl Request for CheckAgentHealth {
    type Data = NoData;
    type Response = AgentHealth;

    fn endpoint(&self) -> Cow<'_, str> {
        format!("/agents/{}/health", self.agent_id).into()
    }
}

// Responses

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentList {
    pub agents: Vec<Agent>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentStatus {
    pub agent_id: AgentId,
    pub deployment_status: String,
    pub vm_url: Option<String>,
    #[serde(default)]
    pub steps: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentHealth {
    pub agent_id: AgentId,
    pub healthy: bool,
    pub vm_url: Option<String>,
}

json_response!(Agent, AgentList, DeploymentStatus, AgentHealth);

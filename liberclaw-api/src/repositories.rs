use crate::endpoints::{
    AgentId,
    agents::{CheckAgentHealth, GetAgent, GetDeploymentStatus, ListAgents},
    auth::{GuestLogin, Logout, LogoutAll, RefreshTokens, RequestMagicLink, VerifyMagicLink},
    chat::{ClearChat, GetPending},
    files::GetFile,
    usage::{GetUsage, GetUsageHistory},
    users::{GetProfile, UpdateProfile},
};

pub struct AgentRepository;

impl AgentRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn list(&self) -> ListAgents {
        ListAgents
    }

    pub fn get(&self, agent_id: AgentId) -> GetAgent {
        GetAgent::new(agent_id)
    }

    pub fn status(&self, agent_id: AgentId) -> GetDeploymentStatus {
        GetDeploymentStatus::new(agent_id)
    }

    pub fn health(&self, agent_id: AgentId) -> CheckAgentHealth {
        CheckAgentHealth::new(agent_id)
    }

    /// Fetch a file the agent reported in a `file` event.
    pub fn file(&self, agent_id: AgentId, path: impl Into<String>) -> GetFile {
        GetFile::new(agent_id, path)
    }
}

pub struct AuthRepository;

impl AuthRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn refresh(&self, refresh_token: impl Into<String>) -> RefreshTokens {
        RefreshTokens::new(refresh_token)
    }

    pub fn logout(&self, refresh_token: impl Into<String>) -> Logout {
        Logout::new(refresh_token)
    }

    pub fn logout_all(&self) -> LogoutAll {
        LogoutAll
    }

    pub fn guest(&self, device_id: impl Into<String>) -> GuestLogin {
        GuestLogin::new(device_id)
    }

    pub fn magic_link(&self, email: impl Into<String>) -> RequestMagicLink {
        RequestMagicLink::new(email)
    }

    pub fn verify_code(&self, email: impl Into<String>, code: impl Into<String>) -> VerifyMagicLink {
        VerifyMagicLink::with_code(email, code)
    }

    pub fn verify_token(&self, token: impl Into<String>) -> VerifyMagicLink {
        VerifyMagicLink::with_token(token)
    }
}

pub struct ChatRepository {
    agent_id: AgentId,
}

impl ChatRepository {
    pub fn new(agent_id: AgentId) -> Self {
        Self { agent_id }
    }

    pub fn clear(&self) -> ClearChat {
        ClearChat::new(self.agent_id)
    }

    pub fn pending(&self) -> GetPending {
        GetPending::new(self.agent_id)
    }
}

pub struct UsageRepository;

impl UsageRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn summary(&self) -> GetUsage {
        GetUsage
    }

    pub fn history(&self, days: u32) -> GetUsageHistory {
        GetUsageHistory::new(days)
    }
}

pub struct UserRepository;

impl UserRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn me(&self) -> GetProfile {
        GetProfile
    }

    pub fn update(&self) -> UpdateProfile {
        UpdateProfile::new()
    }
}

pub mod agents;
pub mod auth;
pub mod chat;
pub mod files;
pub mod usage;
pub mod users;

use uuid::Uuid;

/// Agents are addressed by the backend's UUID primary key.
pub type AgentId = Uuid;

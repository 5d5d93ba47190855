use liberclaw_api::endpoints::agents::{Agent, AgentHealth, DeploymentStatus};
use liberclaw_api::endpoints::chat::ChatMessage;
use liberclaw_api::endpoints::usage::{UsageHistory, UsageSummary};
use liberclaw_api::endpoints::users::UserProfile;
use liberclaw_api::ApiError;

/// Render one chat event as a line of output. Echoed user turns, hidden
/// tool calls and `done` produce nothing.
pub fn format_event(event: &ChatMessage, agent_name: &str, show_tool_calls: bool) -> Option<String> {
    match event {
        ChatMessage::Text { name: Some(name), .. } if name == "user" => None,
        ChatMessage::Text { content, .. } => Some(format!("{}: {}", agent_name, content)),
        ChatMessage::ToolUse { name, .. } if show_tool_calls => Some(format!("  [tool] {}", name)),
        ChatMessage::ToolUse { .. } => None,
        ChatMessage::File { path, caption } => Some(match caption {
            Some(caption) => format!("{}: [file] {} ({})", agent_name, path, caption),
            None => format!("{}: [file] {}", agent_name, path),
        }),
        ChatMessage::Error { content } if content.is_empty() => {
            Some("Warning: Something went wrong".to_string())
        }
        ChatMessage::Error { content } => Some(format!("Warning: {}", content)),
        ChatMessage::Done => None,
    }
}

pub fn format_agents(agents: &[Agent], current: Option<&Agent>) -> String {
    if agents.is_empty() {
        return "You have no agents yet. Create one in the web app.".to_string();
    }

    agents
        .iter()
        .enumerate()
        .map(|(i, agent)| {
            let marker = if current.is_some_and(|current| current.id == agent.id) {
                '*'
            } else {
                ' '
            };
            format!(
                "{} {}. {} [{}] {}",
                marker,
                i + 1,
                agent.name,
                agent.deployment_status,
                agent.model
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_status(status: &DeploymentStatus, health: Option<&AgentHealth>) -> String {
    let health = match health {
        Some(health) if health.healthy => "healthy",
        Some(_) => "unhealthy",
        None => "unknown",
    };
    format!("Deployment: {}\nHealth: {}", status.deployment_status, health)
}

pub fn format_profile(user: &UserProfile) -> String {
    let mut lines = vec![format!("Signed in as {}", user.label())];
    if let Some(email) = &user.email {
        let verified = if user.email_verified { "" } else { " (unverified)" };
        lines.push(format!("Email: {}{}", email, verified));
    }
    lines.push(format!("Tier: {}", user.tier));
    lines.push(format!(
        "Tool calls: {}",
        if user.show_tool_calls { "shown" } else { "hidden" }
    ));
    lines.join("\n")
}

pub fn format_usage(usage: &UsageSummary) -> String {
    format!(
        "Messages today: {}/{} ({} left)\nAgents: {}/{}\nTier: {}",
        usage.daily_messages_used,
        usage.daily_messages_limit,
        usage.messages_remaining(),
        usage.agent_count,
        usage.agent_limit,
        usage.tier
    )
}

pub fn format_history(history: &UsageHistory) -> String {
    let mut lines = vec![format!(
        "Last {} days: {} messages",
        history.days.len(),
        history.total_messages()
    )];
    lines.extend(
        history
            .days
            .iter()
            .map(|day| format!("  {}  {}", day.date.format("%a %d %b"), day.message_count)),
    );
    lines.join("\n")
}

pub fn format_error(err: &ApiError) -> String {
    match err {
        ApiError::Network(_) => "Could not reach the server.".to_string(),
        ApiError::Timeout => "The agent stopped responding.".to_string(),
        ApiError::Refresh(_) => "Your session has expired. Please sign in again.".to_string(),
        ApiError::Http { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hides_echoes_and_tool_calls() {
        let echo = ChatMessage::Text {
            content: "hi".into(),
            name: Some("user".into()),
        };
        let tool = ChatMessage::ToolUse {
            name: "bash".into(),
            input: serde_json::json!({}),
        };

        assert_eq!(format_event(&echo, "Claw", true), None);
        assert_eq!(format_event(&tool, "Claw", false), None);
        assert_eq!(
            format_event(&tool, "Claw", true),
            Some("  [tool] bash".to_string())
        );
        assert_eq!(format_event(&ChatMessage::Done, "Claw", true), None);
    }

    #[test]
    fn prefixes_agent_output() {
        let text = ChatMessage::Text {
            content: "Done!".into(),
            name: None,
        };
        let file = ChatMessage::File {
            path: "out/report.pdf".into(),
            caption: Some("Report".into()),
        };

        assert_eq!(
            format_event(&text, "Claw", false),
            Some("Claw: Done!".to_string())
        );
        assert_eq!(
            format_event(&file, "Claw", false),
            Some("Claw: [file] out/report.pdf (Report)".to_string())
        );
    }

    #[test]
    fn session_expiry_has_friendly_message() {
        let err = ApiError::Refresh(Box::new(ApiError::Timeout));
        assert_eq!(
            format_error(&err),
            "Your session has expired. Please sign in again."
        );
    }
}

use crate::events::AppCommand;

/// Map one line of user input to an AppCommand.
/// Returns None for blank lines.
pub fn handle_input(line: &str) -> Option<AppCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    // A leading `//` sends the rest as a message starting with `/`
    if let Some(escaped) = line.strip_prefix("//") {
        return Some(AppCommand::SendMessage(format!("/{}", escaped)));
    }

    let Some(command) = line.strip_prefix('/') else {
        return Some(AppCommand::SendMessage(line.to_string()));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    let command = match (name, arg) {
        ("agents", "") => AppCommand::ListAgents,
        ("use", "") => AppCommand::Invalid("Usage: /use <number|name|id>".to_string()),
        ("use", agent) => AppCommand::SelectAgent(agent.to_string()),
        ("status", "") => AppCommand::ShowAgentStatus,
        ("clear", "") => AppCommand::ClearChat,
        ("pending", "") => AppCommand::LoadPending,
        ("download", "") => AppCommand::Invalid("Usage: /download <path>".to_string()),
        ("download", path) => AppCommand::DownloadFile(path.to_string()),
        ("me", "") => AppCommand::ShowProfile,
        ("usage", "") => AppCommand::ShowUsage,
        ("name", "") => AppCommand::Invalid("Usage: /name <display name>".to_string()),
        ("name", display_name) => AppCommand::SetDisplayName(display_name.to_string()),
        ("tools", "") => AppCommand::ToggleToolCalls,
        ("logout", "") => AppCommand::Logout,
        ("logout", "all") => AppCommand::LogoutEverywhere,
        ("help", _) => AppCommand::Help,
        ("quit", _) | ("exit", _) => AppCommand::Quit,
        _ => AppCommand::Invalid(format!("Unknown command: {} (try /help)", line)),
    };

    Some(command)
}

pub const HELP: &str = "\
Type a message to chat with the selected agent.

  /agents          list your agents
  /use <agent>     select an agent by number, name or id
  /status          deployment status and health of the selected agent
  /clear           clear the conversation with the selected agent
  /pending         show messages the agent sent while you were away
  /download <path> save a file the agent shared to the current directory
  /me              show your profile
  /usage           show usage for today and the last week
  /name <name>     change your display name
  /tools           toggle showing tool calls
  /logout [all]    sign out (of every device with `all`)
  /quit            exit

Press Ctrl-C while a reply is streaming to stop it.";

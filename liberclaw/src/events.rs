/// Commands to execute (user input → API calls)
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    // Chat
    SendMessage(String),
    ClearChat,
    LoadPending,
    DownloadFile(String),

    // Agents
    ListAgents,
    SelectAgent(String),
    ShowAgentStatus,

    // Account
    ShowProfile,
    ShowUsage,
    SetDisplayName(String),
    ToggleToolCalls,
    Logout,
    LogoutEverywhere,

    // App
    Help,
    Quit,

    /// Unrecognised input; carries the message to show.
    Invalid(String),
}

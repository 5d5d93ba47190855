use liberclaw_api::endpoints::agents::Agent;

/// Terminal client state that outlives a single command.
#[derive(Debug, Default)]
pub struct AppState {
    pub agents: Vec<Agent>,
    pub current_agent: Option<Agent>,
    pub show_tool_calls: bool,
    pub should_quit: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the agent list, keeping the selection if the agent still
    /// exists. With no selection the first running agent is picked.
    pub fn set_agents(&mut self, agents: Vec<Agent>) {
        let selected = self.current_agent.as_ref().map(|agent| agent.id);
        self.current_agent = selected
            .and_then(|id| agents.iter().find(|agent| agent.id == id))
            .or_else(|| agents.iter().find(|agent| agent.is_running()))
            .cloned();
        self.agents = agents;
    }

    /// Select by 1-based position, id, or case-insensitive name.
    pub fn select_agent(&mut self, query: &str) -> Option<&Agent> {
        let found = match query.parse::<usize>() {
            Ok(position) if position >= 1 => self.agents.get(position - 1),
            _ => self.agents.iter().find(|agent| {
                agent.id.to_string() == query || agent.name.eq_ignore_ascii_case(query)
            }),
        };

        self.current_agent = Some(found?.clone());
        self.current_agent.as_ref()
    }

    /// Forget everything tied to the signed-in user.
    pub fn reset(&mut self) {
        self.agents.clear();
        self.current_agent = None;
        self.show_tool_calls = false;
    }
}

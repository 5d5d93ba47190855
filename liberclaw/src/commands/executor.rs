use liberclaw_api::endpoints::agents::Agent;
use liberclaw_api::endpoints::users::UpdateProfile;
use liberclaw_api::{Api, ApiError, Client, StreamEnd};
use tokio_util::sync::CancellationToken;

use crate::commands::handlers::HELP;
use crate::events::AppCommand;
use crate::session::AuthSession;
use crate::state::AppState;
use crate::ui;

/// Execute a command against the API, printing its outcome.
///
/// Errors are returned unprinted so the caller can both report them and
/// hand them to [`AuthSession::observe`].
pub async fn execute_command(
    command: AppCommand,
    state: &mut AppState,
    session: &AuthSession,
) -> Result<(), ApiError> {
    let client = session.client();

    match command {
        AppCommand::SendMessage(message) => {
            let Some(agent) = require_agent(state) else {
                return Ok(());
            };
            send_message(&message, &agent, state.show_tool_calls, session).await?;
        }
        AppCommand::ClearChat => {
            let Some(agent) = require_agent(state) else {
                return Ok(());
            };
            client.send(Api::chat(agent.id).clear()).await?;
            println!("Conversation with {} cleared.", agent.name);
        }
        AppCommand::LoadPending => {
            let Some(agent) = require_agent(state) else {
                return Ok(());
            };
            if !show_pending(&agent, state.show_tool_calls, client).await? {
                println!("No pending messages.");
            }
        }
        AppCommand::DownloadFile(path) => {
            let Some(agent) = require_agent(state) else {
                return Ok(());
            };
            let file = client.send(Api::agents().file(agent.id, path.as_str())).await?;
            let Some(name) = file.save_name(&path) else {
                println!("'{}' does not name a file.", path);
                return Ok(());
            };
            match std::fs::write(name, &file.data) {
                Ok(()) => println!("Saved {} ({} bytes).", name, file.data.len()),
                Err(err) => {
                    tracing::warn!("Failed to save {}: {}", name, err);
                    println!("Could not save {}: {}", name, err);
                }
            }
        }
        AppCommand::ListAgents => {
            let list = client.send(Api::agents().list()).await?;
            tracing::info!("Loaded {} of {} agents", list.agents.len(), list.total);
            state.set_agents(list.agents);
            println!(
                "{}",
                ui::format_agents(&state.agents, state.current_agent.as_ref())
            );
        }
        AppCommand::SelectAgent(query) => {
            if state.agents.is_empty() {
                let list = client.send(Api::agents().list()).await?;
                state.set_agents(list.agents);
            }
            match state.select_agent(&query) {
                Some(agent) if agent.is_running() => {
                    println!("Now chatting with {}.", agent.name)
                }
                Some(agent) => println!(
                    "Selected {}, but it is not running yet ({}).",
                    agent.name, agent.deployment_status
                ),
                None => println!("No agent matches '{}'.", query),
            }
        }
        AppCommand::ShowAgentStatus => {
            let Some(agent) = require_agent(state) else {
                return Ok(());
            };
            let status = client.send(Api::agents().status(agent.id)).await?;
            let health = match client.send(Api::agents().health(agent.id)).await {
                Ok(health) => Some(health),
                Err(err) => {
                    tracing::debug!("Health check for {} failed: {}", agent.id, err);
                    None
                }
            };
            println!("{}", ui::format_status(&status, health.as_ref()));
        }
        AppCommand::ShowProfile => {
            let user = session.refresh_user().await?;
            state.show_tool_calls = user.show_tool_calls;
            println!("{}", ui::format_profile(&user));
        }
        AppCommand::ShowUsage => {
            let usage = client.send(Api::usage().summary()).await?;
            println!("{}", ui::format_usage(&usage));
            let history = client.send(Api::usage().history(7)).await?;
            println!("{}", ui::format_history(&history));
        }
        AppCommand::SetDisplayName(display_name) => {
            let user = session
                .update_profile(UpdateProfile::new().display_name(display_name))
                .await?;
            println!("Display name set to {}.", user.label());
        }
        AppCommand::ToggleToolCalls => {
            let user = session
                .update_profile(UpdateProfile::new().show_tool_calls(!state.show_tool_calls))
                .await?;
            state.show_tool_calls = user.show_tool_calls;
            println!(
                "Tool calls are now {}.",
                if user.show_tool_calls { "shown" } else { "hidden" }
            );
        }
        AppCommand::Logout => {
            session.logout().await;
            state.reset();
            println!("Signed out.");
        }
        AppCommand::LogoutEverywhere => {
            let result = session.logout_everywhere().await;
            state.reset();
            result?;
            println!("Signed out of every device.");
        }
        AppCommand::Help => println!("{}", HELP),
        AppCommand::Quit => state.should_quit = true,
        AppCommand::Invalid(message) => println!("{}", message),
    }

    Ok(())
}

fn require_agent(state: &AppState) -> Option<Agent> {
    if state.current_agent.is_none() {
        println!("Select an agent first with /use (see /agents).");
    }
    state.current_agent.clone()
}

async fn send_message(
    message: &str,
    agent: &Agent,
    show_tool_calls: bool,
    session: &AuthSession,
) -> Result<(), ApiError> {
    if !agent.is_running() {
        println!(
            "{} is not running ({}). Check /status.",
            agent.name, agent.deployment_status
        );
        return Ok(());
    }

    let end = match stream_reply(message, agent, show_tool_calls, session.client()).await {
        // Streams are never refreshed by the client; renew the session
        // through a profile fetch and try once more.
        Err(err) if err.is_unauthorized() => {
            tracing::debug!("Chat stream rejected with 401, renewing session");
            session.refresh_user().await?;
            stream_reply(message, agent, show_tool_calls, session.client()).await?
        }
        result => result?,
    };

    match end {
        StreamEnd::Completed => {
            if let Err(err) = show_pending(agent, show_tool_calls, session.client()).await {
                tracing::debug!("Failed to load pending messages: {}", err);
            }
        }
        StreamEnd::Cancelled => println!("(stopped)"),
    }
    Ok(())
}

/// Stream one reply to stdout. Ctrl-C cancels the stream.
async fn stream_reply(
    message: &str,
    agent: &Agent,
    show_tool_calls: bool,
    client: &Client,
) -> Result<StreamEnd, ApiError> {
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let result = client
        .chat(agent.id)
        .send(message, &cancel, |event| {
            if let Some(line) = ui::format_event(&event, &agent.name, show_tool_calls) {
                println!("{}", line);
            }
        })
        .await;

    interrupt.abort();
    result
}

/// Print messages the agent produced outside a live stream. Returns
/// whether there were any.
async fn show_pending(
    agent: &Agent,
    show_tool_calls: bool,
    client: &Client,
) -> Result<bool, ApiError> {
    let pending = client.send(Api::chat(agent.id).pending()).await?;
    for event in &pending.messages {
        if let Some(line) = ui::format_event(event, &agent.name, show_tool_calls) {
            println!("{}", line);
        }
    }
    Ok(!pending.messages.is_empty())
}

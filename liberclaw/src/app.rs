use anyhow::Result;
use liberclaw_auth::DeviceIdStore;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::commands::{executor, handlers};
use crate::events::AppCommand;
use crate::session::{AuthSession, SessionState};
use crate::state::AppState;
use crate::ui;

type Input = Lines<BufReader<Stdin>>;

pub struct App {
    session: AuthSession,
    device_ids: DeviceIdStore,
}

impl App {
    pub fn new(session: AuthSession, device_ids: DeviceIdStore) -> Self {
        Self {
            session,
            device_ids,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let mut input = BufReader::new(tokio::io::stdin()).lines();
        let mut session_rx = self.session.subscribe();
        let mut state = AppState::new();

        println!("Connecting...");
        if self.session.restore().await == SessionState::Unauthenticated
            && !self.sign_in(&mut input).await?
        {
            return Ok(());
        }
        self.init_data(&mut state).await;

        tracing::info!("Entering main input loop");
        loop {
            prompt(&state)?;

            let line = tokio::select! {
                line = input.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                break;
            };
            let Some(command) = handlers::handle_input(&line) else {
                continue;
            };

            tracing::debug!("Executing command: {:?}", command);
            if let Err(err) = executor::execute_command(command, &mut state, &self.session).await {
                tracing::warn!("Command failed: {}", err);
                println!("{}", ui::format_error(&err));
                self.session.observe(&err);
            }

            if state.should_quit {
                tracing::info!("Quit requested, exiting input loop");
                break;
            }

            let signed_out = !session_rx.borrow_and_update().is_authenticated();
            if signed_out {
                state.reset();
                if !self.sign_in(&mut input).await? {
                    break;
                }
                self.init_data(&mut state).await;
            }
        }

        Ok(())
    }

    /// Interactive sign-in: magic-link code by email, or a guest session
    /// tied to this device. Returns false when input ends first.
    async fn sign_in(&self, input: &mut Input) -> Result<bool> {
        println!("Sign in with your email, or press Enter to continue as a guest.");

        loop {
            let Some(email) = read_line(input, "Email: ").await? else {
                return Ok(false);
            };

            let result = if email.is_empty() {
                let device_id = self.device_ids.load_or_create()?;
                self.session.login_as_guest(&device_id).await
            } else {
                match self.session.request_magic_link(&email).await {
                    Ok(message) => println!("{}", message),
                    Err(err) => {
                        println!("{}", ui::format_error(&err));
                        continue;
                    }
                }
                let Some(code) = read_line(input, "Code from the email: ").await? else {
                    return Ok(false);
                };
                self.session.verify_magic_link(&email, &code).await
            };

            match result {
                Ok(user) => {
                    println!("Welcome, {}!", user.label());
                    return Ok(true);
                }
                Err(err) => {
                    tracing::warn!("Sign-in failed: {}", err);
                    println!("{}", ui::format_error(&err));
                }
            }
        }
    }

    async fn init_data(&self, state: &mut AppState) {
        if let Some(user) = self.session.state().user() {
            state.show_tool_calls = user.show_tool_calls;
        }

        if let Err(err) = executor::execute_command(AppCommand::ListAgents, state, &self.session).await
        {
            println!("{}", ui::format_error(&err));
            self.session.observe(&err);
            return;
        }

        match &state.current_agent {
            Some(agent) => println!("Chatting with {}. Type /help for commands.", agent.name),
            None => println!("No running agent selected. Type /help for commands."),
        }
    }
}

fn prompt(state: &AppState) -> std::io::Result<()> {
    let name = state
        .current_agent
        .as_ref()
        .map_or("liberclaw", |agent| agent.name.as_str());
    print!("{}> ", name);
    std::io::stdout().flush()
}

async fn read_line(input: &mut Input, label: &str) -> Result<Option<String>> {
    print!("{}", label);
    std::io::stdout().flush()?;
    Ok(input.next_line().await?.map(|line| line.trim().to_string()))
}

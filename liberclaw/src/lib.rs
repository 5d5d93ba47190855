mod app;
pub mod commands;
pub mod events;
pub mod logging;
pub mod session;
pub mod state;
pub mod ui;

pub use app::App;
pub use session::{AuthSession, SessionState};

// Common types shared by every crate that talks to the LiberClaw API
pub mod common;

// Client-side persistence and configuration
mod client;
mod error;

pub use client::{
    DeviceIdStore, FileTokenStore, MemoryTokenStore, Settings, TokenStore,
};
pub use common::TokenPair;
pub use error::AuthError;

pub mod executor;
pub mod handlers;

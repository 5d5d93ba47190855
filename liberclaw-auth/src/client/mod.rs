mod config;
mod device_id;
mod token_storage;

pub use config::Settings;
pub use device_id::DeviceIdStore;
pub use token_storage::{FileTokenStore, MemoryTokenStore, TokenStore};

use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::AuthError;

/// Stable per-installation identifier used for guest sessions.
pub struct DeviceIdStore {
    device_id_path: PathBuf,
}

impl DeviceIdStore {
    pub fn new() -> Result<Self, AuthError> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| AuthError::Configuration("Could not find cache directory".to_string()))?
            .join("liberclaw");
        Self::in_dir(cache_dir)
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Result<Self, AuthError> {
        let dir = dir.as_ref();
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }

        Ok(Self {
            device_id_path: dir.join("device_id"),
        })
    }

    pub fn load_or_create(&self) -> Result<String, AuthError> {
        if self.device_id_path.exists() {
            let device_id = fs::read_to_string(&self.device_id_path)?.trim().to_string();
            if !device_id.is_empty() {
                return Ok(device_id);
            }
        }

        let device_id = Uuid::new_v4().to_string();
        fs::write(&self.device_id_path, &device_id)?;

        // Set permissions to 0600 (owner read/write only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.device_id_path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.device_id_path, perms)?;
        }

        tracing::info!("Generated new device id");
        Ok(device_id)
    }
}

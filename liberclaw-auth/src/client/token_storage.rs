use crate::common::TokenPair;
use crate::error::AuthError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Durable holder for the current token pair.
///
/// Implementations must give read-after-write consistency and must replace
/// the whole pair on `write`, never one token at a time.
pub trait TokenStore: Send + Sync {
    fn read(&self) -> Result<Option<TokenPair>, AuthError>;
    fn write(&self, tokens: &TokenPair) -> Result<(), AuthError>;
    fn clear(&self) -> Result<(), AuthError>;
}

/// Token store backed by `token.json` in the user's cache directory.
pub struct FileTokenStore {
    token_path: PathBuf,
}

impl FileTokenStore {
    pub fn new() -> Result<Self, AuthError> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| AuthError::Configuration("Could not find cache directory".to_string()))?
            .join("liberclaw");
        Self::in_dir(cache_dir)
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Result<Self, AuthError> {
        let dir = dir.as_ref();

        // Create cache directory if it doesn't exist
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                AuthError::TokenStorage(format!("Failed to create cache directory: {}", e))
            })?;
        }

        Ok(Self {
            token_path: dir.join("token.json"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.token_path
    }
}

impl TokenStore for FileTokenStore {
    fn read(&self) -> Result<Option<TokenPair>, AuthError> {
        if !self.token_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.token_path)
            .map_err(|e| AuthError::TokenStorage(format!("Failed to read token: {}", e)))?;

        let tokens: TokenPair = serde_json::from_str(&json)?;
        Ok(Some(tokens))
    }

    fn write(&self, tokens: &TokenPair) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(tokens)?;

        // Write next to the target and rename over it so readers never see a
        // half-written pair
        let tmp_path = self.token_path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .map_err(|e| AuthError::TokenStorage(format!("Failed to save token: {}", e)))?;

        // Set permissions to 0600 (read/write for owner only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&tmp_path)
                .map_err(|e| {
                    AuthError::TokenStorage(format!("Failed to get file permissions: {}", e))
                })?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&tmp_path, perms).map_err(|e| {
                AuthError::TokenStorage(format!("Failed to set file permissions: {}", e))
            })?;
        }

        fs::rename(&tmp_path, &self.token_path)
            .map_err(|e| AuthError::TokenStorage(format!("Failed to save token: {}", e)))?;

        tracing::debug!("Token pair written to {}", self.token_path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        if self.token_path.exists() {
            fs::remove_file(&self.token_path)
                .map_err(|e| AuthError::TokenStorage(format!("Failed to delete token: {}", e)))?;
        }
        Ok(())
    }
}

/// Process-local token store, for tests and embedders that persist tokens
/// themselves.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn read(&self) -> Result<Option<TokenPair>, AuthError> {
        Ok(self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn write(&self, tokens: &TokenPair) -> Result<(), AuthError> {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TokenPair {
        TokenPair::new("access-1", "refresh-1", 900)
    }

    #[test]
    fn file_store_round_trips_pair() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::in_dir(dir.path()).unwrap();

        assert_eq!(store.read().unwrap(), None);

        store.write(&sample()).unwrap();
        assert_eq!(store.read().unwrap(), Some(sample()));
    }

    #[test]
    fn file_store_write_replaces_whole_pair() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::in_dir(dir.path()).unwrap();

        store.write(&sample()).unwrap();
        let rotated = TokenPair::new("access-2", "refresh-2", 900);
        store.write(&rotated).unwrap();

        assert_eq!(store.read().unwrap(), Some(rotated));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn file_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::in_dir(dir.path()).unwrap();

        store.write(&sample()).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();

        assert_eq!(store.read().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn file_store_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::in_dir(dir.path()).unwrap();
        store.write(&sample()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn memory_store_round_trips_pair() {
        let store = MemoryTokenStore::new();
        store.write(&sample()).unwrap();
        assert_eq!(store.read().unwrap(), Some(sample()));

        store.clear().unwrap();
        assert_eq!(store.read().unwrap(), None);
    }
}

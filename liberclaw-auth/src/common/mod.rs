use serde::{Deserialize, Serialize};

/// Token pair issued by `/auth/refresh` and every login endpoint.
///
/// The refresh token is single-use: the backend rotates it on every refresh,
/// so a pair must always be stored and replaced as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl TokenPair {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in: u64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            token_type: default_token_type(),
            expires_in,
        }
    }
}

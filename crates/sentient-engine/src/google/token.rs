use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use sentient_core::errors::ServiceError;

/// OAuth token file written by the login flow. Only the access token is read.
#[derive(Clone, Debug)]
pub struct TokenFile {
    path: PathBuf,
}

#[derive(Deserialize)]
struct StoredToken {
    token: Option<String>,
}

impl TokenFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Current access token. A missing, unreadable or empty file means the
    /// user has not logged in.
    pub async fn bearer(&self) -> Result<String, ServiceError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "token file unavailable");
                return Err(ServiceError::no_token());
            }
        };
        let stored: StoredToken = serde_json::from_str(&raw).map_err(|e| {
            debug!(path = %self.path.display(), error = %e, "token file malformed");
            ServiceError::no_token()
        })?;
        stored
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(ServiceError::no_token)
    }
}

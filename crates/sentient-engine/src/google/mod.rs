//! Gmail v1 and Calendar v3 clients over `reqwest`.
//!
//! Credentials are read from the token file on every call, so a fresh login
//! is picked up without a restart. Token acquisition and refresh happen
//! elsewhere.

mod calendar;
mod gmail;
mod token;

use std::path::PathBuf;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use sentient_core::errors::ServiceError;

pub use token::TokenFile;

#[derive(Clone, Debug)]
pub struct GoogleConfig {
    pub token_path: PathBuf,
    pub gmail_base_url: String,
    pub calendar_base_url: String,
    pub request_timeout: Duration,
}

/// Shared Google API client. Implements both [`MailProvider`] and
/// [`CalendarProvider`].
///
/// [`MailProvider`]: crate::tools::MailProvider
/// [`CalendarProvider`]: crate::tools::CalendarProvider
pub struct GoogleClient {
    http: reqwest::Client,
    token: TokenFile,
    gmail_base: String,
    calendar_base: String,
}

impl GoogleClient {
    pub fn new(config: GoogleConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ServiceError::Network(format!("http client: {e}")))?;
        Ok(Self {
            http,
            token: TokenFile::new(config.token_path),
            gmail_base: config.gmail_base_url.trim_end_matches('/').to_string(),
            calendar_base: config.calendar_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn gmail_url(&self, path: &str) -> String {
        format!("{}/gmail/v1/users/me/{path}", self.gmail_base)
    }

    fn calendar_url(&self, path: &str) -> String {
        format!("{}/calendar/v3/{path}", self.calendar_base)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let bearer = self.token.bearer().await?;
        let request = self.http.get(url).bearer_auth(bearer).query(query);
        decode(request.send().await).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let bearer = self.token.bearer().await?;
        let request = self.http.post(url).bearer_auth(bearer).json(body);
        decode(request.send().await).await
    }
}

async fn decode<T: DeserializeOwned>(
    sent: Result<reqwest::Response, reqwest::Error>,
) -> Result<T, ServiceError> {
    let response = sent.map_err(|e| ServiceError::Network(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "Google API error");
        return Err(ServiceError::from_status(status.as_u16(), body));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ServiceError::Decode(e.to_string()))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Client against a mock server with a token file holding `token`.
    pub fn client(server_uri: &str, dir: &std::path::Path, token: Option<&str>) -> GoogleClient {
        let token_path = dir.join("token.json");
        if let Some(token) = token {
            std::fs::write(&token_path, serde_json::json!({ "token": token }).to_string()).unwrap();
        }
        GoogleClient::new(GoogleConfig {
            token_path,
            gmail_base_url: server_uri.to_string(),
            calendar_base_url: server_uri.to_string(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    pub fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sentient-google-test-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}

//! Settings type definitions.
//!
//! Field names are camelCase in JSON. Every section is `#[serde(default)]`,
//! so a partial settings file only needs the values it changes.

use serde::{Deserialize, Serialize};

use crate::loader::sentient_dir;

/// Root settings type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SentientSettings {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub google: GoogleSettings,
    pub agent: AgentSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

/// HTTP listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Reasoning engine (Gemini) settings. The API key comes from the environment.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmSettings {
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.0,
            request_timeout_secs: 120,
        }
    }
}

/// Mail and calendar provider settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleSettings {
    /// File holding the OAuth access token (`{"token": "..."}`), written by
    /// the login flow.
    pub token_path: String,
    pub gmail_base_url: String,
    pub calendar_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            token_path: sentient_dir().join("token.json").to_string_lossy().into_owned(),
            gmail_base_url: "https://gmail.googleapis.com".to_string(),
            calendar_base_url: "https://www.googleapis.com".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Orchestration loop settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    /// Reasoning cycles allowed per request before giving up.
    pub max_cycles: u32,
    pub tool_timeout_secs: u64,
    /// IANA timezone used for the directive clock and new calendar events.
    pub timezone: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_cycles: 25,
            tool_timeout_secs: 120,
            timezone: "UTC".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    pub memory_db_path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            memory_db_path: sentient_dir().join("memory.db").to_string_lossy().into_owned(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level; `RUST_LOG` takes precedence.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use sentient_core::errors::ServiceError;
use sentient_core::tools::{ToolDefinition, ToolError};

use crate::truncate::truncate_chars;

/// Message ids inspected per read before giving up on finding bodies.
pub const SCAN_LIMIT: u32 = 20;
/// Summaries returned per read.
pub const MAX_SUMMARIES: usize = 5;
pub const MAX_BODY_CHARS: usize = 2000;

const LATEST: &str = "latest";

/// A fetched message. `body` is `None` when no text part could be decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailMessage {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub body: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailSummary {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

/// Mailbox operations the mail capabilities need.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Newest-first message ids; `query` is a provider-side search, `None` for the inbox head.
    async fn list_message_ids(
        &self,
        query: Option<&str>,
        max_results: u32,
    ) -> Result<Vec<String>, ServiceError>;

    async fn fetch_message(&self, id: &str) -> Result<MailMessage, ServiceError>;

    /// Send a message and return the provider's id for it.
    async fn send(&self, mail: &OutgoingMail) -> Result<String, ServiceError>;
}

#[derive(Debug, Deserialize)]
pub struct ReadMailArgs {
    #[serde(default = "default_search_term", alias = "query")]
    pub search_term: String,
}

fn default_search_term() -> String {
    LATEST.to_string()
}

#[derive(Debug, Deserialize)]
pub struct SendMailArgs {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Gather up to [`MAX_SUMMARIES`] messages with a non-empty body, in provider order.
///
/// A message that cannot be fetched or decoded is skipped; listing and
/// authentication failures end the call.
pub async fn collect_summaries(
    provider: &dyn MailProvider,
    search_term: &str,
) -> Result<Vec<MailSummary>, ServiceError> {
    let term = search_term.trim();
    let query = if term.is_empty() || term.eq_ignore_ascii_case(LATEST) {
        None
    } else {
        Some(term)
    };

    let ids = provider.list_message_ids(query, SCAN_LIMIT).await?;
    let mut summaries = Vec::with_capacity(MAX_SUMMARIES);
    for id in ids {
        if summaries.len() == MAX_SUMMARIES {
            break;
        }
        let message = match provider.fetch_message(&id).await {
            Ok(message) => message,
            Err(e @ ServiceError::AuthenticationMissing(_)) => return Err(e),
            Err(e) => {
                warn!(message_id = %id, error = %e, kind = e.error_kind(), "skipping unreadable message");
                continue;
            }
        };
        let Some(body) = message.body.filter(|b| !b.trim().is_empty()) else {
            debug!(message_id = %id, "skipping message without text body");
            continue;
        };
        summaries.push(MailSummary {
            id: message.id,
            from: message.from,
            subject: message.subject,
            body: truncate_chars(body.trim(), MAX_BODY_CHARS),
        });
    }
    Ok(summaries)
}

pub async fn read_mail(provider: &dyn MailProvider, args: ReadMailArgs) -> Result<String, ToolError> {
    let summaries = collect_summaries(provider, &args.search_term).await?;
    if summaries.is_empty() {
        return Ok("No emails found.".into());
    }
    Ok(summaries
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "[{}] id: {}\nFrom: {}\nSubject: {}\nBody: {}",
                i + 1,
                s.id,
                s.from,
                s.subject,
                s.body
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n"))
}

pub async fn send_mail(provider: &dyn MailProvider, args: SendMailArgs) -> Result<String, ToolError> {
    if args.to.trim().is_empty() {
        return Err(ToolError::InvalidArguments("recipient address is empty".into()));
    }
    let mail = OutgoingMail {
        to: args.to,
        subject: args.subject,
        body: args.body,
    };
    let id = provider.send(&mail).await?;
    Ok(format!(
        "Email sent to {} with subject \"{}\" (message id: {id}).",
        mail.to, mail.subject
    ))
}

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "read_mail".into(),
            description: "Read up to 5 recent emails (sender, subject, body). Use \"latest\" for the \
                          newest messages or any Gmail search expression to filter. If an email \
                          carries important project news, record it with save_to_memory."
                .into(),
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "search_term": {
                        "type": "string",
                        "description": "\"latest\" or a Gmail search query, e.g. \"from:bob project x\""
                    }
                }
            }),
        },
        ToolDefinition {
            name: "send_mail".into(),
            description: "Send an email immediately. Irreversible: only call after the user asked \
                          to send or confirmed a draft."
                .into(),
            parameters_schema: json!({
                "type": "object",
                "required": ["to", "subject", "body"],
                "properties": {
                    "to": {"type": "string", "description": "Recipient email address"},
                    "subject": {"type": "string", "description": "Subject line"},
                    "body": {"type": "string", "description": "Plain-text body"}
                }
            }),
        },
    ]
}

use async_trait::async_trait;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD, STANDARD, URL_SAFE};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use sentient_core::errors::ServiceError;

use super::GoogleClient;
use crate::tools::{MailMessage, MailProvider, OutgoingMail};

/// Gmail emits URL-safe base64 with or without padding.
const GMAIL_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    NO_PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Deserialize)]
struct GmailMessage {
    id: String,
    #[serde(default)]
    payload: Option<MessagePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Deserialize)]
struct PartBody {
    #[serde(default)]
    data: Option<String>,
}

#[derive(Deserialize)]
struct SentMessage {
    id: String,
}

impl MessagePart {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    fn data(&self) -> Option<&str> {
        self.body.as_ref().and_then(|b| b.data.as_deref())
    }

    /// First `text/plain` part with data, depth first.
    fn plain_text_part(&self) -> Option<&str> {
        if self.mime_type.eq_ignore_ascii_case("text/plain") {
            if let Some(data) = self.data() {
                return Some(data);
            }
        }
        self.parts.iter().find_map(MessagePart::plain_text_part)
    }
}

fn decode_body_data(data: &str) -> Option<String> {
    let bytes = GMAIL_BASE64.decode(data.trim()).ok()?;
    String::from_utf8(bytes).ok()
}

/// Text body of a message: the first `text/plain` part, else the top-level body.
fn extract_body(payload: &MessagePart) -> Option<String> {
    payload
        .plain_text_part()
        .and_then(decode_body_data)
        .or_else(|| payload.data().and_then(decode_body_data))
}

fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// RFC 2047 encoding for non-ASCII header values.
fn encode_header(value: &str) -> String {
    let value = header_value(value);
    if value.is_ascii() {
        value
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

fn build_raw_message(mail: &OutgoingMail) -> String {
    let rfc822 = format!(
        "To: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/plain; charset=\"UTF-8\"\r\n\r\n{}",
        header_value(&mail.to),
        encode_header(&mail.subject),
        mail.body
    );
    URL_SAFE.encode(rfc822.as_bytes())
}

#[async_trait]
impl MailProvider for GoogleClient {
    async fn list_message_ids(
        &self,
        query: Option<&str>,
        max_results: u32,
    ) -> Result<Vec<String>, ServiceError> {
        let mut params = vec![("maxResults", max_results.to_string())];
        if let Some(q) = query {
            params.push(("q", q.to_string()));
        }
        let list: ListResponse = self.get_json(&self.gmail_url("messages"), &params).await?;
        debug!(count = list.messages.len(), "gmail messages listed");
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    async fn fetch_message(&self, id: &str) -> Result<MailMessage, ServiceError> {
        let message: GmailMessage = self
            .get_json(
                &self.gmail_url(&format!("messages/{id}")),
                &[("format", "full".to_string())],
            )
            .await?;
        let payload = message.payload.as_ref();
        Ok(MailMessage {
            id: message.id.clone(),
            from: payload
                .and_then(|p| p.header("From"))
                .unwrap_or("Unknown sender")
                .to_string(),
            subject: payload
                .and_then(|p| p.header("Subject"))
                .unwrap_or("No Subject")
                .to_string(),
            body: payload.and_then(extract_body),
        })
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<String, ServiceError> {
        let sent: SentMessage = self
            .post_json(
                &self.gmail_url("messages/send"),
                &json!({ "raw": build_raw_message(mail) }),
            )
            .await?;
        debug!(message_id = %sent.id, "gmail message sent");
        Ok(sent.id)
    }
}

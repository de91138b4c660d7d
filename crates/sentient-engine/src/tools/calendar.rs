use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::json;

use sentient_core::errors::ServiceError;
use sentient_core::tools::{ToolDefinition, ToolError};

/// Events returned by one list_events call.
pub const MAX_EVENTS: u32 = 10;

/// How far back list_events reaches, so in-progress events still show up.
pub fn look_back() -> Duration {
    Duration::days(1)
}

/// A calendar entry. `start`/`end` are the provider's RFC 3339 date-times,
/// or plain dates for all-day events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub start: String,
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEvent {
    pub summary: String,
    pub start: String,
    pub end: String,
    /// IANA zone used to interpret `start`/`end` when they carry no offset.
    pub time_zone: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedEvent {
    pub id: String,
    pub html_link: Option<String>,
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Events ending after `time_min`, ordered by start time.
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<CalendarEvent>, ServiceError>;

    async fn create_event(&self, event: &NewEvent) -> Result<CreatedEvent, ServiceError>;
}

#[derive(Debug, Deserialize)]
pub struct ScheduleEventArgs {
    pub summary: String,
    #[serde(alias = "start_iso", alias = "start_time")]
    pub start: String,
    #[serde(alias = "end_iso", alias = "end_time")]
    pub end: String,
}

pub async fn list_events(
    provider: &dyn CalendarProvider,
    now: DateTime<Utc>,
) -> Result<String, ToolError> {
    let events = provider.list_events(now - look_back(), MAX_EVENTS).await?;
    if events.is_empty() {
        return Ok("No upcoming events found.".into());
    }
    Ok(events
        .iter()
        .map(|e| format!("- {} to {}: {} (id: {})", e.start, e.end, e.summary, e.id))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Create the event as given. Ordering and overlap are not checked here.
pub async fn schedule_event(
    provider: &dyn CalendarProvider,
    args: ScheduleEventArgs,
    timezone: Tz,
) -> Result<String, ToolError> {
    let event = NewEvent {
        summary: args.summary,
        start: args.start,
        end: args.end,
        time_zone: timezone.name().to_string(),
    };
    let created = provider.create_event(&event).await?;
    let link = created.html_link.as_deref().unwrap_or("no link returned");
    Ok(format!(
        "Event created: \"{}\" from {} to {} ({}). Link: {link}",
        event.summary, event.start, event.end, event.time_zone
    ))
}

/// Upcoming events from `now` on, without the look-back margin.
pub async fn upcoming(
    provider: &dyn CalendarProvider,
    now: DateTime<Utc>,
    limit: u32,
) -> Result<Vec<CalendarEvent>, ServiceError> {
    provider.list_events(now, limit).await
}

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_events".into(),
            description: "List upcoming calendar events ordered by start time, including events \
                          that started within the last day. Call this before schedule_event."
                .into(),
            parameters_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: "schedule_event".into(),
            description: "Create a calendar event. Times are ISO 8601, e.g. 2026-10-18T11:00:00, \
                          interpreted in the user's timezone."
                .into(),
            parameters_schema: json!({
                "type": "object",
                "required": ["summary", "start", "end"],
                "properties": {
                    "summary": {"type": "string", "description": "Event title"},
                    "start": {"type": "string", "description": "Start time, ISO 8601"},
                    "end": {"type": "string", "description": "End time, ISO 8601"}
                }
            }),
        },
    ]
}

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use sentient_core::errors::ServiceError;

use super::GoogleClient;
use crate::tools::{CalendarEvent, CalendarProvider, CreatedEvent, NewEvent};

const PRIMARY_EVENTS: &str = "calendars/primary/events";

#[derive(Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventItem {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    start: Option<EventTime>,
    #[serde(default)]
    end: Option<EventTime>,
    #[serde(default)]
    html_link: Option<String>,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    /// All-day events carry a date instead of a date-time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

#[derive(Serialize)]
struct InsertEvent<'a> {
    summary: &'a str,
    start: EventTime,
    end: EventTime,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertedEvent {
    id: String,
    #[serde(default)]
    html_link: Option<String>,
}

impl EventTime {
    fn at(date_time: &str, time_zone: &str) -> Self {
        Self {
            date_time: Some(date_time.to_string()),
            date: None,
            time_zone: Some(time_zone.to_string()),
        }
    }

    fn display(time: Option<EventTime>) -> String {
        time.and_then(|t| t.date_time.or(t.date))
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl From<EventItem> for CalendarEvent {
    fn from(item: EventItem) -> Self {
        Self {
            id: item.id,
            summary: item
                .summary
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "(no title)".to_string()),
            start: EventTime::display(item.start),
            end: EventTime::display(item.end),
            html_link: item.html_link,
        }
    }
}

#[async_trait]
impl CalendarProvider for GoogleClient {
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<CalendarEvent>, ServiceError> {
        let params = [
            ("timeMin", time_min.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("maxResults", max_results.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        let list: EventList = self
            .get_json(&self.calendar_url(PRIMARY_EVENTS), &params)
            .await?;
        Ok(list.items.into_iter().map(CalendarEvent::from).collect())
    }

    async fn create_event(&self, event: &NewEvent) -> Result<CreatedEvent, ServiceError> {
        let body = InsertEvent {
            summary: &event.summary,
            start: EventTime::at(&event.start, &event.time_zone),
            end: EventTime::at(&event.end, &event.time_zone),
        };
        let inserted: InsertedEvent = self
            .post_json(&self.calendar_url(PRIMARY_EVENTS), &body)
            .await?;
        Ok(CreatedEvent {
            id: inserted.id,
            html_link: inserted.html_link,
        })
    }
}

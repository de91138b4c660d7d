use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use serde::de::DeserializeOwned;

use sentient_core::errors::ServiceError;
use sentient_core::tools::{ToolDefinition, ToolError};
use sentient_store::MemoryStore;

use crate::session::SessionHistory;
use crate::tools::calendar::{self, ScheduleEventArgs};
use crate::tools::mail::{self, ReadMailArgs, SendMailArgs};
use crate::tools::memory::{self, ConsultArgs, SaveArgs};
use crate::tools::{CalendarEvent, CalendarProvider, MailProvider};

/// The closed set of capabilities the reasoning engine may invoke, with
/// arguments already checked against their schema.
#[derive(Debug)]
pub enum Capability {
    ReadMail(ReadMailArgs),
    SendMail(SendMailArgs),
    ListEvents,
    ScheduleEvent(ScheduleEventArgs),
    SaveToMemory(SaveArgs),
    ConsultMemory(ConsultArgs),
    ClearMemory,
}

impl Capability {
    pub const NAMES: [&'static str; 7] = [
        "read_mail",
        "send_mail",
        "list_events",
        "schedule_event",
        "save_to_memory",
        "consult_memory",
        "clear_memory",
    ];

    /// Resolve a requested tool call. A `null` argument value counts as `{}`.
    pub fn parse(name: &str, arguments: &serde_json::Value) -> Result<Self, ToolError> {
        Ok(match name {
            "read_mail" => Self::ReadMail(args(arguments)?),
            "send_mail" => Self::SendMail(args(arguments)?),
            "list_events" => Self::ListEvents,
            "schedule_event" => Self::ScheduleEvent(args(arguments)?),
            "save_to_memory" => Self::SaveToMemory(args(arguments)?),
            "consult_memory" => Self::ConsultMemory(args(arguments)?),
            "clear_memory" => Self::ClearMemory,
            other => return Err(ToolError::UnknownCapability(other.to_string())),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadMail(_) => "read_mail",
            Self::SendMail(_) => "send_mail",
            Self::ListEvents => "list_events",
            Self::ScheduleEvent(_) => "schedule_event",
            Self::SaveToMemory(_) => "save_to_memory",
            Self::ConsultMemory(_) => "consult_memory",
            Self::ClearMemory => "clear_memory",
        }
    }
}

fn args<T: DeserializeOwned>(arguments: &serde_json::Value) -> Result<T, ToolError> {
    let value = if arguments.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        arguments.clone()
    };
    serde_json::from_value(value).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Text result of one invocation. `history_wiped` is set when the calling
/// session's history was emptied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolOutcome {
    pub content: String,
    pub history_wiped: bool,
}

impl ToolOutcome {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            history_wiped: false,
        }
    }
}

/// Dispatches capabilities to the mail, calendar and memory back ends.
pub struct ToolRegistry {
    mail: Arc<dyn MailProvider>,
    calendar: Arc<dyn CalendarProvider>,
    memory: MemoryStore,
    timezone: Tz,
}

impl ToolRegistry {
    pub fn new(
        mail: Arc<dyn MailProvider>,
        calendar: Arc<dyn CalendarProvider>,
        memory: MemoryStore,
        timezone: Tz,
    ) -> Self {
        Self {
            mail,
            calendar,
            memory,
            timezone,
        }
    }

    /// Schemas offered to the reasoning engine, in [`Capability::NAMES`] order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs = mail::definitions();
        defs.extend(calendar::definitions());
        defs.extend(memory::definitions());
        defs
    }

    /// Run one capability. `history` is the calling session's log; only
    /// `clear_memory` touches it.
    pub async fn invoke(
        &self,
        capability: Capability,
        history: &mut SessionHistory,
    ) -> Result<ToolOutcome, ToolError> {
        let content = match capability {
            Capability::ReadMail(args) => mail::read_mail(self.mail.as_ref(), args).await?,
            Capability::SendMail(args) => mail::send_mail(self.mail.as_ref(), args).await?,
            Capability::ListEvents => calendar::list_events(self.calendar.as_ref(), Utc::now()).await?,
            Capability::ScheduleEvent(args) => {
                calendar::schedule_event(self.calendar.as_ref(), args, self.timezone).await?
            }
            Capability::SaveToMemory(args) => memory::save(&self.memory, args)?,
            Capability::ConsultMemory(args) => memory::consult(&self.memory, args)?,
            Capability::ClearMemory => {
                return Ok(ToolOutcome {
                    content: memory::wipe(&self.memory, history)?,
                    history_wiped: true,
                });
            }
        };
        Ok(ToolOutcome::text(content))
    }

    /// Events from now on, without the look-back margin used by list_events.
    pub async fn upcoming_events(&self, limit: u32) -> Result<Vec<CalendarEvent>, ServiceError> {
        calendar::upcoming(self.calendar.as_ref(), Utc::now(), limit).await
    }
}

//! Capability invokers and the provider seams they call through.

pub mod calendar;
pub mod mail;
pub mod memory;

pub use calendar::{CalendarEvent, CalendarProvider, CreatedEvent, NewEvent};
pub use mail::{MailMessage, MailProvider, MailSummary, OutgoingMail};

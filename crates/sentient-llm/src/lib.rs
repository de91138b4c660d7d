pub mod converter;
pub mod mock;
pub mod provider;
pub mod types;

pub use mock::{MockEngine, MockReply};
pub use provider::{GeminiConfig, GeminiEngine};

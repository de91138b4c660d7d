pub mod agent;
pub mod error;
pub mod google;
pub mod prompt;
pub mod registry;
pub mod runner;
pub mod session;
pub mod tools;
pub mod truncate;

pub use agent::Agent;
pub use error::EngineError;
pub use registry::{Capability, ToolOutcome, ToolRegistry};
pub use runner::{AgentRunner, RunResult, RunnerConfig};
pub use session::{SessionHistory, SessionRegistry};

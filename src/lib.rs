pub mod analyzer;
pub mod breakdown;
pub mod languages;
pub mod logging;
pub mod prompts;
pub mod providers;
pub mod server;
pub mod settings;

pub use analyzer::Analyzer;
pub use breakdown::{BreakdownError, OrderedBreakdown, WordEntry};
pub use languages::Language;
pub use providers::{ChatModel, CompletionFuture, CompletionRequest, GatewayError, OpenAI};

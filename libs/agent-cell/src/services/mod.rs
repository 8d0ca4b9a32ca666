pub mod agent;
pub mod history;
pub mod llm;
pub mod normalize;
pub mod tools;

pub use agent::AgentService;
pub use history::trim_history;
pub use llm::{ChatModel, OpenAiChatModel};
pub use normalize::InputNormalizer;
pub use tools::{tool_definitions, ToolDispatcher};

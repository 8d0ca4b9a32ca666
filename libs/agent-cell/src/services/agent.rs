// libs/agent-cell/src/services/agent.rs
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{AgentError, AgentReply, ChatMessage};
use crate::services::history::trim_history;
use crate::services::llm::ChatModel;
use crate::services::tools::{tool_definitions, ToolDispatcher};

const FALLBACK_REPLY: &str = "Sorry, I could not finish that request. Could you try again?";

/// One conversational turn: the caller owns the history and sends it whole
/// each time, so nothing is kept between turns.
#[derive(Clone)]
pub struct AgentService {
    model: Arc<dyn ChatModel>,
    tools: ToolDispatcher,
    history_window: usize,
    max_tool_rounds: usize,
}

impl AgentService {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolDispatcher, history_window: usize, max_tool_rounds: usize) -> Self {
        Self {
            model,
            tools,
            history_window,
            max_tool_rounds: max_tool_rounds.max(1),
        }
    }

    pub fn tools(&self) -> &ToolDispatcher {
        &self.tools
    }

    pub async fn respond(&self, business_id: Uuid, history: Vec<ChatMessage>) -> Result<AgentReply, AgentError> {
        let today = self.tools.today();
        let mut conversation = trim_history(&history, self.history_window);
        if !conversation.iter().any(ChatMessage::is_system) {
            conversation.insert(0, ChatMessage::system(system_prompt(today)));
        }

        let definitions = tool_definitions();
        let mut produced = Vec::new();
        let mut tools_called = Vec::new();

        for round in 0..self.max_tool_rounds {
            let message = self
                .model
                .complete(&conversation, &definitions)
                .await
                .map_err(|e| AgentError::Model(e.to_string()))?;

            conversation.push(message.clone());
            produced.push(message.clone());

            if message.tool_calls.is_empty() {
                let reply = message.content.unwrap_or_default();
                info!(
                    "Agent answered business {} after {} round(s), {} tool call(s)",
                    business_id,
                    round + 1,
                    tools_called.len()
                );
                return Ok(AgentReply { reply, messages: produced, tools_called });
            }

            for call in &message.tool_calls {
                let output = self.run_tool(business_id, &call.function.name, &call.function.arguments).await;
                tools_called.push(call.function.name.clone());

                let result = ChatMessage::tool_result(call.id.clone(), output.to_string());
                conversation.push(result.clone());
                produced.push(result);
            }
        }

        warn!(
            "Agent hit the limit of {} tool round(s) for business {}",
            self.max_tool_rounds, business_id
        );
        let fallback = ChatMessage::assistant(FALLBACK_REPLY);
        produced.push(fallback);

        Ok(AgentReply {
            reply: FALLBACK_REPLY.to_string(),
            messages: produced,
            tools_called,
        })
    }

    /// Tool failures go back to the model as text so it can correct itself.
    async fn run_tool(&self, business_id: Uuid, name: &str, raw_arguments: &str) -> Value {
        let arguments = if raw_arguments.trim().is_empty() {
            json!({})
        } else {
            match serde_json::from_str::<Value>(raw_arguments) {
                Ok(arguments) => arguments,
                Err(e) => return json!({ "error": format!("Arguments are not valid JSON: {}", e) }),
            }
        };

        match self.tools.dispatch(business_id, name, &arguments).await {
            Ok(result) => result,
            Err(e) => {
                debug!("Tool {} failed: {}", name, e);
                json!({ "error": e.to_string() })
            }
        }
    }
}

fn system_prompt(today: NaiveDate) -> String {
    format!(
        "You are the booking assistant of a beauty salon, chatting with clients on WhatsApp. \
         Today is {} ({}). Use the tools to look up services, professionals and free times; \
         never invent availability. Validate a booking before creating it and confirm the \
         details with the client first. Keep answers short and reply in the client's language.",
        today,
        today.format("%A")
    )
}


// libs/agent-cell/src/state.rs
use std::sync::Arc;

use appointment_cell::AppointmentState;

use crate::services::{AgentService, ChatModel, ToolDispatcher};

pub struct AgentState {
    pub appointments: Arc<AppointmentState>,
    pub agent: AgentService,
}

impl AgentState {
    pub fn new(appointments: Arc<AppointmentState>, model: Arc<dyn ChatModel>) -> Self {
        let config = Arc::clone(&appointments.config);
        let agent = AgentService::new(
            model,
            ToolDispatcher::new(Arc::clone(&appointments)),
            config.agent_history_window,
            config.agent_max_tool_rounds,
        );

        Self { appointments, agent }
    }
}

//! Small-talk agent. Stateless: every call is a fresh two-message exchange.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::integrations::{ChatMessage, ChatModel};
use crate::prompts::Prompt;
use crate::Result;

pub struct ChatAgent {
    model: Arc<dyn ChatModel>,
    system_prompt: String,
    delay: Duration,
}

impl ChatAgent {
    pub fn new(model: Arc<dyn ChatModel>, delay: Duration) -> Self {
        Self {
            model,
            system_prompt: Prompt::ChatSystem.template().trim().to_string(),
            delay,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub async fn reply(&self, question: &str) -> Result<String> {
        // Pacing only, so the UI typing indicator is visible.
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let messages = vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(question),
        ];
        let answer = self.model.complete(messages).await?;
        debug!(chars = answer.len(), "Chat reply");
        Ok(answer)
    }
}

//! Binary routing gate between small talk and document questions.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::integrations::{ChatMessage, ChatModel};
use crate::prompts::{classifier_prompt, Prompt};
use crate::Result;

/// Route chosen for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Chat,
    Knowledge,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Chat => "chat",
            Classification::Knowledge => "knowledge",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw model reply to a label. Anything that does not mention "chat"
/// is treated as a knowledge question.
pub fn parse_label(reply: &str) -> Classification {
    if reply.trim().to_lowercase().contains("chat") {
        Classification::Chat
    } else {
        Classification::Knowledge
    }
}

pub struct Classifier {
    model: Arc<dyn ChatModel>,
    template: String,
}

impl Classifier {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self::with_template(model, Prompt::Classifier.template())
    }

    pub fn with_template(model: Arc<dyn ChatModel>, template: impl Into<String>) -> Self {
        Self {
            model,
            template: template.into(),
        }
    }

    /// Classify a question. Service errors propagate; there is no fallback label.
    pub async fn classify(&self, input: &str) -> Result<Classification> {
        let prompt = classifier_prompt(&self.template, input);
        let reply = self.model.complete(vec![ChatMessage::user(prompt)]).await?;
        let label = parse_label(&reply);
        debug!(reply = %reply, label = %label, "Classified question");
        Ok(label)
    }
}

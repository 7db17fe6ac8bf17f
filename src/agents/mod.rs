//! Question routing: classify, then answer on the chat or knowledge path.

pub mod chat;
pub mod classifier;
pub mod knowledge;

use serde::Serialize;
use tracing::info;

pub use chat::ChatAgent;
pub use classifier::{parse_label, Classification, Classifier};
pub use knowledge::{ChunkSettings, KnowledgeAgent};

use crate::{Error, Result};

/// Routed answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentReply {
    pub classification: Classification,
    pub answer: String,
}

/// Classifier in front of the two answering paths.
pub struct Agent {
    classifier: Classifier,
    chat: ChatAgent,
    knowledge: KnowledgeAgent,
}

impl Agent {
    pub fn new(classifier: Classifier, chat: ChatAgent, knowledge: KnowledgeAgent) -> Self {
        Self {
            classifier,
            chat,
            knowledge,
        }
    }

    pub fn knowledge(&self) -> &KnowledgeAgent {
        &self.knowledge
    }

    /// Classify and answer. `index_name` is only consulted on the knowledge path.
    pub async fn run(&self, index_name: &str, question: &str) -> Result<AgentReply> {
        let classification = self.classifier.classify(question).await?;
        info!(classification = %classification, "Routing question");

        let answer = match classification {
            Classification::Chat => self.chat.reply(question).await?,
            Classification::Knowledge => {
                if index_name.trim().is_empty() {
                    return Err(Error::InvalidArgument(
                        "no index selected for a knowledge question".to_string(),
                    ));
                }
                self.knowledge.answer(index_name, question).await?
            }
        };

        Ok(AgentReply {
            classification,
            answer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::{ChatMessage, ChatModel, Embedder, Generator};
    use crate::store::LocalStore;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    /// Answers "chat" to classifier prompts, otherwise a fixed greeting.
    struct FakeMistral;

    #[async_trait]
    impl ChatModel for FakeMistral {
        async fn complete(&self, messages: Vec<ChatMessage>) -> crate::Result<String> {
            let last = messages
                .last()
                .and_then(|m| m.content.clone())
                .unwrap_or_default();
            if last.starts_with("CLASSIFY:") {
                if last.contains("hi there") {
                    Ok("chat".into())
                } else {
                    Ok("knowledge".into())
                }
            } else {
                Ok("Hello!".into())
            }
        }
    }

    struct NoEmbedder;

    #[async_trait]
    impl Embedder for NoEmbedder {
        async fn embed(&self, _text: &str) -> crate::Result<Vec<f32>> {
            Ok(vec![1.0])
        }

        fn model(&self) -> &str {
            "none"
        }
    }

    struct NoGenerator;

    #[async_trait]
    impl Generator for NoGenerator {
        async fn generate(&self, _prompt: &str) -> crate::Result<String> {
            Ok("generated".into())
        }
    }

    fn agent(dir: &std::path::Path) -> Agent {
        let model: Arc<dyn ChatModel> = Arc::new(FakeMistral);
        Agent::new(
            Classifier::with_template(model.clone(), "CLASSIFY: {input}"),
            ChatAgent::new(model, Duration::ZERO),
            KnowledgeAgent::new(
                Arc::new(NoEmbedder),
                Arc::new(LocalStore::new(dir)),
                Arc::new(NoGenerator),
                4,
                ChunkSettings {
                    chunk_size: 300,
                    chunk_overlap: 20,
                },
            ),
        )
    }

    #[tokio::test]
    async fn chat_questions_skip_the_index() {
        let dir = tempfile::tempdir().unwrap();
        let reply = agent(dir.path()).run("", "hi there").await.unwrap();

        assert_eq!(reply.classification, Classification::Chat);
        assert_eq!(reply.answer, "Hello!");
    }

    #[tokio::test]
    async fn knowledge_without_index_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = agent(dir.path())
            .run("  ", "my outlook is not working")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn knowledge_with_missing_index_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = agent(dir.path())
            .run("faiss_index_doc", "my outlook is not working")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::IndexNotFound(_)));
    }

    #[test]
    fn reply_serializes_label_lowercase() {
        let reply = AgentReply {
            classification: Classification::Knowledge,
            answer: "x".into(),
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["classification"], "knowledge");
    }
}

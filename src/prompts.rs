//! Prompt templates for the agents.
//!
//! Every prompt has a built-in default; a Markdown file with the same name in
//! `prompts/` replaces it.

use std::path::PathBuf;

use crate::{Error, Result};

/// Reply the knowledge agent is told to give when the context lacks the answer.
pub const NOT_FOUND_ANSWER: &str =
    "I could not find relevant information in the provided documents.";

const CLASSIFIER_TEMPLATE: &str = r#"You are a classifier. Your task:
- If the user text is a casual conversation (like greetings, jokes, small talk),
  classify as: chat
- If the text is about problem-solving, knowledge, or technical issues,
  classify as: knowledge

Output only one word: "chat" or "knowledge".

User text: {input}
"#;

const CHAT_SYSTEM_TEMPLATE: &str =
    "You are a friendly assistant that chats casually with the user.";

const RETRIEVER_TEMPLATE: &str = r#"You are a helpful AI assistant. Use the provided context to answer the question as accurately as possible.

Context:
{context}

Question:
{question}

Instructions:
- Base your answer strictly on the given context.
- If the context contains the answer, extract and summarize the most relevant information clearly and concisely.
- Do not add information that is not present in the context.
- If the answer cannot be found in the context, respond with:
  "I could not find relevant information in the provided documents."

Final Answer:
"#;

/// Available prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// chat/knowledge routing instruction, `{input}` placeholder.
    Classifier,
    /// System message for small talk.
    ChatSystem,
    /// Context-grounded answer, `{context}` and `{question}` placeholders.
    Retriever,
}

impl Prompt {
    /// Prompt file name (Markdown).
    pub fn filename(&self) -> &'static str {
        match self {
            Prompt::Classifier => "classifier.md",
            Prompt::ChatSystem => "chat_system.md",
            Prompt::Retriever => "retriever.md",
        }
    }

    pub fn default_template(&self) -> &'static str {
        match self {
            Prompt::Classifier => CLASSIFIER_TEMPLATE,
            Prompt::ChatSystem => CHAT_SYSTEM_TEMPLATE,
            Prompt::Retriever => RETRIEVER_TEMPLATE,
        }
    }

    /// File override if present, otherwise the built-in template.
    pub fn template(&self) -> String {
        load_prompt(self.filename()).unwrap_or_else(|_| self.default_template().to_string())
    }
}

/// Load a prompt by file name.
pub fn load_prompt(filename: &str) -> Result<String> {
    let path = prompts_dir().join(filename);
    std::fs::read_to_string(&path)
        .map_err(|e| Error::InvalidArgument(format!("Failed to load prompt {}: {}", filename, e)))
}

/// Path to the prompts directory.
pub fn prompts_dir() -> PathBuf {
    let candidates = [PathBuf::from("prompts"), PathBuf::from("../prompts")];

    for path in candidates {
        if path.exists() {
            return path;
        }
    }

    PathBuf::from("prompts")
}

/// Fill the classifier template.
pub fn classifier_prompt(template: &str, input: &str) -> String {
    template.replace("{input}", input)
}

/// Fill the retriever template.
///
/// The question is substituted last so braces inside retrieved text are never
/// re-expanded.
pub fn retriever_prompt(template: &str, context: &str, question: &str) -> String {
    template
        .replace("{question}", "\u{0}QUESTION\u{0}")
        .replace("{context}", context)
        .replace("\u{0}QUESTION\u{0}", question)
}

/// List of all prompts.
pub fn list_prompts() -> Vec<Prompt> {
    vec![Prompt::Classifier, Prompt::ChatSystem, Prompt::Retriever]
}

//! Shared fixtures: fake model services, sample documents, a running server.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};

use rag_helpdesk::agents::{Agent, ChatAgent, ChunkSettings, Classifier, KnowledgeAgent};
use rag_helpdesk::auth::{hash_password, StaticUserDirectory, UserRecord};
use rag_helpdesk::ingest::{Ingestor, TextSplitter};
use rag_helpdesk::integrations::{ChatMessage, ChatModel, Embedder, Generator};
use rag_helpdesk::store::{LocalStore, VectorStore};
use rag_helpdesk::{Error, Result, Services};

pub const GREETING: &str = "Hello! How can I help you today?";

/// One dimension per helpdesk topic plus a constant bias.
pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let t = text.to_lowercase();
        Ok(["outlook", "printer", "vpn"]
            .iter()
            .map(|k| t.contains(k) as u8 as f32)
            .chain(std::iter::once(0.1))
            .collect())
    }

    fn model(&self) -> &str {
        "keyword-embed"
    }
}

/// Classifier replies "chat" for greetings; small talk gets [`GREETING`].
pub struct FakeMistral;

#[async_trait]
impl ChatModel for FakeMistral {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let last = messages
            .last()
            .and_then(|m| m.content.clone())
            .unwrap_or_default()
            .to_lowercase();
        if let Some(input) = last.strip_prefix("classify: ") {
            let greeting = ["hi", "hello", "thanks"]
                .iter()
                .any(|g| input.starts_with(g));
            return Ok(if greeting { "chat" } else { "knowledge" }.to_string());
        }
        Ok(GREETING.to_string())
    }
}

pub enum GeneratorMode {
    /// Return the prompt itself
    Echo,
    Fixed(String),
    Fail(String),
}

pub struct FakeGenerator(pub GeneratorMode);

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        match &self.0 {
            GeneratorMode::Echo => Ok(prompt.to_string()),
            GeneratorMode::Fixed(reply) => Ok(reply.clone()),
            GeneratorMode::Fail(msg) => Err(Error::OllamaError(msg.clone())),
        }
    }
}

pub fn users() -> StaticUserDirectory {
    let user = |id: &str, password: &str, role: &str| UserRecord {
        id: id.to_string(),
        password_hash: hash_password(password),
        role: role.to_string(),
    };
    StaticUserDirectory::new([
        user("s1001", "student-pass", "student"),
        user("a0001", "admin-pass", "admin"),
        user("v0001", "visitor-pass", "visitor"),
    ])
}

/// Services over a temp directory with fake model backends.
pub fn services(root: &Path, generator: GeneratorMode) -> Services {
    let store: Arc<dyn VectorStore> = Arc::new(LocalStore::new(root.join("indexes")));
    let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder);
    let chat: Arc<dyn ChatModel> = Arc::new(FakeMistral);

    let knowledge = KnowledgeAgent::new(
        embedder.clone(),
        store.clone(),
        Arc::new(FakeGenerator(generator)),
        4,
        ChunkSettings {
            chunk_size: 300,
            chunk_overlap: 20,
        },
    )
    .with_template("CTX[{context}] Q[{question}]");

    Services {
        ingestor: Ingestor::new(
            embedder,
            store.clone(),
            TextSplitter::new(300, 20),
            root.join("uploads"),
        ),
        agent: Agent::new(
            Classifier::with_template(chat.clone(), "CLASSIFY: {input}"),
            ChatAgent::new(chat, Duration::ZERO),
            knowledge,
        ),
        store,
        users: Arc::new(users()),
        ollama: None,
    }
}

/// Serve the app on an ephemeral port and return its base URL.
pub async fn spawn_app(services: Services) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let router = rag_helpdesk::web::router(Arc::new(services));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Minimal PDF with one text line per page.
pub fn sample_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

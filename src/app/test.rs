//! Test suites and utilites.


use super::{
    document::store::FsDocumentStore,
    state::{AppProviderState, AppState},
    vector::local::LocalIndex,
};
use crate::{
    config::{Config, StartArgs},
    core::{
        document::loader::UrlLoader,
        embedder::{Embedder, EmbeddingTask},
        llm::Generator,
        model::Document,
    },
    error::DocqaError,
};
use clap::Parser;
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tempfile::TempDir;

/// Fixture documents, relative to the crate root.
pub const TEST_DOCS_PATH: &str = "test/docs";

pub const MOCK_ANSWER: &str = "Answered from the provided context.";

/// Pages served by the [MockLoader].
pub const RUST_PAGE: &str = "https://docs.example.com/rust";

#[derive(Clone)]
pub struct TestState {
    pub app: AppState,

    pub embedder: Arc<MockEmbedder>,

    pub generator: Arc<MockGenerator>,

    /// Holds the scratch directory so it does not get removed while tests run.
    pub dir: Arc<TempDir>,
}

impl TestState {
    pub async fn init() -> Self {
        let dir = tempfile::tempdir().expect("unable to create temp dir");

        let config = test_config(&dir);

        let embedder = Arc::new(MockEmbedder::default());
        let generator = Arc::new(MockGenerator::default());

        let providers = AppProviderState {
            embedder: embedder.clone(),
            generator: generator.clone(),
            index: Arc::new(LocalIndex::open(&config.index_path).await.unwrap()),
            loader: Arc::new(MockLoader::default()),
            store: Arc::new(FsDocumentStore::new(&config.upload_path).await.unwrap()),
        };

        let app = AppState::from_providers(providers, config).unwrap();

        Self {
            app,
            embedder,
            generator,
            dir: Arc::new(dir),
        }
    }

    pub fn upload_path(&self) -> PathBuf {
        self.app.config.upload_path.clone()
    }

    pub async fn index_count(&self) -> usize {
        self.app.providers.index.count().await.unwrap()
    }
}

/// Serve `router` on a random local port and return its base URL.
pub async fn serve_mock(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("unable to bind mock server");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{addr}")
}

fn test_config(dir: &TempDir) -> Config {
    let index_path = dir.path().join("index");
    let upload_path = dir.path().join("uploads");

    let args = StartArgs::parse_from([
        "docqa",
        "--api-key",
        "test-key",
        "--index-path",
        index_path.to_str().unwrap(),
        "--upload-path",
        upload_path.to_str().unwrap(),
        "--chunk-size",
        "200",
        "--chunk-overlap",
        "40",
        "--top-k",
        "3",
    ]);

    Config::try_from(&args).unwrap()
}

/// Long enough to produce multiple chunks with the test chunk size.
pub fn sample_text(topic: &str) -> String {
    (0..12)
        .map(|i| format!("Paragraph {i} about {topic}: the quick brown fox jumps over the lazy dog."))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Embeds text as its letter frequencies, so similar text lands close together.
#[derive(Debug, Default)]
pub struct MockEmbedder {
    pub calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; 27];
        // Keeps every vector away from the origin.
        vector[26] = 1.0;

        for c in text.chars().filter(char::is_ascii_alphabetic) {
            vector[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }

        vector
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Embedder for MockEmbedder {
    fn id(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-embedder"
    }

    async fn embed(
        &self,
        content: &[&str],
        _task: EmbeddingTask,
    ) -> Result<Vec<Vec<f32>>, DocqaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(content.iter().map(|text| Self::vector(text)).collect())
    }
}

/// Remembers the last prompt and always gives the same answer.
#[derive(Debug, Default)]
pub struct MockGenerator {
    pub last_prompt: Mutex<Option<String>>,
}

impl MockGenerator {
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Generator for MockGenerator {
    fn id(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-generator"
    }

    async fn generate(&self, prompt: &str) -> Result<String, DocqaError> {
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        Ok(MOCK_ANSWER.to_string())
    }
}

/// Serves a fixed set of pages, anything else is a 404.
pub struct MockLoader {
    pages: HashMap<String, String>,
}

impl Default for MockLoader {
    fn default() -> Self {
        Self {
            pages: HashMap::from([(RUST_PAGE.to_string(), sample_text("borrowing"))]),
        }
    }
}

#[async_trait::async_trait]
impl UrlLoader for MockLoader {
    async fn load(&self, urls: &[String]) -> Result<Vec<Document>, DocqaError> {
        urls.iter()
            .map(|url| match self.pages.get(url) {
                Some(page) => Ok(Document::new(page.clone(), url.clone())),
                None => Err(DocqaError::upstream(404, format!("unable to load {url}"))),
            })
            .collect()
    }
}

use super::{document::store::FsDocumentStore, loader::HttpUrlLoader, vector::local::LocalIndex};
use crate::{
    config::{Config, Provider, StartArgs},
    core::{
        chunk::{ChunkBaseConfig, SlidingWindow},
        document::{loader::UrlLoader, store::DocumentStore},
        embedder::Embedder,
        llm::Generator,
        service::{ingest::IngestService, query::QueryService},
        vector::VectorIndex,
    },
    error::DocqaError,
    map_err,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    pub services: ServiceState,

    pub providers: AppProviderState,

    pub config: Arc<Config>,
}

impl AppState {
    /// Load the application state using the provided configuration.
    pub async fn new(args: &StartArgs) -> Result<Self, DocqaError> {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from(args.log()))
            .init();

        let config = Config::try_from(args)?;

        info!("Starting with {config:?}");

        // Ensures the dynamic library is loaded and panics if it isn't
        pdfium_render::prelude::Pdfium::default();

        let client = map_err!(reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build());

        let (embedder, generator) = remote_providers(&config, client.clone());

        let providers = AppProviderState {
            embedder,
            generator,
            index: Arc::new(LocalIndex::open(&config.index_path).await?),
            loader: Arc::new(HttpUrlLoader::new(client)),
            store: Arc::new(FsDocumentStore::new(&config.upload_path).await?),
        };

        Self::from_providers(providers, config)
    }

    /// Wire the services on top of already constructed providers.
    pub fn from_providers(
        providers: AppProviderState,
        config: Config,
    ) -> Result<Self, DocqaError> {
        let chunker = map_err!(SlidingWindow::from_config(config.chunk));

        let services = ServiceState {
            ingest: IngestService::new(
                chunker,
                providers.embedder.clone(),
                providers.index.clone(),
                providers.loader.clone(),
                providers.store.clone(),
            ),
            query: QueryService::new(
                providers.embedder.clone(),
                providers.generator.clone(),
                providers.index.clone(),
                config.top_k,
            ),
        };

        Ok(Self {
            services,
            providers,
            config: Arc::new(config),
        })
    }

    pub async fn get_configuration(&self) -> Result<AppConfig, DocqaError> {
        Ok(AppConfig {
            provider: self.config.provider.to_string(),
            embedding_model: self.providers.embedder.model().to_string(),
            generation_model: self.providers.generator.model().to_string(),
            chunk: self.config.chunk,
            top_k: self.config.top_k,
            document_store: self.providers.store.id().to_string(),
            vector_index: self.providers.index.id().to_string(),
            index_entries: self.providers.index.count().await?,
        })
    }
}

type RemoteProviders = (
    Arc<dyn Embedder + Send + Sync>,
    Arc<dyn Generator + Send + Sync>,
);

fn remote_providers(config: &Config, client: reqwest::Client) -> RemoteProviders {
    let Config {
        api_endpoint: endpoint,
        api_key: key,
        embedding_model,
        generation_model,
        ..
    } = config;

    match config.provider {
        #[cfg(feature = "gemini")]
        Provider::Gemini => {
            use super::{embedder::gemini::GeminiEmbeddings, llm::gemini::GeminiGenerator};

            let embedder: Arc<dyn Embedder + Send + Sync> = Arc::new(GeminiEmbeddings::new(
                client.clone(),
                endpoint,
                key,
                embedding_model,
            ));
            let generator: Arc<dyn Generator + Send + Sync> =
                Arc::new(GeminiGenerator::new(client, endpoint, key, generation_model));

            (embedder, generator)
        }
        #[cfg(feature = "openai")]
        Provider::OpenAi => {
            use super::{embedder::openai::OpenAiEmbeddings, llm::openai::OpenAiGenerator};

            let embedder: Arc<dyn Embedder + Send + Sync> = Arc::new(OpenAiEmbeddings::new(
                client.clone(),
                endpoint,
                key,
                embedding_model,
            ));
            let generator: Arc<dyn Generator + Send + Sync> =
                Arc::new(OpenAiGenerator::new(client, endpoint, key, generation_model));

            (embedder, generator)
        }
    }
}

#[derive(Clone)]
pub struct ServiceState {
    pub ingest: IngestService,

    pub query: QueryService,
}

#[derive(Clone)]
pub struct AppProviderState {
    pub embedder: Arc<dyn Embedder + Send + Sync>,

    pub generator: Arc<dyn Generator + Send + Sync>,

    pub index: Arc<dyn VectorIndex + Send + Sync>,

    pub loader: Arc<dyn UrlLoader + Send + Sync>,

    pub store: Arc<dyn DocumentStore + Send + Sync>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AppConfig {
    /// The model API provider in use.
    pub provider: String,

    pub embedding_model: String,

    pub generation_model: String,

    /// Chunking parameters applied to every document.
    pub chunk: ChunkBaseConfig,

    /// Amount of chunks used as context for an answer.
    pub top_k: usize,

    pub document_store: String,

    pub vector_index: String,

    /// Amount of chunks in the vector index.
    pub index_entries: usize,
}

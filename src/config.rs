use crate::{
    core::{
        chunk::{ChunkBaseConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE},
        service::query::DEFAULT_TOP_K,
    },
    err,
    error::DocqaError,
    map_err,
};
use clap::Parser;
use serde::Serialize;
use std::{path::PathBuf, str::FromStr, time::Duration};

#[cfg(not(any(feature = "gemini", feature = "openai")))]
compile_error!("at least one of the `gemini` or `openai` features must be enabled");

/// The default address to listen on.
const DEFAULT_ADDRESS: &str = "0.0.0.0:5000";
/// The default directory of the vector index.
const DEFAULT_INDEX_PATH: &str = "faiss_index";
/// The default directory for raw uploads.
const DEFAULT_UPLOAD_PATH: &str = "uploads";
/// Seconds to wait for a remote model API before giving up on a request.
const DEFAULT_REQUEST_TIMEOUT: u64 = 60;

#[cfg(feature = "gemini")]
const DEFAULT_PROVIDER: &str = "gemini";
#[cfg(not(feature = "gemini"))]
const DEFAULT_PROVIDER: &str = "openai";

#[derive(Debug, Default, Parser)]
#[command(name = "docqa", version = "0.1", about = "Ask questions about your documents", long_about = None)]
pub struct StartArgs {
    /// Address to listen on.
    #[arg(short, long)]
    address: Option<String>,

    /// RUST_LOG string to use as the env filter.
    #[arg(short, long)]
    log: Option<String>,

    /// Model API provider, `gemini` or `openai`.
    #[arg(short, long)]
    provider: Option<String>,

    /// API key of the provider. Falls back to GOOGLE_API_KEY for Gemini
    /// and OPENAI_KEY for OpenAI.
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// Base URL of the provider API.
    #[arg(long)]
    api_endpoint: Option<String>,

    /// Model used for embeddings.
    #[arg(long)]
    embedding_model: Option<String>,

    /// Model used for answering questions.
    #[arg(long)]
    generation_model: Option<String>,

    /// Directory holding the vector index.
    #[arg(short, long)]
    index_path: Option<String>,

    /// Directory for raw uploaded files.
    #[arg(short, long)]
    upload_path: Option<String>,

    /// Amount of chunks used as context for an answer.
    #[arg(long)]
    top_k: Option<String>,

    /// Chunk size in characters.
    #[arg(long)]
    chunk_size: Option<String>,

    /// Amount of characters shared by consecutive chunks.
    #[arg(long)]
    chunk_overlap: Option<String>,

    /// Timeout of requests to the provider, in seconds.
    #[arg(long)]
    request_timeout: Option<String>,

    /// CORS allowed origins, comma separated. `*` allows any.
    #[arg(long)]
    cors_allowed_origins: Option<String>,
}

/// Implement a getter method on [StartArgs], using the `$var` environment variable as a fallback
/// and a default, or nothing, if neither the argument nor the environment variable is set.
macro_rules! arg {
    ($id:ident, $var:literal, default $value:expr) => {
        impl StartArgs {
            pub fn $id(&self) -> String {
                match &self.$id {
                    Some(val) => val.to_string(),
                    None => match std::env::var($var) {
                        Ok(val) => val,
                        Err(_) => $value,
                    },
                }
            }
        }
    };
    ($id:ident, $var:literal, optional) => {
        impl StartArgs {
            pub fn $id(&self) -> Option<String> {
                match &self.$id {
                    Some(val) => Some(val.to_string()),
                    None => std::env::var($var).ok(),
                }
            }
        }
    };
}

arg!(address,              "ADDRESS",              default DEFAULT_ADDRESS.to_string());
arg!(log,                  "RUST_LOG",             default "info".to_string());
arg!(provider,             "PROVIDER",             default DEFAULT_PROVIDER.to_string());
arg!(api_endpoint,         "API_ENDPOINT",         optional);
arg!(embedding_model,      "EMBEDDING_MODEL",      optional);
arg!(generation_model,     "GENERATION_MODEL",     optional);
arg!(index_path,           "INDEX_PATH",           default DEFAULT_INDEX_PATH.to_string());
arg!(upload_path,          "UPLOAD_PATH",          default DEFAULT_UPLOAD_PATH.to_string());
arg!(top_k,                "TOP_K",                default DEFAULT_TOP_K.to_string());
arg!(chunk_size,           "CHUNK_SIZE",           default DEFAULT_CHUNK_SIZE.to_string());
arg!(chunk_overlap,        "CHUNK_OVERLAP",        default DEFAULT_CHUNK_OVERLAP.to_string());
arg!(request_timeout,      "REQUEST_TIMEOUT",      default DEFAULT_REQUEST_TIMEOUT.to_string());
arg!(cors_allowed_origins, "CORS_ALLOWED_ORIGINS", default "*".to_string());

impl StartArgs {
    /// The API key, falling back to the environment variable of `provider`.
    pub fn api_key(&self, provider: Provider) -> Result<String, DocqaError> {
        if let Some(key) = &self.api_key {
            return Ok(key.to_string());
        }

        match std::env::var(provider.key_var()) {
            Ok(key) => Ok(key),
            Err(_) => err!(
                Config,
                "API key not found; Pass --api-key or set {}",
                provider.key_var()
            ),
        }
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors_allowed_origins()
            .split(',')
            .map(str::trim)
            .filter_map(|o| (!o.is_empty()).then_some(String::from(o)))
            .collect()
    }
}

/// Hosted model APIs used for embeddings and generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[cfg(feature = "gemini")]
    Gemini,

    #[cfg(feature = "openai")]
    OpenAi,
}

impl Provider {
    pub fn id(&self) -> &'static str {
        match self {
            #[cfg(feature = "gemini")]
            Self::Gemini => "gemini",
            #[cfg(feature = "openai")]
            Self::OpenAi => "openai",
        }
    }

    /// Environment variable holding the API key.
    pub fn key_var(&self) -> &'static str {
        match self {
            #[cfg(feature = "gemini")]
            Self::Gemini => "GOOGLE_API_KEY",
            #[cfg(feature = "openai")]
            Self::OpenAi => "OPENAI_KEY",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            #[cfg(feature = "gemini")]
            Self::Gemini => crate::app::embedder::gemini::DEFAULT_GEMINI_ENDPOINT,
            #[cfg(feature = "openai")]
            Self::OpenAi => crate::app::embedder::openai::DEFAULT_OPENAI_ENDPOINT,
        }
    }

    pub fn default_embedding_model(&self) -> &'static str {
        match self {
            #[cfg(feature = "gemini")]
            Self::Gemini => crate::app::embedder::gemini::EMBEDDING_001,
            #[cfg(feature = "openai")]
            Self::OpenAi => crate::app::embedder::openai::TEXT_EMBEDDING_3_SMALL,
        }
    }

    pub fn default_generation_model(&self) -> &'static str {
        match self {
            #[cfg(feature = "gemini")]
            Self::Gemini => crate::app::llm::gemini::GEMINI_1_5_PRO,
            #[cfg(feature = "openai")]
            Self::OpenAi => crate::app::llm::openai::GPT_4O_MINI,
        }
    }
}

impl FromStr for Provider {
    type Err = DocqaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            #[cfg(feature = "gemini")]
            "gemini" => Ok(Self::Gemini),
            #[cfg(feature = "openai")]
            "openai" => Ok(Self::OpenAi),
            _ => err!(InvalidProvider, "'{s}' is not enabled"),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Validated application configuration.
#[derive(Clone)]
pub struct Config {
    pub address: String,
    pub log: String,
    pub provider: Provider,
    pub api_key: String,
    pub api_endpoint: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub index_path: PathBuf,
    pub upload_path: PathBuf,
    pub top_k: usize,
    pub chunk: ChunkBaseConfig,
    pub request_timeout: Duration,

    /// Empty when any origin is allowed.
    pub allowed_origins: Vec<String>,
}

impl TryFrom<&StartArgs> for Config {
    type Error = DocqaError;

    fn try_from(args: &StartArgs) -> Result<Self, Self::Error> {
        let provider = args.provider().parse::<Provider>()?;

        let api_key = args.api_key(provider)?;
        if api_key.trim().is_empty() {
            return err!(Config, "API key for '{provider}' is empty");
        }

        let index_path = args.index_path();
        if index_path.trim().is_empty() {
            return err!(Config, "index path cannot be empty");
        }

        let upload_path = args.upload_path();
        if upload_path.trim().is_empty() {
            return err!(Config, "upload path cannot be empty");
        }

        let top_k = parse_number::<usize>("top-k", &args.top_k())?;
        if top_k == 0 {
            return err!(Config, "top-k must be greater than 0");
        }

        let chunk = ChunkBaseConfig::new(
            parse_number("chunk-size", &args.chunk_size())?,
            parse_number("chunk-overlap", &args.chunk_overlap())?,
        );
        map_err!(chunk.validate());

        let request_timeout = parse_number::<u64>("request-timeout", &args.request_timeout())?;
        if request_timeout == 0 {
            return err!(Config, "request-timeout must be greater than 0");
        }

        let allowed_origins = args.allowed_origins();
        let allowed_origins = if allowed_origins.iter().any(|o| o == "*") {
            vec![]
        } else {
            allowed_origins
        };

        Ok(Self {
            address: args.address(),
            log: args.log(),
            provider,
            api_key,
            api_endpoint: args
                .api_endpoint()
                .unwrap_or_else(|| provider.default_endpoint().to_string()),
            embedding_model: args
                .embedding_model()
                .unwrap_or_else(|| provider.default_embedding_model().to_string()),
            generation_model: args
                .generation_model()
                .unwrap_or_else(|| provider.default_generation_model().to_string()),
            index_path: PathBuf::from(index_path),
            upload_path: PathBuf::from(upload_path),
            top_k,
            chunk,
            request_timeout: Duration::from_secs(request_timeout),
            allowed_origins,
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("address", &self.address)
            .field("log", &self.log)
            .field("provider", &self.provider)
            .field("api_key", &"[REDACTED]")
            .field("api_endpoint", &self.api_endpoint)
            .field("embedding_model", &self.embedding_model)
            .field("generation_model", &self.generation_model)
            .field("index_path", &self.index_path)
            .field("upload_path", &self.upload_path)
            .field("top_k", &self.top_k)
            .field("chunk", &self.chunk)
            .field("request_timeout", &self.request_timeout)
            .field("allowed_origins", &self.allowed_origins)
            .finish()
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T, DocqaError> {
    match value.trim().parse() {
        Ok(n) => Ok(n),
        Err(_) => err!(Config, "{name} must be a positive integer, got '{value}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocqaErr;

    fn args(extra: &[&str]) -> StartArgs {
        let mut argv = vec!["docqa", "--api-key", "secret", "--provider", DEFAULT_PROVIDER];
        argv.extend_from_slice(extra);
        StartArgs::parse_from(argv)
    }

    #[test]
    fn explicit_arguments_are_used() {
        let config = Config::try_from(&args(&[
            "--index-path",
            "my_index",
            "--top-k",
            "8",
            "--chunk-size",
            "500",
            "--chunk-overlap",
            "50",
            "--request-timeout",
            "5",
            "--cors-allowed-origins",
            "http://localhost:3000, http://example.com",
        ]))
        .unwrap();

        assert_eq!("secret", config.api_key);
        assert_eq!(PathBuf::from("my_index"), config.index_path);
        assert_eq!(8, config.top_k);
        assert_eq!(ChunkBaseConfig::new(500, 50), config.chunk);
        assert_eq!(Duration::from_secs(5), config.request_timeout);
        assert_eq!(
            vec!["http://localhost:3000", "http://example.com"],
            config.allowed_origins
        );
    }

    #[test]
    fn provider_defaults_fill_models() {
        let config = Config::try_from(&args(&["--embedding-model", "custom-embedder"])).unwrap();

        assert_eq!("custom-embedder", config.embedding_model);
        assert_eq!(
            config.provider.default_generation_model(),
            config.generation_model
        );
    }

    #[test]
    fn wildcard_origin_allows_any() {
        let config = Config::try_from(&args(&["--cors-allowed-origins", "*"])).unwrap();
        assert!(config.allowed_origins.is_empty());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cases: [&[&str]; 5] = [
            &["--chunk-size", "100", "--chunk-overlap", "100"],
            &["--chunk-size", "abc"],
            &["--top-k", "0"],
            &["--request-timeout", "0"],
            &["--index-path", " "],
        ];

        for case in cases {
            assert!(Config::try_from(&args(case)).is_err(), "{case:?}");
        }
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let error = "llama".parse::<Provider>().unwrap_err();
        assert!(matches!(error.error, DocqaErr::InvalidProvider(_)));
    }

    #[test]
    fn api_key_is_redacted() {
        let config = Config::try_from(&args(&[])).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}

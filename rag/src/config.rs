use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Command that regenerates the chunk artifacts.
pub const PREP_COMMAND: &str = "mychat chunk";
/// Command that regenerates the index and metadata artifacts.
pub const REBUILD_COMMAND: &str = "mychat index";

#[derive(Clone, Debug)]
pub struct Config {
    pub source_dir: PathBuf,
    pub include_exts: Vec<String>,
    pub chunks_dir: PathBuf,
    pub index_path: PathBuf,
    pub meta_path: PathBuf,
    pub chunk_max_chars: usize,
    pub chunk_overlap: usize,
    pub min_chunk_chars: usize,
    pub top_k: usize,
    pub embed_batch_size: usize,
    pub ollama_url: String,
    pub embed_model: String,
    pub chat_model: String,
    pub max_output_tokens: usize,
    pub keep_alive: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("data/sources"),
            include_exts: vec![".txt".to_string()],
            chunks_dir: PathBuf::from("data/chunks"),
            index_path: PathBuf::from("vectordb/index.flat"),
            meta_path: PathBuf::from("vectordb/meta.json"),
            chunk_max_chars: 800,
            chunk_overlap: 120,
            min_chunk_chars: 50,
            top_k: 3,
            embed_batch_size: 64,
            ollama_url: "http://localhost:11434".to_string(),
            embed_model: "paraphrase-multilingual".to_string(),
            chat_model: "mistral:7b".to_string(),
            max_output_tokens: 220,
            keep_alive: "30m".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        // Load .env if present so model and path settings work without manual `source .env`.
        let _ = dotenvy::dotenv();
        let d = Self::default();
        Self {
            source_dir: env_path("RAG_SOURCE_DIR", d.source_dir),
            include_exts: env::var("RAG_INCLUDE_EXTS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(d.include_exts),
            chunks_dir: env_path("RAG_CHUNKS_DIR", d.chunks_dir),
            index_path: env_path("RAG_INDEX_PATH", d.index_path),
            meta_path: env_path("RAG_META_PATH", d.meta_path),
            chunk_max_chars: env_parse("RAG_CHUNK_SIZE", d.chunk_max_chars),
            chunk_overlap: env_parse("RAG_CHUNK_OVERLAP", d.chunk_overlap),
            min_chunk_chars: env_parse("RAG_MIN_CHUNK_CHARS", d.min_chunk_chars),
            top_k: env_parse("RAG_TOP_K", d.top_k),
            embed_batch_size: env_parse("RAG_EMBED_BATCH", d.embed_batch_size),
            ollama_url: env::var("OLLAMA_URL").unwrap_or(d.ollama_url),
            embed_model: env::var("OLLAMA_EMBED_MODEL").unwrap_or(d.embed_model),
            chat_model: env::var("OLLAMA_CHAT_MODEL").unwrap_or(d.chat_model),
            max_output_tokens: env_parse("RAG_MAX_TOKENS", d.max_output_tokens),
            keep_alive: env::var("OLLAMA_KEEP_ALIVE").unwrap_or(d.keep_alive),
            request_timeout_secs: env_parse("RAG_TIMEOUT_SECS", d.request_timeout_secs),
        }
    }
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    env::var_os(key).map(PathBuf::from).unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

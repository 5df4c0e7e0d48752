use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("index missing: {}\nRun: {rebuild}", .path.display())]
    IndexMissing { path: PathBuf, rebuild: &'static str },

    #[error("metadata missing: {}\nRun: {rebuild}", .path.display())]
    MetadataMissing { path: PathBuf, rebuild: &'static str },

    #[error("no documents with content found in {}", .dir.display())]
    EmptyCorpus { dir: PathBuf },

    #[error("no chunks found in {}; run `{prep}` first", .dir.display())]
    NoFragments { dir: PathBuf, prep: &'static str },

    #[error("corrupt index file {}: {reason}", .path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("index has {vectors} vectors but metadata has {entries} entries; rebuild both")]
    IndexMismatch { vectors: usize, entries: usize },

    #[error(
        "index written to {} but metadata could not be moved to {}: {source}\nRun: {rebuild}",
        .index.display(),
        .meta.display()
    )]
    PartialWrite {
        index: PathBuf,
        meta: PathBuf,
        rebuild: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("POST {url} failed: {status} {body}")]
    HttpStatus { url: String, status: u16, body: String },

    #[error("model not found: {model}")]
    ModelNotFound { model: String },

    #[error("invalid embeddings response: {0}")]
    EmbeddingFormat(String),

    #[error("embedding count mismatch: sent {sent} texts, got {got} vectors")]
    EmbeddingCount { sent: usize, got: usize },

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RagError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;

mod build_index;
mod build_prompt;
mod chunk_text;
mod config;
mod detect_lang;
mod embed_chunks;
mod embed_query;
mod error;
mod generate;
mod http;
mod retrieve_chunks;
mod scan_files;
mod session;
mod store_chunks;
mod store_index;
mod synthesize;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

pub use build_index::build_index;
pub use build_prompt::{
    compose, format_context_from_hits, ComposedMessage, Message, Role, REFUSAL_EN, REFUSAL_MS,
};
pub use chunk_text::{normalize_newlines, Chunker, Chunks};
pub use config::{Config, PREP_COMMAND, REBUILD_COMMAND};
pub use detect_lang::{detect_language, Language, LanguageDetector, WhatlangDetector};
pub use embed_chunks::{l2_normalize, Embedder, OllamaEmbedder};
pub use embed_query::embed_query;
pub use error::{RagError, Result};
pub use generate::{ChatModel, ChatOptions, OllamaChat};
pub use retrieve_chunks::{Hit, Retriever};
pub use scan_files::{scan_files, Document};
pub use session::{Session, Turn};
pub use store_chunks::{chunk_file_name, load_chunks, write_chunks, Fragment, StoredChunk};
pub use store_index::{load_index, save_index, ChunkMeta, FlatIndex};
pub use synthesize::{Answer, Synthesizer};

/// Chunk every document under the source directory and replace the chunk
/// artifacts. Returns the number of fragments written.
pub fn build_chunks(cfg: &Config, source: Option<&Path>) -> Result<usize> {
    let docs = scan_files(cfg, source);
    let chunker = Chunker::from_config(cfg);

    let mut fragments = Vec::new();
    for doc in &docs {
        for text in chunker.chunk_document(&doc.text) {
            fragments.push(Fragment {
                source: doc.name.clone(),
                ordinal: fragments.len(),
                text,
            });
        }
    }
    if fragments.is_empty() {
        return Err(RagError::EmptyCorpus {
            dir: source.unwrap_or(&cfg.source_dir).to_path_buf(),
        });
    }

    write_chunks(&cfg.chunks_dir, &fragments)?;
    info!(
        documents = docs.len(),
        chunks = fragments.len(),
        dir = %cfg.chunks_dir.display(),
        "wrote chunks"
    );
    Ok(fragments.len())
}

/// Answer text plus the fragments it was conditioned on, best first.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub answer: String,
    pub language: Language,
    pub sources: Vec<Hit>,
}

/// Query-time pipeline: retrieval followed by language-locked synthesis.
pub struct Pipeline {
    retriever: Retriever,
    synthesizer: Synthesizer,
    top_k: usize,
}

impl Pipeline {
    pub fn new(retriever: Retriever, synthesizer: Synthesizer, top_k: usize) -> Self {
        Self {
            retriever,
            synthesizer,
            top_k,
        }
    }

    /// Ollama-backed pipeline over the artifacts named in `cfg`.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let retriever = Retriever::open(cfg, Box::new(OllamaEmbedder::from_config(cfg)?))?;
        let synthesizer = Synthesizer::new(
            Box::new(OllamaChat::from_config(cfg)?),
            Arc::new(WhatlangDetector::new()),
            ChatOptions::from_config(cfg),
        );
        Ok(Self::new(retriever, synthesizer, cfg.top_k))
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn retrieve_and_answer(&self, session: &mut Session, question: &str) -> Result<Reply> {
        let sources = self.retriever.search(question, self.top_k)?;
        let answer = self.synthesizer.synthesize(question, &sources)?;
        info!(
            hits = sources.len(),
            lang = answer.language.tag(),
            translated = answer.translated,
            "answered question"
        );
        session.record(Turn {
            question: question.to_string(),
            answer: answer.text.clone(),
            language: answer.language,
        });
        Ok(Reply {
            answer: answer.text,
            language: answer.language,
            sources,
        })
    }
}

use std::fs;

use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::embed_chunks::Embedder;
use crate::embed_query::embed_query;
use crate::error::{RagError, Result};
use crate::store_index::{load_index, ChunkMeta, FlatIndex};

/// A retrieved fragment with its cosine similarity to the query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Hit {
    pub score: f64,
    pub text: String,
    pub path: String,
}

/// Read-only view over a persisted index; safe to share across threads.
pub struct Retriever {
    embedder: Box<dyn Embedder>,
    index: FlatIndex,
    meta: Vec<ChunkMeta>,
}

impl Retriever {
    /// Load the index pair named in `cfg`. Fails with a setup error naming the
    /// rebuild command if either file is absent.
    pub fn open(cfg: &Config, embedder: Box<dyn Embedder>) -> Result<Self> {
        let (index, meta) = load_index(&cfg.index_path, &cfg.meta_path)?;
        debug!(vectors = index.len(), dim = index.dim(), "loaded index");
        Ok(Self {
            embedder,
            index,
            meta,
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Up to `k` hits, highest score first. Fragment text is re-read from disk.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<Hit>> {
        let query_vec = embed_query(self.embedder.as_ref(), query)?;
        let ranked = self.index.search(&query_vec, k)?;

        let mut hits = Vec::with_capacity(ranked.len());
        for (pos, score) in ranked {
            let Some(meta) = self.meta.get(pos) else {
                return Err(RagError::IndexMismatch {
                    vectors: self.index.len(),
                    entries: self.meta.len(),
                });
            };
            let text = fs::read_to_string(&meta.path).map_err(|e| RagError::io(&meta.path, e))?;
            debug!(pos, score, path = %meta.path, "hit");
            hits.push(Hit {
                score: f64::from(score),
                text,
                path: meta.path.clone(),
            });
        }
        Ok(hits)
    }
}

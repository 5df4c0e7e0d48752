use crate::embed_chunks::Embedder;
use crate::error::{RagError, Result};

/// Embed a single query the same way fragments were embedded at build time.
pub fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let vecs = embedder.embed(&[text.to_string()], true)?;
    let got = vecs.len();
    vecs.into_iter()
        .next()
        .ok_or(RagError::EmbeddingCount { sent: 1, got })
}

use tracing::info;

use crate::config::{Config, PREP_COMMAND};
use crate::embed_chunks::Embedder;
use crate::error::{RagError, Result};
use crate::store_chunks::load_chunks;
use crate::store_index::{save_index, ChunkMeta, FlatIndex};

/// Embed every chunk artifact and replace the index/metadata pair.
/// Returns the number of indexed vectors.
pub fn build_index(cfg: &Config, embedder: &dyn Embedder) -> Result<usize> {
    let chunks = load_chunks(&cfg.chunks_dir)?;
    if chunks.is_empty() {
        return Err(RagError::NoFragments {
            dir: cfg.chunks_dir.clone(),
            prep: PREP_COMMAND,
        });
    }
    info!(chunks = chunks.len(), dir = %cfg.chunks_dir.display(), "embedding chunks");

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed(&texts, true)?;
    if vectors.len() != texts.len() {
        return Err(RagError::EmbeddingCount {
            sent: texts.len(),
            got: vectors.len(),
        });
    }

    let dim = vectors.first().map_or(0, Vec::len);
    let mut index = FlatIndex::new(dim);
    for vector in &vectors {
        index.add(vector)?;
    }
    let meta: Vec<ChunkMeta> = chunks
        .iter()
        .map(|c| ChunkMeta {
            path: c.path.to_string_lossy().to_string(),
        })
        .collect();

    save_index(&cfg.index_path, &cfg.meta_path, &index, &meta)?;
    info!(
        vectors = index.len(),
        dim,
        index = %cfg.index_path.display(),
        "saved flat index"
    );
    Ok(index.len())
}

//! Flat inner-product index and its parallel metadata file.
//!
//! The index file is little-endian: magic `FLAT`, a `u16` format version,
//! `u32` dimension, `u32` vector count, then `count * dim` `f32` values.
//! The metadata file is a JSON array with one `{ "path": ... }` record per
//! vector, in the same order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::REBUILD_COMMAND;
use crate::error::{RagError, Result};

const MAGIC: u32 = 0x5441_4c46;
const VERSION: u16 = 1;
const HEADER_LEN: usize = 14;

/// Exhaustive inner-product search over unit vectors (cosine similarity).
#[derive(Clone, Debug, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            data: Vec::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        self.check_dim(vector)?;
        self.data.extend_from_slice(vector);
        Ok(())
    }

    pub fn vector(&self, i: usize) -> Option<&[f32]> {
        self.data.chunks_exact(self.dim.max(1)).nth(i)
    }

    /// Top `k` positions by inner product, highest first. Equal scores keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        self.check_dim(query)?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dim)
            .map(|v| dot(v, query))
            .enumerate()
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        Ok(scored)
    }

    fn check_dim(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(RagError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        buffer.extend_from_slice(&MAGIC.to_le_bytes());
        buffer.extend_from_slice(&VERSION.to_le_bytes());
        buffer.extend_from_slice(&(self.dim as u32).to_le_bytes());
        buffer.extend_from_slice(&(self.len() as u32).to_le_bytes());
        for val in &self.data {
            buffer.extend_from_slice(&val.to_le_bytes());
        }
        buffer
    }

    /// Decode [`FlatIndex::to_bytes`] output. Errors carry a reason only; the
    /// caller attaches the file path.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, String> {
        if bytes.len() < HEADER_LEN {
            return Err("file too short".to_string());
        }
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != MAGIC {
            return Err("invalid magic".to_string());
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(format!("unsupported version {version}"));
        }
        let dim = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
        let count = u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]) as usize;

        let body = &bytes[HEADER_LEN..];
        let expected = dim
            .checked_mul(count)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| "header overflows".to_string())?;
        if body.len() != expected {
            return Err(format!(
                "expected {expected} bytes of vectors for {count}x{dim}, found {}",
                body.len()
            ));
        }
        let data = body
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(Self { dim, data })
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Per-vector metadata: where the fragment text lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub path: String,
}

// Older metadata files wrapped the record or stored a bare path.
#[derive(Deserialize)]
#[serde(untagged)]
enum MetaEntry {
    Record(ChunkMeta),
    Wrapped { meta: ChunkMeta },
    Path(String),
}

impl From<MetaEntry> for ChunkMeta {
    fn from(entry: MetaEntry) -> Self {
        match entry {
            MetaEntry::Record(meta) | MetaEntry::Wrapped { meta } => meta,
            MetaEntry::Path(path) => ChunkMeta { path },
        }
    }
}

/// Write both artifacts. Each file is staged beside its target, then the
/// index is renamed into place before the metadata. A failure before the
/// index rename leaves the previous pair untouched; a failed metadata rename
/// after it is reported as [`RagError::PartialWrite`]. Staged files are
/// removed on either failure.
pub fn save_index(
    index_path: &Path,
    meta_path: &Path,
    index: &FlatIndex,
    meta: &[ChunkMeta],
) -> Result<()> {
    if index.len() != meta.len() {
        return Err(RagError::IndexMismatch {
            vectors: index.len(),
            entries: meta.len(),
        });
    }
    let meta_json = serde_json::to_vec_pretty(meta)?;

    let index_tmp = staging_path(index_path);
    let meta_tmp = staging_path(meta_path);
    write_file(&index_tmp, &index.to_bytes())?;
    write_file(&meta_tmp, &meta_json)?;
    if let Err(e) = fs::rename(&index_tmp, index_path) {
        let _ = fs::remove_file(&index_tmp);
        let _ = fs::remove_file(&meta_tmp);
        return Err(RagError::io(index_path, e));
    }
    if let Err(source) = fs::rename(&meta_tmp, meta_path) {
        let _ = fs::remove_file(&meta_tmp);
        return Err(RagError::PartialWrite {
            index: index_path.to_path_buf(),
            meta: meta_path.to_path_buf(),
            rebuild: REBUILD_COMMAND,
            source,
        });
    }
    Ok(())
}

pub fn load_index(index_path: &Path, meta_path: &Path) -> Result<(FlatIndex, Vec<ChunkMeta>)> {
    if !index_path.exists() {
        return Err(RagError::IndexMissing {
            path: index_path.to_path_buf(),
            rebuild: REBUILD_COMMAND,
        });
    }
    if !meta_path.exists() {
        return Err(RagError::MetadataMissing {
            path: meta_path.to_path_buf(),
            rebuild: REBUILD_COMMAND,
        });
    }

    let bytes = fs::read(index_path).map_err(|e| RagError::io(index_path, e))?;
    let index = FlatIndex::from_bytes(&bytes).map_err(|reason| RagError::CorruptIndex {
        path: index_path.to_path_buf(),
        reason,
    })?;

    let raw = fs::read(meta_path).map_err(|e| RagError::io(meta_path, e))?;
    let entries: Vec<MetaEntry> = serde_json::from_slice(&raw)?;
    let meta: Vec<ChunkMeta> = entries.into_iter().map(ChunkMeta::from).collect();

    if index.len() != meta.len() {
        return Err(RagError::IndexMismatch {
            vectors: index.len(),
            entries: meta.len(),
        });
    }
    Ok((index, meta))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| RagError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| RagError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlatIndex {
        let mut index = FlatIndex::new(2);
        index.add(&[1.0, 0.0]).unwrap();
        index.add(&[0.0, 1.0]).unwrap();
        index.add(&[0.6, 0.8]).unwrap();
        index
    }

    #[test]
    fn bytes_decode_to_same_index() {
        let index = sample();
        let decoded = FlatIndex::from_bytes(&index.to_bytes()).unwrap();
        assert_eq!(decoded, index);
        assert_eq!(decoded.len(), 3);
    }

    #[test]
    fn rejects_truncated_and_foreign_files() {
        let bytes = sample().to_bytes();
        assert!(FlatIndex::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        assert_eq!(FlatIndex::from_bytes(b"nope").unwrap_err(), "file too short");
        let mut bad = bytes.clone();
        bad[0] ^= 0xff;
        assert_eq!(FlatIndex::from_bytes(&bad).unwrap_err(), "invalid magic");
    }

    #[test]
    fn search_ranks_by_inner_product() {
        let hits = sample().search(&[0.8, 0.6], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 2);
        assert_eq!(hits[1].0, 0);
        assert!(hits[0].1 >= hits[1].1);
    }

    #[test]
    fn search_rejects_wrong_dimension() {
        assert!(matches!(
            sample().search(&[1.0, 0.0, 0.0], 1),
            Err(RagError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn metadata_accepts_legacy_shapes() {
        let raw = r#"[{"path":"a.txt"},{"meta":{"path":"b.txt"}},"c.txt"]"#;
        let entries: Vec<MetaEntry> = serde_json::from_str(raw).unwrap();
        let meta: Vec<ChunkMeta> = entries.into_iter().map(ChunkMeta::from).collect();
        let paths: Vec<&str> = meta.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, ["a.txt", "b.txt", "c.txt"]);
    }

    fn meta_for(index: &FlatIndex) -> Vec<ChunkMeta> {
        (0..index.len())
            .map(|i| ChunkMeta {
                path: format!("chunk_{i:05}.txt"),
            })
            .collect()
    }

    #[test]
    fn failed_metadata_rename_is_reported_as_partial_write() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("index.bin");
        let meta_path = dir.path().join("meta.json");
        // A non-empty directory in the metadata's place makes the rename fail.
        fs::create_dir(&meta_path).unwrap();
        fs::write(meta_path.join("keep"), b"x").unwrap();

        let index = sample();
        let err = save_index(&index_path, &meta_path, &index, &meta_for(&index)).unwrap_err();

        assert!(matches!(err, RagError::PartialWrite { .. }));
        assert!(err.to_string().contains(REBUILD_COMMAND));
        assert!(index_path.exists());
        assert!(!staging_path(&meta_path).exists());
        assert!(!staging_path(&index_path).exists());
    }

    #[test]
    fn failed_index_rename_cleans_up_and_keeps_old_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("index.bin");
        let meta_path = dir.path().join("meta.json");
        fs::create_dir(&index_path).unwrap();
        fs::write(index_path.join("keep"), b"x").unwrap();
        fs::write(&meta_path, b"[]").unwrap();

        let index = sample();
        let err = save_index(&index_path, &meta_path, &index, &meta_for(&index)).unwrap_err();

        assert!(matches!(err, RagError::Io { .. }));
        assert_eq!(fs::read(&meta_path).unwrap(), b"[]");
        assert!(!staging_path(&meta_path).exists());
        assert!(!staging_path(&index_path).exists());
    }
}

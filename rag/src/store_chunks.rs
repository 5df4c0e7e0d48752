use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};

/// A chunk of a source document, numbered across the whole corpus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    pub source: String,
    pub ordinal: usize,
    pub text: String,
}

/// A fragment as read back from the chunk directory.
#[derive(Clone, Debug)]
pub struct StoredChunk {
    pub path: PathBuf,
    pub text: String,
}

pub fn chunk_file_name(ordinal: usize) -> String {
    format!("chunk_{ordinal:05}.txt")
}

/// Replace the contents of `dir` with one file per fragment.
pub fn write_chunks(dir: &Path, fragments: &[Fragment]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| RagError::io(dir, e))?;
    clear_chunks(dir)?;

    let mut written = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        let path = dir.join(chunk_file_name(fragment.ordinal));
        fs::write(&path, &fragment.text).map_err(|e| RagError::io(&path, e))?;
        written.push(path);
    }
    Ok(written)
}

/// Every `*.txt` file in `dir`, sorted by file name. A missing directory reads as empty.
pub fn load_chunks(dir: &Path) -> Result<Vec<StoredChunk>> {
    let mut paths = match list_txt(dir) {
        Ok(paths) => paths,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(RagError::io(dir, e)),
    };
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let text = fs::read_to_string(&path).map_err(|e| RagError::io(&path, e))?;
            Ok(StoredChunk { path, text })
        })
        .collect()
}

fn clear_chunks(dir: &Path) -> Result<()> {
    let paths = list_txt(dir).map_err(|e| RagError::io(dir, e))?;
    for path in paths {
        let is_chunk = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("chunk_"));
        if is_chunk {
            fs::remove_file(&path).map_err(|e| RagError::io(&path, e))?;
        }
    }
    Ok(())
}

fn list_txt(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            out.push(path);
        }
    }
    Ok(out)
}

use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Config;

/// One source document: file name plus raw UTF-8 text.
#[derive(Clone, Debug)]
pub struct Document {
    pub name: String,
    pub text: String,
}

/// Read every matching document under `source_dir`, ordered by path.
pub fn scan_files(cfg: &Config, source_dir: Option<&Path>) -> Vec<Document> {
    let base = source_dir.unwrap_or(&cfg.source_dir);
    let mut results = Vec::new();

    let walker = WalkDir::new(base)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok);

    for entry in walker {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !has_included_ext(path, &cfg.include_exts) {
            continue;
        }
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable document");
                continue;
            }
        };
        if text.trim().is_empty() {
            continue;
        }
        debug!(path = %path.display(), bytes = text.len(), "found document");
        results.push(Document {
            name: entry.file_name().to_string_lossy().to_string(),
            text,
        });
    }

    results
}

fn has_included_ext(path: &Path, exts: &[String]) -> bool {
    let lower = path.to_string_lossy().to_lowercase();
    exts.iter().any(|ext| lower.ends_with(ext.as_str()))
}

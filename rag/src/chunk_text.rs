use std::borrow::Cow;
use std::str::SplitWhitespace;

use crate::config::Config;

/// Word-boundary chunker with a character-based overlap seed.
#[derive(Clone, Copy, Debug)]
pub struct Chunker {
    max_chars: usize,
    overlap: usize,
    min_chars: usize,
}

impl Chunker {
    pub fn new(max_chars: usize, overlap: usize, min_chars: usize) -> Self {
        let max_chars = max_chars.max(1);
        let overlap = if overlap >= max_chars {
            max_chars / 4
        } else {
            overlap
        };
        Self {
            max_chars,
            overlap,
            min_chars,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.chunk_max_chars, cfg.chunk_overlap, cfg.min_chunk_chars)
    }

    /// Lazily split `text` into fragments. Pass text through
    /// [`normalize_newlines`] first when it comes straight from disk.
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            words: text.split_whitespace(),
            max_chars: self.max_chars,
            overlap: self.overlap,
            min_chars: self.min_chars,
            current: String::new(),
            current_len: 0,
            done: false,
        }
    }

    pub fn chunk_document(&self, text: &str) -> Vec<String> {
        let text = normalize_newlines(text);
        self.chunks(&text).collect()
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Collapse runs of two or more newlines into one.
pub fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if !text.contains("\n\n") {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut prev_newline = false;
    for c in text.chars() {
        if c == '\n' {
            if !prev_newline {
                out.push(c);
            }
            prev_newline = true;
        } else {
            out.push(c);
            prev_newline = false;
        }
    }
    Cow::Owned(out)
}

pub struct Chunks<'a> {
    words: SplitWhitespace<'a>,
    max_chars: usize,
    overlap: usize,
    min_chars: usize,
    current: String,
    // Counts every word plus one separator, and the raw tail length for a seed.
    current_len: usize,
    done: bool,
}

impl Chunks<'_> {
    fn next_raw(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        for word in self.words.by_ref() {
            if !self.current.is_empty() {
                self.current.push(' ');
            }
            self.current.push_str(word);
            self.current_len += word.chars().count() + 1;

            if self.current_len >= self.max_chars {
                let closed = std::mem::take(&mut self.current);
                let tail = overlap_tail(&closed, self.overlap);
                self.current = tail.split_whitespace().collect::<Vec<_>>().join(" ");
                // Counts the seed left after the partial leading word is
                // dropped, not the full `overlap` characters.
                self.current_len = if self.current.is_empty() {
                    0
                } else {
                    tail.chars().count()
                };
                return Some(closed);
            }
        }
        self.done = true;
        if self.current.is_empty() {
            None
        } else {
            self.current_len = 0;
            Some(std::mem::take(&mut self.current))
        }
    }
}

impl Iterator for Chunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let chunk = self.next_raw()?;
            if chunk.trim().chars().count() >= self.min_chars {
                return Some(chunk);
            }
        }
    }
}

/// Last `overlap` characters of `chunk`, minus any word cut in half at the front.
fn overlap_tail(chunk: &str, overlap: usize) -> &str {
    if overlap == 0 {
        return "";
    }
    let total = chunk.chars().count();
    if overlap >= total {
        return chunk;
    }
    let start = chunk
        .char_indices()
        .nth(total - overlap)
        .map(|(i, _)| i)
        .unwrap_or(chunk.len());
    let tail = &chunk[start..];
    let cut_mid_word = chunk[..start]
        .chars()
        .next_back()
        .is_some_and(|c| !c.is_whitespace());
    if cut_mid_word {
        match tail.find(char::is_whitespace) {
            Some(pos) => &tail[pos..],
            None => "",
        }
    } else {
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_drops_partial_leading_word() {
        assert_eq!(overlap_tail("alpha beta gamma", 8), " gamma");
        assert_eq!(overlap_tail("alpha beta gamma", 11), " beta gamma");
    }

    #[test]
    fn tail_on_word_boundary_is_kept_whole() {
        assert_eq!(overlap_tail("alpha beta gamma", 10), "beta gamma");
    }

    #[test]
    fn tail_counts_characters_not_bytes() {
        assert_eq!(overlap_tail("kata ñandú café", 4), "café");
    }

    #[test]
    fn zero_overlap_has_no_seed() {
        assert_eq!(overlap_tail("alpha beta", 0), "");
    }

    #[test]
    fn collapses_blank_lines() {
        assert_eq!(normalize_newlines("a\n\n\nb\nc"), "a\nb\nc");
        assert!(matches!(normalize_newlines("a\nb"), Cow::Borrowed(_)));
    }

    #[test]
    fn seed_length_excludes_the_dropped_partial_word() {
        // The seed " gamma" counts 6, so "epsilon" still fits under 16.
        let chunks: Vec<String> = Chunker::new(16, 8, 0)
            .chunks("alpha beta gamma epsilon zeta")
            .collect();
        assert_eq!(chunks, ["alpha beta gamma", "gamma epsilon zeta", "zeta"]);
    }

    #[test]
    fn overlap_not_smaller_than_size_is_clamped() {
        let chunker = Chunker::new(100, 150, 0);
        assert_eq!(chunker.overlap, 25);
    }
}

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{RagError, Result};
use crate::http::HttpClient;

/// Maps texts into a shared vector space. Implementations must be
/// deterministic for a given model so index and queries stay comparable.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String], normalize: bool) -> Result<Vec<Vec<f32>>>;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Serialize)]
struct EmbedLegacyRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Embeddings served by an Ollama instance.
#[derive(Clone, Debug)]
pub struct OllamaEmbedder {
    http: HttpClient,
    base_url: String,
    model: String,
    batch_size: usize,
}

impl OllamaEmbedder {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(Duration::from_secs(cfg.request_timeout_secs))?,
            base_url: cfg.ollama_url.trim_end_matches('/').to_string(),
            model: cfg.embed_model.clone(),
            batch_size: cfg.embed_batch_size.max(1),
        })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);
        let req = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        match self.http.post_json::<Value, _>(&url, &req) {
            Ok(res) => parse_embeddings(res),
            Err(err) if !falls_back_to_legacy(&err) => Err(err),
            Err(err) => {
                debug!(error = %err, "/api/embed failed, retrying with /api/embeddings");
                self.embed_legacy(texts)
            }
        }
    }

    // The legacy endpoint takes one prompt per request.
    fn embed_legacy(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let req = EmbedLegacyRequest {
                model: &self.model,
                prompt: text,
            };
            let res = self.http.post_json::<Value, _>(&url, &req)?;
            out.extend(parse_embeddings(res)?);
        }
        Ok(out)
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, texts: &[String], normalize: bool) -> Result<Vec<Vec<f32>>> {
        embed_in_batches(texts, self.batch_size, normalize, |batch| {
            self.embed_batch(batch)
        })
    }
}

// A missing model or a timeout would fail the same way on the legacy endpoint.
fn falls_back_to_legacy(err: &RagError) -> bool {
    !matches!(
        err,
        RagError::ModelNotFound { .. } | RagError::Timeout { .. }
    )
}

/// Runs `call` over `texts` in slices of at most `batch_size`, checking that
/// every slice yields one vector per text, then optionally normalizes.
fn embed_in_batches<F>(
    texts: &[String],
    batch_size: usize,
    normalize: bool,
    mut call: F,
) -> Result<Vec<Vec<f32>>>
where
    F: FnMut(&[String]) -> Result<Vec<Vec<f32>>>,
{
    let mut out = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let vectors = call(batch)?;
        if vectors.len() != batch.len() {
            return Err(RagError::EmbeddingCount {
                sent: batch.len(),
                got: vectors.len(),
            });
        }
        out.extend(vectors);
        debug!(done = out.len(), total = texts.len(), "embedded batch");
    }
    if normalize {
        out.iter_mut().for_each(|v| l2_normalize(v));
    }
    Ok(out)
}

/// Scale `v` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

fn parse_embeddings(value: Value) -> Result<Vec<Vec<f32>>> {
    if let Some(embeddings) = value.get("embeddings") {
        return parse_embeddings_value(embeddings);
    }
    if let Some(embedding) = value.get("embedding") {
        return parse_embeddings_value(embedding);
    }
    Err(RagError::EmbeddingFormat("no embeddings in response".into()))
}

fn parse_embeddings_value(value: &Value) -> Result<Vec<Vec<f32>>> {
    let arr = value
        .as_array()
        .ok_or_else(|| RagError::EmbeddingFormat("embeddings is not an array".into()))?;
    match arr.first() {
        None => Ok(vec![]),
        Some(first) if first.is_array() => arr.iter().map(parse_vec).collect(),
        Some(_) => Ok(vec![parse_vec(value)?]),
    }
}

fn parse_vec(value: &Value) -> Result<Vec<f32>> {
    let arr = value
        .as_array()
        .ok_or_else(|| RagError::EmbeddingFormat("embedding is not an array".into()))?;
    arr.iter()
        .map(|v| {
            v.as_f64()
                .map(|n| n as f32)
                .ok_or_else(|| RagError::EmbeddingFormat("embedding value is not a number".into()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_batched_and_single_shapes() {
        let batched = parse_embeddings(json!({"embeddings": [[1.0, 2.0], [3.0, 4.0]]})).unwrap();
        assert_eq!(batched, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);

        let single = parse_embeddings(json!({"embedding": [0.5, 0.25]})).unwrap();
        assert_eq!(single, vec![vec![0.5, 0.25]]);
    }

    #[test]
    fn rejects_missing_or_non_numeric_embeddings() {
        assert!(matches!(
            parse_embeddings(json!({"model": "x"})),
            Err(RagError::EmbeddingFormat(_))
        ));
        assert!(parse_embeddings(json!({"embeddings": [["a"]]})).is_err());
    }

    #[test]
    fn normalizes_to_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("text {i}")).collect()
    }

    #[test]
    fn splits_input_into_batches_in_order() {
        let mut sizes = Vec::new();
        let out = embed_in_batches(&texts(5), 2, false, |batch| {
            sizes.push(batch.len());
            Ok(batch
                .iter()
                .map(|t| vec![t.trim_start_matches("text ").parse::<f32>().unwrap()])
                .collect())
        })
        .unwrap();

        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(out, vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0], vec![4.0]]);
    }

    #[test]
    fn short_batch_is_a_count_error() {
        let mut calls = 0;
        let err = embed_in_batches(&texts(4), 2, false, |batch| {
            calls += 1;
            if calls == 2 {
                Ok(vec![vec![1.0]])
            } else {
                Ok(vec![vec![1.0]; batch.len()])
            }
        })
        .unwrap_err();

        assert!(matches!(err, RagError::EmbeddingCount { sent: 2, got: 1 }));
        assert_eq!(calls, 2);
    }

    #[test]
    fn batch_failure_stops_remaining_batches() {
        let mut calls = 0;
        let err = embed_in_batches(&texts(6), 2, false, |_| {
            calls += 1;
            Err(RagError::Timeout { url: "http://x/api/embed".into() })
        })
        .unwrap_err();

        assert!(matches!(err, RagError::Timeout { .. }));
        assert_eq!(calls, 1);
    }

    #[test]
    fn normalizes_across_batches() {
        let out = embed_in_batches(&texts(3), 2, true, |batch| {
            Ok(vec![vec![3.0, 4.0]; batch.len()])
        })
        .unwrap();

        assert_eq!(out.len(), 3);
        for v in out {
            assert!((v[0] - 0.6).abs() < 1e-6);
            assert!((v[1] - 0.8).abs() < 1e-6);
        }
    }

    #[test]
    fn zero_batch_size_still_embeds_one_at_a_time() {
        let mut sizes = Vec::new();
        embed_in_batches(&texts(2), 0, false, |batch| {
            sizes.push(batch.len());
            Ok(vec![vec![1.0]; batch.len()])
        })
        .unwrap();
        assert_eq!(sizes, vec![1, 1]);
    }

    #[test]
    fn only_recoverable_errors_fall_back_to_legacy_endpoint() {
        assert!(!falls_back_to_legacy(&RagError::ModelNotFound { model: "m".into() }));
        assert!(!falls_back_to_legacy(&RagError::Timeout { url: "u".into() }));
        assert!(falls_back_to_legacy(&RagError::HttpStatus {
            url: "u".into(),
            status: 404,
            body: "404 page not found".into(),
        }));
        assert!(falls_back_to_legacy(&RagError::EmbeddingFormat("x".into())));
    }
}

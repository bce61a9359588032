//! ONNX Runtime sentence embeddings for clause and template text.
//!
//! Uses a sentence-transformers model (all-MiniLM-L6-v2 by default, 384
//! dimensions). The model directory must contain `model.onnx` and
//! `tokenizer.json`.
//!
//! Contract clauses regularly run past the model's context. Instead of
//! dropping the tail, a long clause is split into overlapping token windows;
//! every window is a row of the same model batch, and the clause vector is
//! the mean of all its unmasked token states across windows, L2-normalized.

use std::path::Path;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Encoding, Tokenizer};
use tracing::{debug, info};

use crate::embedding::TextEmbedder;

/// Tokens per window, special tokens included.
const CLAUSE_WINDOW_TOKENS: usize = 256;

/// Tokens shared by consecutive windows of one clause.
const WINDOW_STRIDE: usize = 32;

/// Sentence embedding generator using ONNX Runtime.
pub struct Embedder {
    session: Session,
    tokenizer: Tokenizer,
    dim: usize,
}

/// One model input row: a token window of a single text.
#[derive(Debug)]
struct Window {
    /// Index of the text in the batch.
    owner: usize,
    ids: Vec<i64>,
    mask: Vec<i64>,
    type_ids: Vec<i64>,
}

impl Window {
    fn from_encoding(owner: usize, encoding: &Encoding) -> Self {
        let widen = |v: &[u32]| v.iter().map(|&x| x as i64).collect::<Vec<_>>();
        Self {
            owner,
            ids: widen(encoding.get_ids()),
            mask: widen(encoding.get_attention_mask()),
            type_ids: widen(encoding.get_type_ids()),
        }
    }
}

impl Embedder {
    /// Load an embedding model from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let session = Session::builder()?.commit_from_file(&model_path)?;
        let dim = infer_dim(session.outputs()[0].dtype()).unwrap_or(384);

        // Overflow is kept as extra windows; rows are padded in `run_batch`.
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: CLAUSE_WINDOW_TOKENS,
                stride: WINDOW_STRIDE,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;
        tokenizer.with_padding(None);

        info!(dim, model = %model_path.display(), "loaded embedding model");
        Ok(Self {
            session,
            tokenizer,
            dim,
        })
    }

    /// Tokenize `texts` into windows, one per model row.
    fn windows(&self, texts: &[&str]) -> anyhow::Result<Vec<Window>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let mut windows = Vec::with_capacity(encodings.len());
        for (owner, encoding) in encodings.iter().enumerate() {
            windows.push(Window::from_encoding(owner, encoding));
            let overflow = encoding.get_overflowing();
            if !overflow.is_empty() {
                debug!(text = owner, windows = overflow.len() + 1, "long clause split into windows");
            }
            windows.extend(overflow.iter().map(|e| Window::from_encoding(owner, e)));
        }
        Ok(windows)
    }

    fn run_batch(&mut self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        let windows = self.windows(texts)?;
        let rows = windows.len();
        let seq_len = windows.iter().map(|w| w.ids.len()).max().unwrap_or(0);

        // Flat [rows, seq_len] inputs, zero padded on the right.
        let mut input_ids = vec![0i64; rows * seq_len];
        let mut attention_mask = vec![0i64; rows * seq_len];
        let mut token_type_ids = vec![0i64; rows * seq_len];
        for (r, w) in windows.iter().enumerate() {
            let row = r * seq_len..r * seq_len + w.ids.len();
            input_ids[row.clone()].copy_from_slice(&w.ids);
            attention_mask[row.clone()].copy_from_slice(&w.mask);
            token_type_ids[row].copy_from_slice(&w.type_ids);
        }

        let shape = [rows as i64, seq_len as i64];
        let outputs = self.session.run(ort::inputs![
            "input_ids" => Tensor::from_array((shape, input_ids.into_boxed_slice()))?,
            "attention_mask" => Tensor::from_array((shape, attention_mask.into_boxed_slice()))?,
            "token_type_ids" => Tensor::from_array((shape, token_type_ids.into_boxed_slice()))?,
        ])?;

        // Token states: [rows, seq, dim].
        let (output_shape, token_states) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[0] as usize == rows && dims[2] as usize == self.dim,
            "unexpected output shape: {dims:?}, expected [{rows}, {seq_len}, {}]",
            self.dim
        );

        Ok(pool_windows(
            &windows,
            token_states,
            dims[1] as usize,
            self.dim,
            texts.len(),
        ))
    }
}

impl TextEmbedder for Embedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&mut self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.run_batch(texts)
    }
}

/// Mean of the unmasked token states of every window owned by each text,
/// L2-normalized. `token_states` is `[windows.len(), out_seq, dim]`.
fn pool_windows(
    windows: &[Window],
    token_states: &[f32],
    out_seq: usize,
    dim: usize,
    texts: usize,
) -> Vec<Vec<f32>> {
    let mut sums = vec![vec![0.0f32; dim]; texts];
    let mut counts = vec![0usize; texts];

    for (r, w) in windows.iter().enumerate() {
        let live = w.mask.iter().take(out_seq).enumerate().filter(|(_, m)| **m > 0);
        for (j, _) in live {
            let offset = (r * out_seq + j) * dim;
            let state = &token_states[offset..offset + dim];
            for (s, x) in sums[w.owner].iter_mut().zip(state) {
                *s += x;
            }
            counts[w.owner] += 1;
        }
    }

    sums.into_iter()
        .zip(counts)
        .map(|(mut v, n)| {
            if n > 0 {
                v.iter_mut().for_each(|x| *x /= n as f32);
            }
            normalize_in_place(&mut v);
            v
        })
        .collect()
}

/// L2-normalize a pooled vector; an all-zero vector is left as is.
fn normalize_in_place(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Embedding dimension from the model's output type (last axis).
fn infer_dim(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_sim;
    use std::path::PathBuf;

    fn window(owner: usize, mask: &[i64]) -> Window {
        Window {
            owner,
            ids: vec![1; mask.len()],
            mask: mask.to_vec(),
            type_ids: vec![0; mask.len()],
        }
    }

    #[test]
    fn windows_of_one_clause_pool_together() {
        // Two windows for clause 0, one for clause 1; seq 2, dim 2.
        let windows = [window(0, &[1, 1]), window(0, &[1, 0]), window(1, &[1, 0])];
        let states = [
            1.0, 0.0, 3.0, 0.0, // clause 0, first window
            2.0, 0.0, 9.0, 9.0, // clause 0, second window; padding masked out
            0.0, 5.0, 7.0, 7.0, // clause 1; padding masked out
        ];
        let pooled = pool_windows(&windows, &states, 2, 2, 2);
        assert_eq!(pooled, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn text_without_tokens_pools_to_zero() {
        let pooled = pool_windows(&[window(0, &[0, 0])], &[4.0; 4], 2, 2, 2);
        assert_eq!(pooled, vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn shorter_model_output_ignores_trailing_mask() {
        let pooled = pool_windows(&[window(0, &[1, 1, 1])], &[0.0, 2.0, 0.0, 6.0], 2, 2, 1);
        assert_eq!(pooled, vec![vec![0.0, 1.0]]);
    }

    fn model_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("models")
            .join("all-MiniLM-L6-v2")
    }

    #[test]
    #[ignore = "needs models/all-MiniLM-L6-v2/model.onnx"]
    fn embed_clause_is_unit_length() {
        let mut embedder = Embedder::load(&model_dir()).unwrap();
        let v = embedder
            .embed("Either party may terminate with 60 days notice.")
            .unwrap();
        assert_eq!(v.len(), embedder.dim());
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "expected unit norm, got {norm}");
    }

    #[test]
    #[ignore = "needs models/all-MiniLM-L6-v2/model.onnx"]
    fn long_clause_keeps_its_tail() {
        let mut embedder = Embedder::load(&model_dir()).unwrap();
        let filler = "The parties acknowledge the recitals above. ".repeat(60);
        let tail = "Either party may terminate this Agreement with 60 days notice.";
        let long = format!("{filler}{tail}");
        let head_only = embedder.embed(&filler).unwrap();
        let full = embedder.embed(&long).unwrap();
        let termination = embedder.embed(tail).unwrap();
        assert!(cosine_sim(&full, &termination) > cosine_sim(&head_only, &termination));
    }

    #[test]
    #[ignore = "needs models/all-MiniLM-L6-v2/model.onnx"]
    fn empty_batch() {
        let mut embedder = Embedder::load(&model_dir()).unwrap();
        assert!(embedder.embed_batch(&[]).unwrap().is_empty());
    }
}

//! Embedding backends.
//!
//! Two implementations of [`TextEmbedder`] ship with the crate:
//!
//! - [`LexicalEmbedder`]: feature-hashed word and character-trigram vectors.
//!   Needs no model files and is fully deterministic, but only captures
//!   surface overlap between texts.
//! - `Embedder` (feature `onnx`): sentence-transformers models through ONNX
//!   Runtime, for real semantic similarity.

/// Text → fixed-length vector capability.
///
/// Implementations must be deterministic for identical input within one
/// process, and vectors from one instance must be comparable by cosine
/// similarity.
pub trait TextEmbedder {
    /// Embedding dimensionality.
    fn dim(&self) -> usize;

    /// Embed a batch of texts, returning one vector per input.
    fn embed_batch(&mut self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    fn embed(&mut self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("embedding backend returned no vector"))
    }
}

/// Cosine similarity. Zero vectors have similarity 0 with everything.
pub fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

pub const DEFAULT_LEXICAL_DIM: usize = 512;

/// Weight of one character trigram relative to a whole word.
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Function words common to every clause. They carry no category signal and
/// would otherwise dominate short texts.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "any", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it",
    "its", "of", "on", "or", "other", "shall", "such", "that", "the", "their", "this", "to",
    "with",
];

/// Signed feature-hashing embedder over lowercase words and their
/// character trigrams.
///
/// Trigrams let inflections share mass (`terminate` / `termination`).
/// Stopwords are skipped unless the text has nothing else, so a non-empty
/// text never embeds to the zero vector.
#[derive(Debug, Clone)]
pub struct LexicalEmbedder {
    dim: usize,
}

impl Default for LexicalEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_LEXICAL_DIM)
    }
}

impl LexicalEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let content: Vec<&str> = words
            .iter()
            .copied()
            .filter(|w| !STOPWORDS.contains(w))
            .collect();
        let kept = if content.is_empty() { words } else { content };

        for word in kept {
            self.accumulate(&mut v, word.as_bytes(), 1.0);

            let padded: Vec<char> = std::iter::once('<')
                .chain(word.chars())
                .chain(std::iter::once('>'))
                .collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                self.accumulate(&mut v, gram.as_bytes(), TRIGRAM_WEIGHT);
            }
        }
        v
    }

    fn accumulate(&self, v: &mut [f32], feature: &[u8], weight: f32) {
        let h = fnv1a(feature);
        let bucket = (h % self.dim as u64) as usize;
        let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign * weight;
    }
}

impl TextEmbedder for LexicalEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&mut self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

//! Exact inner-product index over L2-normalized vectors.
//!
//! With unit-length vectors the inner product is the cosine similarity, so a
//! flat scan returns the true nearest neighbour. Template corpora are small
//! (tens of documents), which keeps the scan cheaper than any ANN structure.

use crate::StoreError;

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Insertion position of the matched vector.
    pub index: usize,
    pub label: String,
    /// Inner product with the query (cosine similarity for normalized input).
    pub similarity: f32,
}

/// Flat index of labelled unit vectors. Built once, then read-only.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dim: usize,
    labels: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            labels: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Normalize `vector` and append it under `label`.
    pub fn add(&mut self, label: impl Into<String>, vector: Vec<f32>) -> Result<(), StoreError> {
        let label = label.into();
        self.check_dim(vector.len())?;
        let unit = normalize(vector, &label)?;
        self.labels.push(label);
        self.vectors.push(unit);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The `k` most similar vectors to a normalized `query`, best first.
    ///
    /// Equal similarities keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, StoreError> {
        self.check_dim(query.len())?;
        let mut hits: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, inner_product(query, v)))
            .collect();

        // Stable sort: ties stay in insertion order.
        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);

        Ok(hits
            .into_iter()
            .map(|(index, similarity)| Neighbor {
                index,
                label: self.labels[index].clone(),
                similarity,
            })
            .collect())
    }

    /// Single nearest neighbour of a normalized `query`.
    pub fn nearest(&self, query: &[f32]) -> Result<Neighbor, StoreError> {
        self.search(query, 1)?
            .into_iter()
            .next()
            .ok_or(StoreError::EmptyIndex)
    }

    fn check_dim(&self, actual: usize) -> Result<(), StoreError> {
        if actual != self.dim {
            return Err(StoreError::DimensionMismatch {
                expected: self.dim,
                actual,
            });
        }
        Ok(())
    }
}

/// L2-normalize a vector. `what` names the vector in the zero-norm error.
pub fn normalize(mut v: Vec<f32>, what: &str) -> Result<Vec<f32>, StoreError> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !norm.is_finite() || norm == 0.0 {
        return Err(StoreError::ZeroVector(what.to_string()));
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
    Ok(v)
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

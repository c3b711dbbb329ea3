//! Exact inner-product vector index over L2-normalized embeddings.
//!
//! Vectors are normalized on insert and queries are normalized on search,
//! so the inner product is the cosine similarity. Search is brute force
//! over a flat row-major buffer. Row `i` belongs to corpus document `i`.
//!
//! ```text
//!            a · b
//! cos(θ) = ─────────
//!          ‖a‖ × ‖b‖
//! ```

use serde::Serialize;

use crate::error::{RagError, Result};

/// One search result: corpus position and cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexHit {
    pub position: usize,
    pub score: f32,
}

/// Read-only index built once from the corpus embeddings.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dims: usize,
    rows: usize,
    data: Vec<f32>,
}

impl VectorIndex {
    /// Normalize and store `vectors`. The dimension is taken from the first
    /// vector; every other vector must match it.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Ok(Self::default());
        };
        let dims = first.len();
        let rows = vectors.len();

        let mut data = Vec::with_capacity(rows * dims);
        for (position, mut vector) in vectors.into_iter().enumerate() {
            if vector.len() != dims {
                return Err(RagError::DimensionMismatch {
                    expected: dims,
                    found: vector.len(),
                    position,
                });
            }
            l2_normalize(&mut vector);
            data.extend_from_slice(&vector);
        }

        Ok(Self { dims, rows, data })
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Top-`k` rows by cosine similarity, descending; ties go to the lower
    /// position. Returns every row when `k` exceeds the index size. Rows
    /// that score NaN are never returned.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dims {
            return Err(RagError::DimensionMismatch {
                expected: self.dims,
                found: query.len(),
                position: 0,
            });
        }

        let mut query = query.to_vec();
        l2_normalize(&mut query);

        let mut hits: Vec<IndexHit> = (0..self.rows)
            .map(|position| {
                let start = position * self.dims;
                IndexHit {
                    position,
                    score: dot(&query, &self.data[start..start + self.dims]),
                }
            })
            .filter(|hit| !hit.score.is_nan())
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.position.cmp(&b.position))
        });
        hits.truncate(k);
        Ok(hits)
    }
}

/// Scale `vector` to unit length in place. Zero vectors are left as is.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm < f32::EPSILON {
        return;
    }
    for x in vector.iter_mut() {
        *x /= norm;
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

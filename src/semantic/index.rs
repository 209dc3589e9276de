//! Embedding matrix and flat inner-product vector index.
//!
//! Rows are addressed positionally: row `i` of the matrix is record `i` of
//! whatever sequence the matrix was built for.

use rayon::prelude::*;

/// Row-major dense matrix of embeddings, one row per record.
#[derive(Debug, Clone, PartialEq)]
pub struct Embeddings {
    data: Vec<f32>,
    dimensions: usize,
}

/// Search hit from the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Row position in the indexed matrix
    pub row: usize,
    /// Inner product with the query (cosine similarity, -1.0 to 1.0)
    pub score: f32,
}

/// In-memory nearest-neighbor index over L2-normalized vectors.
///
/// Built once from an [`Embeddings`] matrix and queried many times.
/// Equivalent to an exhaustive inner-product scan.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    vectors: Embeddings,
}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Cannot search with zero-norm vector")]
    ZeroNormVector,

    #[error("Vector contains NaN or infinite values")]
    NonFinite,
}

impl Embeddings {
    /// Create an empty matrix with the given row width.
    pub fn empty(dimensions: usize) -> Self {
        Self {
            data: Vec::new(),
            dimensions,
        }
    }

    /// Build a matrix from individual rows, checking every row width.
    ///
    /// Rows with NaN or infinite components are rejected.
    pub fn from_rows(dimensions: usize, rows: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        let mut data = Vec::with_capacity(rows.len() * dimensions);
        for row in rows {
            if row.len() != dimensions {
                return Err(IndexError::DimensionMismatch {
                    expected: dimensions,
                    got: row.len(),
                });
            }
            if !is_finite(&row) {
                return Err(IndexError::NonFinite);
            }
            data.extend(row);
        }
        Ok(Self { data, dimensions })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.data.len() / self.dimensions
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow row `i`, or `None` when out of range.
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        let start = i.checked_mul(self.dimensions)?;
        let end = start.checked_add(self.dimensions)?;
        self.data.get(start..end)
    }

    /// Copy the listed rows, in the listed order, into a new matrix.
    ///
    /// Indices outside the matrix are skipped.
    pub fn gather(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.dimensions);
        for &i in indices {
            if let Some(row) = self.row(i) {
                data.extend_from_slice(row);
            }
        }
        Self {
            data,
            dimensions: self.dimensions,
        }
    }

    /// Scale every row to unit L2 norm. Zero rows are left untouched.
    pub fn normalize_rows(&mut self) {
        if self.dimensions == 0 {
            return;
        }
        self.data
            .par_chunks_mut(self.dimensions)
            .for_each(|row| {
                l2_normalize(row);
            });
    }
}

impl VectorIndex {
    /// Build an index over `vectors`, L2-normalizing each row.
    ///
    /// An empty matrix yields a usable index whose searches return nothing.
    pub fn build(mut vectors: Embeddings) -> Self {
        vectors.normalize_rows();
        Self { vectors }
    }

    pub fn dimensions(&self) -> usize {
        self.vectors.dimensions()
    }

    /// Get the number of indexed rows.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The normalized vectors held by the index.
    pub fn vectors(&self) -> &Embeddings {
        &self.vectors
    }

    /// Return the `top_k` rows with the highest inner product against `query`.
    ///
    /// The query is L2-normalized first, so scores are cosine similarities.
    /// `top_k` is clamped to the number of rows. Results are sorted by score
    /// (highest first), ties broken by ascending row.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if query.len() != self.dimensions() {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions(),
                got: query.len(),
            });
        }

        if !is_finite(query) {
            return Err(IndexError::NonFinite);
        }

        let k = top_k.min(self.len());
        if k == 0 {
            return Ok(vec![]);
        }

        let mut query = query.to_vec();
        if !l2_normalize(&mut query) {
            return Err(IndexError::ZeroNormVector);
        }

        let mut hits: Vec<SearchHit> = self
            .vectors
            .data
            .par_chunks_exact(self.dimensions())
            .enumerate()
            .map(|(row, vector)| SearchHit {
                row,
                score: dot(&query, vector),
            })
            .collect();

        // total order, so the comparator stays consistent for any score
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.row.cmp(&b.row)));
        hits.truncate(k);

        Ok(hits)
    }
}

/// Compute L2 norm of a vector.
fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalize in place. Returns false (and leaves `v` alone) for a zero vector
/// or one whose norm is not finite.
pub fn l2_normalize(v: &mut [f32]) -> bool {
    let norm = l2_norm(v);
    if !norm.is_finite() || norm < f32::EPSILON {
        return false;
    }
    v.iter_mut().for_each(|x| *x /= norm);
    true
}

fn is_finite(v: &[f32]) -> bool {
    v.iter().all(|x| x.is_finite())
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

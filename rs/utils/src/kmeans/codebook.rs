use crate::distance::l2::normalize_in_place;
use crate::error::{QuantizationError, Result};

/// A set of centroids of equal dimension, stored flattened in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Codebook {
    dimension: usize,
    centroids: Vec<f32>,
}

impl Codebook {
    pub fn new(dimension: usize, centroids: Vec<f32>) -> Result<Self> {
        if dimension == 0 {
            return Err(QuantizationError::InvalidClusterConfig(
                "codebook dimension must be at least 1".to_string(),
            ));
        }
        if centroids.len() % dimension != 0 {
            return Err(QuantizationError::InvalidClusterConfig(format!(
                "{} centroid values do not split into rows of dimension {}",
                centroids.len(),
                dimension
            )));
        }
        Ok(Self {
            dimension,
            centroids,
        })
    }

    /// Builds a codebook by copying the given rows.
    pub fn from_rows(dimension: usize, rows: &[&[f32]]) -> Result<Self> {
        let mut centroids = Vec::with_capacity(rows.len() * dimension);
        for row in rows {
            if row.len() != dimension {
                return Err(QuantizationError::DimensionMismatch {
                    expected: dimension,
                    actual: row.len(),
                });
            }
            centroids.extend_from_slice(row);
        }
        Self::new(dimension, centroids)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn num_centroids(&self) -> usize {
        self.centroids.len() / self.dimension
    }

    /// Panics if `index >= num_centroids()`.
    pub fn centroid(&self, index: usize) -> &[f32] {
        &self.centroids[index * self.dimension..(index + 1) * self.dimension]
    }

    pub fn centroid_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.centroids[index * self.dimension..(index + 1) * self.dimension]
    }

    pub fn iter(&self) -> std::slice::ChunksExact<'_, f32> {
        self.centroids.chunks_exact(self.dimension)
    }

    pub fn as_flattened(&self) -> &[f32] {
        &self.centroids
    }

    pub fn into_flattened(self) -> Vec<f32> {
        self.centroids
    }

    /// Scales every centroid to unit length. Zero centroids stay zero.
    pub fn normalize_centroids(&mut self) {
        self.centroids
            .chunks_exact_mut(self.dimension)
            .for_each(|centroid| {
                normalize_in_place(centroid);
            });
    }
}

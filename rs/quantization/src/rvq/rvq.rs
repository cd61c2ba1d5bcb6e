use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use utils::distance::l2::{l2_norm, normalize};
use utils::error::{check_dimension, QuantizationError, Result};
use utils::kmeans::codebook::Codebook;
use utils::kmeans::kmeans::{nearest_centroid, IterationPolicy};
use utils::kmeans::seeding::SeedingType;

use crate::quantization::Quantizer;
use crate::rvq::rvq_builder::RvqState;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResidualQuantizerConfig {
    pub dimension: usize,
    pub num_stages: usize,
    pub num_centroids: usize,
    pub iterations_per_stage: usize,

    #[serde(default)]
    pub iteration_policy: IterationPolicy,
    #[serde(default)]
    pub seeding: SeedingType,
    // Only used by the randomized seeding strategies.
    #[serde(default)]
    pub seed: u64,
}

impl ResidualQuantizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.dimension < 1 {
            return Err(QuantizationError::InvalidClusterConfig(
                "dimension must be at least 1".to_string(),
            ));
        }
        if self.num_stages < 1 {
            return Err(QuantizationError::InvalidClusterConfig(
                "number of stages must be at least 1".to_string(),
            ));
        }
        if self.num_centroids < 1 {
            return Err(QuantizationError::InvalidClusterConfig(
                "number of centroids must be at least 1".to_string(),
            ));
        }
        if self.iterations_per_stage < 1 {
            return Err(QuantizationError::InvalidClusterConfig(
                "iterations per stage must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_yaml_file(path: &Path) -> anyhow::Result<Self> {
        let buffer = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ResidualQuantizerConfig = serde_yaml::from_str(&buffer)?;
        config.validate()?;
        Ok(config)
    }
}

/// Codes plus the factor restoring the norm of the encoded vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledCodes {
    pub codes: Vec<usize>,
    pub scale: f32,
}

/// Encodes vectors against a fixed stack of codebooks, one code per stage.
#[derive(Debug, Clone)]
pub struct ResidualQuantizer {
    dimension: usize,
    codebooks: Vec<Codebook>,
}

impl ResidualQuantizer {
    pub fn new(dimension: usize, codebooks: Vec<Codebook>) -> Result<Self> {
        if codebooks.is_empty() {
            return Err(QuantizationError::InvalidClusterConfig(
                "at least one codebook is required".to_string(),
            ));
        }
        for codebook in codebooks.iter() {
            check_dimension(dimension, codebook.dimension())?;
            if codebook.num_centroids() == 0 {
                return Err(QuantizationError::InvalidClusterConfig(
                    "codebook has no centroids".to_string(),
                ));
            }
        }
        Ok(Self {
            dimension,
            codebooks,
        })
    }

    pub fn from_state(state: &RvqState) -> Self {
        Self {
            dimension: state.dimension(),
            codebooks: state.codebooks().cloned().collect(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn num_stages(&self) -> usize {
        self.codebooks.len()
    }

    pub fn codebooks(&self) -> &[Codebook] {
        &self.codebooks
    }

    /// Greedy encoding: each stage picks the centroid nearest to what previous stages left over.
    ///
    /// For a training point this returns the codes recorded during training only when every
    /// stage converged. See `RvqState::recorded_codes`.
    pub fn encode(&self, value: &[f32]) -> Result<Vec<usize>> {
        check_dimension(self.dimension, value.len())?;
        let mut residual = value.to_vec();
        let mut codes = Vec::with_capacity(self.codebooks.len());
        for codebook in self.codebooks.iter() {
            let code = nearest_centroid(&residual, codebook)?;
            residual
                .iter_mut()
                .zip(codebook.centroid(code).iter())
                .for_each(|(r, c)| *r -= c);
            codes.push(code);
        }
        Ok(codes)
    }

    /// Sum of the selected centroid of every stage.
    pub fn decode(&self, codes: &[usize]) -> Result<Vec<f32>> {
        if codes.len() != self.codebooks.len() {
            return Err(QuantizationError::CodeLengthMismatch {
                expected: self.codebooks.len(),
                actual: codes.len(),
            });
        }
        let mut result = vec![0.0f32; self.dimension];
        for (stage, (codebook, &code)) in self.codebooks.iter().zip(codes.iter()).enumerate() {
            if code >= codebook.num_centroids() {
                return Err(QuantizationError::InvalidCode {
                    stage,
                    code,
                    num_centroids: codebook.num_centroids(),
                });
            }
            result
                .iter_mut()
                .zip(codebook.centroid(code).iter())
                .for_each(|(r, c)| *r += c);
        }
        Ok(result)
    }

    /// Encodes the direction of `value` and keeps its norm as a relative scale, so that
    /// `decode_scaled` returns a vector with the norm of `value`.
    pub fn encode_scaled(&self, value: &[f32]) -> Result<ScaledCodes> {
        check_dimension(self.dimension, value.len())?;
        let norm = l2_norm(value);
        let codes = self.encode(&normalize(value))?;
        let quantized_norm = l2_norm(&self.decode(&codes)?);
        let scale = if quantized_norm > 0.0 {
            norm / quantized_norm
        } else {
            0.0
        };
        Ok(ScaledCodes { codes, scale })
    }

    pub fn decode_scaled(&self, scaled: &ScaledCodes) -> Result<Vec<f32>> {
        let mut result = self.decode(&scaled.codes)?;
        result.iter_mut().for_each(|x| *x *= scaled.scale);
        Ok(result)
    }
}

impl Quantizer for ResidualQuantizer {
    type QuantizedT = usize;

    fn quantize(&self, value: &[f32]) -> Result<Vec<usize>> {
        self.encode(value)
    }

    fn quantized_dimension(&self) -> usize {
        self.num_stages()
    }

    fn original_vector(&self, quantized_vector: &[usize]) -> Result<Vec<f32>> {
        self.decode(quantized_vector)
    }
}

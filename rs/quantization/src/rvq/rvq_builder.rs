use log::info;
use utils::distance::l2::norm_squared;
use utils::error::{check_dimension, QuantizationError, Result};
use utils::kmeans::codebook::Codebook;
use utils::kmeans::kmeans::{split_rows, KMeans};
use utils::kmeans::seeding::CentroidSelector;

use crate::rvq::rvq::{ResidualQuantizer, ResidualQuantizerConfig};

/// Codebook and training assignments of a single stage.
#[derive(Debug, Clone, PartialEq)]
pub struct RvqStage {
    codebook: Codebook,
    assignments: Vec<usize>,
}

impl RvqStage {
    pub fn codebook(&self) -> &Codebook {
        &self.codebook
    }

    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }
}

/// Ordered stages of a trained residual quantizer. Only `quantize_residual` creates one.
#[derive(Debug, Clone, PartialEq)]
pub struct RvqState {
    dimension: usize,
    stages: Vec<RvqStage>,
}

impl RvqState {
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn num_points(&self) -> usize {
        self.stages[0].assignments.len()
    }

    pub fn stages(&self) -> &[RvqStage] {
        &self.stages
    }

    pub fn stage(&self, index: usize) -> Option<&RvqStage> {
        self.stages.get(index)
    }

    pub fn codebooks(&self) -> impl Iterator<Item = &Codebook> {
        self.stages.iter().map(|stage| &stage.codebook)
    }

    /// Codes assigned to training point `point_index`, one per stage.
    ///
    /// Each stage records the assignment made before its last centroid update. Under
    /// `IterationPolicy::Fixed` the update may still move centroids, so re-encoding the point
    /// with `ResidualQuantizer::encode` can pick different codes. Stages trained with
    /// `IterationPolicy::UntilStable` to convergence re-encode to the recorded codes.
    pub fn recorded_codes(&self, point_index: usize) -> Option<Vec<usize>> {
        self.stages
            .iter()
            .map(|stage| stage.assignments.get(point_index).copied())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ResidualQuantizationOutput {
    pub state: RvqState,

    // Flattened n x dimension
    pub residuals: Vec<f32>,
    pub reconstructions: Vec<f32>,

    /// Sum of squared residual elements after each stage.
    pub stage_residual_energy: Vec<f32>,
}

impl ResidualQuantizationOutput {
    pub fn residual(&self, point_index: usize) -> &[f32] {
        let dimension = self.state.dimension;
        &self.residuals[point_index * dimension..(point_index + 1) * dimension]
    }

    pub fn reconstruction(&self, point_index: usize) -> &[f32] {
        let dimension = self.state.dimension;
        &self.reconstructions[point_index * dimension..(point_index + 1) * dimension]
    }
}

/// Fits `config.num_stages` codebooks, each on the residual left by the previous ones.
///
/// Either every stage succeeds or no state is returned.
pub fn quantize_residual<S: CentroidSelector + ?Sized>(
    data_points: &[&[f32]],
    config: &ResidualQuantizerConfig,
    selector: &mut S,
) -> Result<ResidualQuantizationOutput> {
    config.validate()?;
    if data_points.len() < config.num_centroids {
        return Err(QuantizationError::InsufficientPoints {
            required: config.num_centroids,
            available: data_points.len(),
        });
    }
    for data_point in data_points {
        check_dimension(config.dimension, data_point.len())?;
    }

    let dimension = config.dimension;
    let kmeans = KMeans::new(
        config.num_centroids,
        config.iterations_per_stage,
        dimension,
    )
    .with_iteration_policy(config.iteration_policy);

    let mut residuals = data_points
        .iter()
        .flat_map(|point| point.iter().copied())
        .collect::<Vec<f32>>();
    let mut reconstructions = vec![0.0f32; residuals.len()];
    let mut stages = Vec::with_capacity(config.num_stages);
    let mut stage_residual_energy = Vec::with_capacity(config.num_stages);

    for stage_id in 0..config.num_stages {
        let result = {
            let rows = split_rows(&residuals, dimension)?;
            let initial_centroids = selector.select(&rows, config.num_centroids)?;
            kmeans.fit(&rows, initial_centroids)?
        };

        residuals
            .chunks_exact_mut(dimension)
            .zip(reconstructions.chunks_exact_mut(dimension))
            .zip(result.assignments.iter())
            .for_each(|((residual, reconstruction), &label)| {
                let centroid = result.codebook.centroid(label);
                for j in 0..dimension {
                    residual[j] -= centroid[j];
                    reconstruction[j] += centroid[j];
                }
            });

        let energy = norm_squared(&residuals);
        info!(
            "Stage {} - Residual energy: {:.4} after {} iterations",
            stage_id, energy, result.iterations_run
        );
        stage_residual_energy.push(energy);
        stages.push(RvqStage {
            codebook: result.codebook,
            assignments: result.assignments,
        });
    }

    Ok(ResidualQuantizationOutput {
        state: RvqState { dimension, stages },
        residuals,
        reconstructions,
        stage_residual_energy,
    })
}

pub struct ResidualQuantizerBuilder {
    config: ResidualQuantizerConfig,
    pub dataset: Vec<Vec<f32>>,
}

impl ResidualQuantizerBuilder {
    pub fn new(config: ResidualQuantizerConfig) -> Self {
        Self {
            config,
            dataset: Vec::new(),
        }
    }

    /// Add a new vector to the dataset for training
    pub fn add(&mut self, data: Vec<f32>) {
        self.dataset.push(data);
    }

    /// Train all stages on the dataset, using the configured seeding strategy.
    pub fn train(&self) -> Result<ResidualQuantizationOutput> {
        let rows = self
            .dataset
            .iter()
            .map(|x| x.as_slice())
            .collect::<Vec<&[f32]>>();
        let mut selector = self.config.seeding.selector(self.config.seed);
        quantize_residual(&rows, &self.config, &mut selector)
    }

    /// Train once and return the codec for the fitted codebooks along with the training output.
    pub fn build(&self) -> Result<(ResidualQuantizer, ResidualQuantizationOutput)> {
        let output = self.train()?;
        Ok((ResidualQuantizer::from_state(&output.state), output))
    }
}

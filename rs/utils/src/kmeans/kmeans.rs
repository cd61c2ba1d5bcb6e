use log::{debug, warn};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::distance::l2::{CalculateSquared, L2DistanceCalculator};
use crate::error::{check_dimension, QuantizationError, Result};
use crate::kmeans::codebook::Codebook;

/// How many Lloyd iterations `KMeans::fit` runs.
#[derive(PartialEq, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum IterationPolicy {
    /// Run exactly `num_iterations` assign/update passes.
    #[default]
    Fixed,
    /// Stop early once an assignment step reproduces the previous assignment.
    /// `num_iterations` is the upper bound.
    UntilStable,
}

#[derive(Debug, Clone)]
pub struct KMeans {
    pub num_clusters: usize,
    pub num_iterations: usize,

    // data shape
    pub dimension: usize,

    pub iteration_policy: IterationPolicy,
}

#[derive(Debug, Clone)]
pub struct KMeansResult {
    pub assignments: Vec<usize>,
    pub codebook: Codebook,
    pub iterations_run: usize,
}

impl KMeans {
    pub fn new(num_clusters: usize, num_iterations: usize, dimension: usize) -> Self {
        Self {
            num_clusters,
            num_iterations,
            dimension,
            iteration_policy: IterationPolicy::Fixed,
        }
    }

    pub fn with_iteration_policy(mut self, iteration_policy: IterationPolicy) -> Self {
        self.iteration_policy = iteration_policy;
        self
    }

    fn validate(&self, data_points: &[&[f32]], initial_centroids: &Codebook) -> Result<()> {
        if self.num_clusters < 1 {
            return Err(QuantizationError::InvalidClusterConfig(
                "number of clusters must be at least 1".to_string(),
            ));
        }
        if self.num_iterations < 1 {
            return Err(QuantizationError::InvalidClusterConfig(
                "number of iterations must be at least 1".to_string(),
            ));
        }
        if initial_centroids.num_centroids() != self.num_clusters {
            return Err(QuantizationError::InvalidClusterConfig(format!(
                "expected {} initial centroids, got {}",
                self.num_clusters,
                initial_centroids.num_centroids()
            )));
        }
        if data_points.len() < self.num_clusters {
            return Err(QuantizationError::InsufficientPoints {
                required: self.num_clusters,
                available: data_points.len(),
            });
        }
        check_dimension(self.dimension, initial_centroids.dimension())?;
        for data_point in data_points {
            check_dimension(self.dimension, data_point.len())?;
        }
        Ok(())
    }

    /// Runs Lloyd's algorithm starting from `initial_centroids`.
    ///
    /// Ties go to the lowest centroid index. A centroid that receives no points keeps its
    /// previous value.
    pub fn fit(&self, data_points: &[&[f32]], initial_centroids: Codebook) -> Result<KMeansResult> {
        self.validate(data_points, &initial_centroids)?;

        let distance_calculator = L2DistanceCalculator::new();
        let mut codebook = initial_centroids;
        let mut assignments: Vec<usize> = Vec::new();
        let mut iterations_run = 0;

        for iteration in 0..self.num_iterations {
            let labeled = data_points
                .par_iter()
                .map(|point| nearest_centroid_unchecked(&distance_calculator, point, &codebook))
                .collect::<Vec<(usize, f32)>>();
            let distortion = labeled.iter().map(|(_, distance)| distance).sum::<f32>();
            let new_assignments = labeled
                .into_iter()
                .map(|(label, _)| label)
                .collect::<Vec<usize>>();

            let stable = new_assignments == assignments;
            assignments = new_assignments;
            self.update_centroids(data_points, &assignments, &mut codebook, iteration);
            iterations_run += 1;

            debug!("Iteration {} - Error: {:.4}", iteration, distortion);

            if stable && self.iteration_policy == IterationPolicy::UntilStable {
                debug!("Assignments stable after {} iterations", iterations_run);
                break;
            }
        }

        Ok(KMeansResult {
            assignments,
            codebook,
            iterations_run,
        })
    }

    /// Same as `fit`, for a flattened `n x dimension` dataset.
    pub fn fit_flattened(
        &self,
        flattened_data: &[f32],
        initial_centroids: Codebook,
    ) -> Result<KMeansResult> {
        let data_points = split_rows(flattened_data, self.dimension)?;
        self.fit(&data_points, initial_centroids)
    }

    fn update_centroids(
        &self,
        data_points: &[&[f32]],
        assignments: &[usize],
        codebook: &mut Codebook,
        iteration: usize,
    ) {
        let mut sums = vec![0.0f32; self.num_clusters * self.dimension];
        let mut cluster_sizes = vec![0usize; self.num_clusters];
        for (data_point, &label) in data_points.iter().zip(assignments.iter()) {
            cluster_sizes[label] += 1;
            let sum = &mut sums[label * self.dimension..(label + 1) * self.dimension];
            sum.iter_mut()
                .zip(data_point.iter())
                .for_each(|(s, v)| *s += v);
        }

        for (centroid_id, &size) in cluster_sizes.iter().enumerate() {
            if size == 0 {
                warn!("Empty cluster {} at iteration {}", centroid_id, iteration);
                continue;
            }
            let sum = &sums[centroid_id * self.dimension..(centroid_id + 1) * self.dimension];
            codebook
                .centroid_mut(centroid_id)
                .iter_mut()
                .zip(sum.iter())
                .for_each(|(c, s)| *c = s / size as f32);
        }
    }
}

/// Splits a flattened dataset into rows of `dimension` elements.
pub fn split_rows(flattened_data: &[f32], dimension: usize) -> Result<Vec<&[f32]>> {
    if dimension == 0 {
        return Err(QuantizationError::InvalidClusterConfig(
            "dimension must be at least 1".to_string(),
        ));
    }
    if flattened_data.len() % dimension != 0 {
        return Err(QuantizationError::InvalidClusterConfig(format!(
            "{} values do not split into rows of dimension {}",
            flattened_data.len(),
            dimension
        )));
    }
    Ok(flattened_data.chunks_exact(dimension).collect())
}

/// Index and squared distance of the closest centroid. The scan keeps the first minimum, so
/// the lowest index wins ties.
pub fn nearest_centroid_unchecked<C: CalculateSquared>(
    distance_calculator: &C,
    point: &[f32],
    codebook: &Codebook,
) -> (usize, f32) {
    let mut label = 0;
    let mut min_distance = distance_calculator.calculate_squared(point, codebook.centroid(0));
    for centroid_id in 1..codebook.num_centroids() {
        let distance = distance_calculator.calculate_squared(point, codebook.centroid(centroid_id));
        if distance < min_distance {
            min_distance = distance;
            label = centroid_id;
        }
    }
    (label, min_distance)
}

/// Nearest-centroid rule shared by training and encoding.
pub fn nearest_centroid(point: &[f32], codebook: &Codebook) -> Result<usize> {
    check_dimension(codebook.dimension(), point.len())?;
    if codebook.num_centroids() == 0 {
        return Err(QuantizationError::InvalidClusterConfig(
            "codebook has no centroids".to_string(),
        ));
    }
    Ok(nearest_centroid_unchecked(&L2DistanceCalculator::new(), point, codebook).0)
}

/// Assigns every point to its nearest centroid.
pub fn assign(data_points: &[&[f32]], codebook: &Codebook) -> Result<Vec<usize>> {
    if codebook.num_centroids() == 0 {
        return Err(QuantizationError::InvalidClusterConfig(
            "codebook has no centroids".to_string(),
        ));
    }
    for data_point in data_points {
        check_dimension(codebook.dimension(), data_point.len())?;
    }
    let distance_calculator = L2DistanceCalculator::new();
    Ok(data_points
        .par_iter()
        .map(|point| nearest_centroid_unchecked(&distance_calculator, point, codebook).0)
        .collect())
}

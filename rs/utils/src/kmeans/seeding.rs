use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

use crate::distance::l2::{CalculateSquared, L2DistanceCalculator};
use crate::error::{QuantizationError, Result};
use crate::kmeans::codebook::Codebook;

/// Picks the initial centroids for a clustering run.
pub trait CentroidSelector {
    fn select(&mut self, data_points: &[&[f32]], num_centroids: usize) -> Result<Codebook>;
}

impl<S: CentroidSelector + ?Sized> CentroidSelector for Box<S> {
    fn select(&mut self, data_points: &[&[f32]], num_centroids: usize) -> Result<Codebook> {
        (**self).select(data_points, num_centroids)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, EnumIter)]
pub enum SeedingType {
    #[default]
    FirstPoints,
    RandomSample,
    KMeansPlusPlus,
    FarthestPoint,
}

impl SeedingType {
    /// `seed` is ignored by the deterministic strategies.
    pub fn selector(&self, seed: u64) -> Box<dyn CentroidSelector + Send> {
        match self {
            SeedingType::FirstPoints => Box::new(FirstPoints),
            SeedingType::RandomSample => Box::new(RandomSample::new(seed)),
            SeedingType::KMeansPlusPlus => Box::new(KMeansPlusPlus::new(seed)),
            SeedingType::FarthestPoint => Box::new(FarthestPoint),
        }
    }
}

fn check_selection(data_points: &[&[f32]], num_centroids: usize) -> Result<usize> {
    if num_centroids < 1 {
        return Err(QuantizationError::InvalidClusterConfig(
            "number of centroids must be at least 1".to_string(),
        ));
    }
    if data_points.len() < num_centroids {
        return Err(QuantizationError::InsufficientPoints {
            required: num_centroids,
            available: data_points.len(),
        });
    }
    Ok(data_points[0].len())
}

/// Uses the first `k` points as centroids.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstPoints;

impl CentroidSelector for FirstPoints {
    fn select(&mut self, data_points: &[&[f32]], num_centroids: usize) -> Result<Codebook> {
        let dimension = check_selection(data_points, num_centroids)?;
        Codebook::from_rows(dimension, &data_points[..num_centroids])
    }
}

/// Picks `k` distinct points uniformly at random.
pub struct RandomSample {
    rng: StdRng,
}

impl RandomSample {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl CentroidSelector for RandomSample {
    fn select(&mut self, data_points: &[&[f32]], num_centroids: usize) -> Result<Codebook> {
        let dimension = check_selection(data_points, num_centroids)?;
        let rows = rand::seq::index::sample(&mut self.rng, data_points.len(), num_centroids)
            .into_iter()
            .map(|idx| data_points[idx])
            .collect::<Vec<&[f32]>>();
        Codebook::from_rows(dimension, &rows)
    }
}

/// k-means++: each next centroid is drawn with probability proportional to its squared
/// distance from the closest centroid chosen so far.
pub struct KMeansPlusPlus {
    rng: StdRng,
}

impl KMeansPlusPlus {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl CentroidSelector for KMeansPlusPlus {
    fn select(&mut self, data_points: &[&[f32]], num_centroids: usize) -> Result<Codebook> {
        let dimension = check_selection(data_points, num_centroids)?;
        let distance_calculator = L2DistanceCalculator::new();
        let num_points = data_points.len();

        let mut chosen = Vec::with_capacity(num_centroids);
        chosen.push(self.rng.gen_range(0..num_points));
        let mut distances = vec![f32::INFINITY; num_points];

        while chosen.len() < num_centroids {
            let last = data_points[chosen[chosen.len() - 1]];
            for (distance, point) in distances.iter_mut().zip(data_points.iter()) {
                *distance = distance.min(distance_calculator.calculate_squared(point, last));
            }

            let total = distances.iter().sum::<f32>();
            if total <= 0.0 {
                // Every remaining point coincides with a chosen centroid.
                chosen.push(self.rng.gen_range(0..num_points));
                continue;
            }

            let threshold = self.rng.gen::<f32>() * total;
            chosen.push(sample_by_distance(&distances, threshold));
        }

        let rows = chosen
            .into_iter()
            .map(|idx| data_points[idx])
            .collect::<Vec<&[f32]>>();
        Codebook::from_rows(dimension, &rows)
    }
}

/// First index whose running distance sum reaches `threshold`. Rounding can leave the sum
/// short of `threshold`; the last point with a positive distance is taken then, so an
/// already chosen point is never picked while `distances` has a positive entry.
fn sample_by_distance(distances: &[f32], threshold: f32) -> usize {
    let mut cumulative = 0.0f32;
    let mut last_positive = 0;
    for (idx, &distance) in distances.iter().enumerate() {
        if distance <= 0.0 {
            continue;
        }
        cumulative += distance;
        last_positive = idx;
        if cumulative >= threshold {
            return idx;
        }
    }
    last_positive
}

/// Deterministic max-min seeding: starts at the first point, then repeatedly takes the point
/// farthest from all chosen centroids. Ties go to the lowest index.
#[derive(Debug, Clone, Copy, Default)]
pub struct FarthestPoint;

impl CentroidSelector for FarthestPoint {
    fn select(&mut self, data_points: &[&[f32]], num_centroids: usize) -> Result<Codebook> {
        let dimension = check_selection(data_points, num_centroids)?;
        let distance_calculator = L2DistanceCalculator::new();

        let mut chosen = vec![0usize];
        let mut distances = vec![f32::INFINITY; data_points.len()];
        while chosen.len() < num_centroids {
            let last = data_points[chosen[chosen.len() - 1]];
            let mut farthest = 0;
            let mut max_distance = f32::NEG_INFINITY;
            for (idx, (distance, point)) in
                distances.iter_mut().zip(data_points.iter()).enumerate()
            {
                *distance = distance.min(distance_calculator.calculate_squared(point, last));
                if *distance > max_distance {
                    max_distance = *distance;
                    farthest = idx;
                }
            }
            chosen.push(farthest);
        }

        let rows = chosen
            .into_iter()
            .map(|idx| data_points[idx])
            .collect::<Vec<&[f32]>>();
        Codebook::from_rows(dimension, &rows)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::kmeans::kmeans::split_rows;
    use crate::test_utils::generate_seeded_dataset;

    #[test]
    fn test_first_points() {
        let flattened = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let rows = split_rows(&flattened, 2).unwrap();
        let codebook = FirstPoints.select(&rows, 2).unwrap();
        assert_eq!(codebook.as_flattened(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_farthest_point() {
        let flattened = vec![0.0, 1.0, 10.0, 4.0];
        let rows = split_rows(&flattened, 1).unwrap();
        let codebook = FarthestPoint.select(&rows, 3).unwrap();
        // 0.0 first, then 10.0 (farthest), then 4.0 (min distance 4 vs 1 for point 1.0).
        assert_eq!(codebook.as_flattened(), &[0.0, 10.0, 4.0]);
    }

    #[test]
    fn test_random_sample_is_seeded_and_distinct() {
        let flattened = (0..50).map(|x| x as f32).collect::<Vec<f32>>();
        let rows = split_rows(&flattened, 1).unwrap();

        let a = RandomSample::new(42).select(&rows, 10).unwrap();
        let b = RandomSample::new(42).select(&rows, 10).unwrap();
        assert_eq!(a, b);

        let mut values = a.as_flattened().to_vec();
        values.sort_by(|x, y| x.partial_cmp(y).unwrap());
        values.dedup();
        assert_eq!(values.len(), 10);
    }

    #[test]
    fn test_kmeans_plus_plus_picks_existing_points() {
        let flattened = generate_seeded_dataset(100, 4, 7);
        let rows = split_rows(&flattened, 4).unwrap();
        let codebook = KMeansPlusPlus::new(3).select(&rows, 8).unwrap();
        assert_eq!(codebook.num_centroids(), 8);
        for centroid in codebook.iter() {
            assert!(rows.iter().any(|row| *row == centroid));
        }
        assert_eq!(codebook, KMeansPlusPlus::new(3).select(&rows, 8).unwrap());
    }

    #[test]
    fn test_kmeans_plus_plus_separates_clusters() {
        let flattened = vec![0.0, 0.0, 0.0, 1000.0, 1000.0, 1000.0];
        let rows = split_rows(&flattened, 1).unwrap();
        let codebook = KMeansPlusPlus::new(11).select(&rows, 2).unwrap();
        let mut values = codebook.as_flattened().to_vec();
        values.sort_by(|x, y| x.partial_cmp(y).unwrap());
        assert_eq!(values, vec![0.0, 1000.0]);
    }

    #[test]
    fn test_sample_by_distance_skips_chosen_points() {
        let distances = [0.0, 1.0, 2.0, 0.0];
        assert_eq!(sample_by_distance(&distances, 0.5), 1);
        assert_eq!(sample_by_distance(&distances, 1.0), 1);
        assert_eq!(sample_by_distance(&distances, 2.5), 2);
        // A threshold past the accumulated sum falls back to the last positive entry, not
        // to the trailing zero-distance point.
        assert_eq!(sample_by_distance(&distances, 3.5), 2);
    }

    #[test]
    fn test_kmeans_plus_plus_never_repeats_a_point() {
        let flattened = (0..64).map(|x| (x % 16) as f32 * 0.1).collect::<Vec<f32>>();
        let rows = split_rows(&flattened, 1).unwrap();
        for seed in 0..20 {
            let codebook = KMeansPlusPlus::new(seed).select(&rows, 16).unwrap();
            let mut values = codebook.as_flattened().to_vec();
            values.sort_by(|x, y| x.partial_cmp(y).unwrap());
            values.dedup();
            assert_eq!(values.len(), 16);
        }
    }

    #[test]
    fn test_all_selectors_check_point_count() {
        let flattened = vec![0.0, 1.0];
        let rows = split_rows(&flattened, 1).unwrap();
        for seeding in SeedingType::iter() {
            let mut selector = seeding.selector(0);
            assert_eq!(
                selector.select(&rows, 3).unwrap_err(),
                QuantizationError::InsufficientPoints {
                    required: 3,
                    available: 2
                }
            );
            assert!(matches!(
                selector.select(&rows, 0),
                Err(QuantizationError::InvalidClusterConfig(_))
            ));
            assert_eq!(selector.select(&rows, 2).unwrap().num_centroids(), 2);
        }
    }
}

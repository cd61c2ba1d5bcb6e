use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::distance::l2::normalize_in_place;

// Generate a random vector with a given dimension
pub fn generate_random_vector(dimension: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    let mut vector = vec![];
    for _ in 0..dimension {
        vector.push(rng.gen::<f32>());
    }
    vector
}

/// Flattened `num_points x dimension` dataset drawn uniformly from [0, 1) with a fixed seed.
pub fn generate_seeded_dataset(num_points: usize, dimension: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_points * dimension)
        .map(|_| rng.gen::<f32>())
        .collect()
}

/// Same as `generate_seeded_dataset`, with every row scaled to unit length.
pub fn generate_seeded_unit_vectors(num_points: usize, dimension: usize, seed: u64) -> Vec<f32> {
    let mut data = generate_seeded_dataset(num_points, dimension, seed);
    data.chunks_exact_mut(dimension).for_each(|row| {
        normalize_in_place(row);
    });
    data
}

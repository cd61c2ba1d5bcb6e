use anyhow::Result;
use clap::Parser;
use log::info;
use utils::distance::l2::norm_squared;
use utils::kmeans::kmeans::{split_rows, IterationPolicy, KMeans};
use utils::kmeans::seeding::{CentroidSelector, SeedingType};
use utils::test_utils::generate_seeded_dataset;

#[derive(Parser, Debug)]
#[command(version, about = "Runs Lloyd's k-means on a seeded uniform dataset", long_about = None)]
struct Args {
    #[arg(long, default_value_t = 128)]
    dimension: usize,

    #[arg(long, default_value_t = 100000)]
    num_datapoints: usize,

    #[arg(long, default_value_t = 256)]
    num_clusters: usize,

    #[arg(long, default_value_t = 5)]
    num_iterations: usize,

    /// Stop as soon as assignments no longer change.
    #[arg(long, default_value_t = false)]
    until_stable: bool,

    #[arg(long, default_value_t = 1016)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let flattened_dataset = generate_seeded_dataset(args.num_datapoints, args.dimension, args.seed);
    let rows = split_rows(&flattened_dataset, args.dimension)?;
    let initial = SeedingType::FirstPoints
        .selector(args.seed)
        .select(&rows, args.num_clusters)?;

    let policy = if args.until_stable {
        IterationPolicy::UntilStable
    } else {
        IterationPolicy::Fixed
    };
    let kmeans = KMeans::new(args.num_clusters, args.num_iterations, args.dimension)
        .with_iteration_policy(policy);
    let result = kmeans.fit(&rows, initial)?;

    let mut cluster_sizes = vec![0usize; args.num_clusters];
    result
        .assignments
        .iter()
        .for_each(|&label| cluster_sizes[label] += 1);
    let empty = cluster_sizes.iter().filter(|&&size| size == 0).count();
    let codebook_energy = result.codebook.iter().map(norm_squared).sum::<f32>();

    info!(
        "Ran {} iterations: {} clusters, {} empty, codebook energy {:.4}",
        result.iterations_run, args.num_clusters, empty, codebook_energy
    );
    Ok(())
}

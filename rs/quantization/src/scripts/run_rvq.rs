use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use quantization::rvq::rvq::{ResidualQuantizer, ResidualQuantizerConfig};
use quantization::rvq::rvq_builder::quantize_residual;
use utils::distance::l2::{norm_squared, squared_distance};
use utils::kmeans::kmeans::{split_rows, IterationPolicy};
use utils::kmeans::seeding::SeedingType;
use utils::test_utils::{generate_seeded_dataset, generate_seeded_unit_vectors};

#[derive(Parser, Debug)]
#[command(version, about = "Trains a residual quantizer on a seeded dataset", long_about = None)]
struct Args {
    /// YAML file with a ResidualQuantizerConfig. Overrides the shape flags below.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 8)]
    dimension: usize,

    #[arg(long, default_value_t = 4)]
    num_stages: usize,

    #[arg(long, default_value_t = 16)]
    num_centroids: usize,

    #[arg(long, default_value_t = 1)]
    iterations_per_stage: usize,

    #[arg(long, default_value_t = 32)]
    num_datapoints: usize,

    #[arg(long, default_value_t = 808)]
    seed: u64,

    /// Train on unit-length points instead of uniform ones.
    #[arg(long, default_value_t = false)]
    unit_vectors: bool,
}

fn training_data(args: &Args, dimension: usize) -> Vec<f32> {
    if args.unit_vectors {
        generate_seeded_unit_vectors(args.num_datapoints, dimension, args.seed)
    } else {
        generate_seeded_dataset(args.num_datapoints, dimension, args.seed)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ResidualQuantizerConfig::from_yaml_file(path)?,
        None => {
            let config = ResidualQuantizerConfig {
                dimension: args.dimension,
                num_stages: args.num_stages,
                num_centroids: args.num_centroids,
                iterations_per_stage: args.iterations_per_stage,
                iteration_policy: IterationPolicy::Fixed,
                seeding: SeedingType::FirstPoints,
                seed: args.seed,
            };
            config.validate()?;
            config
        }
    };
    info!("Config: {:?}", config);

    let flattened = training_data(&args, config.dimension);
    let rows = split_rows(&flattened, config.dimension)?;
    let mut selector = config.seeding.selector(config.seed);
    let output = quantize_residual(&rows, &config, &mut selector)?;

    let input_energy = norm_squared(&flattened);
    for (stage, energy) in output.stage_residual_energy.iter().enumerate() {
        info!(
            "Stage {}: residual energy {:.6} ({:.2}% of input)",
            stage,
            energy,
            100.0 * energy / input_energy
        );
    }

    // Re-encoding the training set with the fitted codebooks.
    let quantizer = ResidualQuantizer::from_state(&output.state);
    let mut reencoded_error = 0.0f32;
    for row in rows.iter() {
        let decoded = quantizer.decode(&quantizer.encode(row)?)?;
        reencoded_error += squared_distance(row, &decoded)?;
    }
    info!(
        "Training error {:.6}, re-encoded error {:.6}",
        output.stage_residual_energy[output.stage_residual_energy.len() - 1],
        reencoded_error
    );
    Ok(())
}

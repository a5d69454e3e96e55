//! AGRNet CLI
//!
//! Entry point for inspecting the grasp network, benchmarking its forward pass
//! and checking dataset directories.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::module::Module;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use agrnet::backend::{backend_name, default_device, DefaultBackend};
use agrnet::dataset::{get_dataset, split_indices, DatasetOptions};
use agrnet::inference::{run_benchmark, BenchmarkConfig, TARGET_LATENCY_MS};
use agrnet::model::GraspNetConfig;
use agrnet::utils::format_number;
use agrnet::utils::logging::{init_logging, LogConfig};

/// Attention-gated residual network for grasp detection
#[derive(Parser, Debug)]
#[command(name = "agrnet")]
#[command(version)]
#[command(about = "Dense grasp detection with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print per-stage tensor shapes and parameter count
    Summary {
        /// Input side (square)
        #[arg(long, default_value = "224")]
        input_size: usize,

        /// Number of input channels
        #[arg(long, default_value = "4")]
        input_channels: usize,

        /// Base channel width
        #[arg(long, default_value = "32")]
        channel_size: usize,
    },

    /// Benchmark forward-pass latency on random input
    Benchmark {
        /// Number of timed iterations
        #[arg(short, long, default_value = "100")]
        iterations: usize,

        /// Number of warmup iterations
        #[arg(long, default_value = "10")]
        warmup: usize,

        /// Batch size
        #[arg(short, long, default_value = "1")]
        batch_size: usize,

        /// Image size (square)
        #[arg(long, default_value = "224")]
        image_size: usize,

        /// Base channel width
        #[arg(long, default_value = "32")]
        channel_size: usize,

        /// Output JSON file for benchmark results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Index a dataset directory and show split sizes
    Dataset {
        /// Dataset name (cornell, cbrgd)
        #[arg(short, long)]
        name: String,

        /// Dataset root directory
        #[arg(short, long)]
        path: PathBuf,

        /// Fraction of samples used for training
        #[arg(long, default_value = "0.9")]
        split: f64,

        /// Shuffle before splitting
        #[arg(long, default_value = "false")]
        shuffle: bool,

        /// Random seed for the shuffle
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Fraction of the file list rotated to the end
        #[arg(long, default_value = "0.0")]
        ds_rotate: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };

    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Summary {
            input_size,
            input_channels,
            channel_size,
        } => cmd_summary(input_size, input_channels, channel_size),

        Commands::Benchmark {
            iterations,
            warmup,
            batch_size,
            image_size,
            channel_size,
            output,
        } => {
            let config = BenchmarkConfig {
                warmup_iterations: warmup,
                iterations,
                batch_size,
                image_size,
            };
            cmd_benchmark(config, channel_size, output)
        }

        Commands::Dataset {
            name,
            path,
            split,
            shuffle,
            seed,
            ds_rotate,
        } => cmd_dataset(&name, path, split, shuffle, seed, ds_rotate),
    }
}

fn print_banner() {
    println!(
        "{}",
        r#"
 +-----------------------------------------------------+
 |   AGRNet: attention-gated residual grasp network    |
 |   Dense grasp detection with Burn + Rust            |
 +-----------------------------------------------------+
  "#
        .green()
    );
}

fn cmd_summary(input_size: usize, input_channels: usize, channel_size: usize) -> Result<()> {
    let config = GraspNetConfig::new()
        .with_input_channels(input_channels)
        .with_channel_size(channel_size);
    config.check_input_size(input_size, input_size)?;

    let shapes = config
        .stage_shapes(input_size, input_size)
        .context("input too small for the network")?;

    let device = default_device();
    let model = config.init::<DefaultBackend>(&device);

    println!("{}", "Stage shapes (batch omitted):".cyan());
    for shape in &shapes {
        println!("  {}", shape);
    }
    println!();
    println!(
        "{} {}",
        "Parameters:".cyan(),
        format_number(model.num_params())
    );
    println!("{} {}", "Backend:".cyan(), backend_name());

    Ok(())
}

fn cmd_benchmark(
    config: BenchmarkConfig,
    channel_size: usize,
    output: Option<PathBuf>,
) -> Result<()> {
    let device = default_device();
    let model_config = GraspNetConfig::new().with_channel_size(channel_size);
    let model = model_config.init::<DefaultBackend>(&device);

    info!(
        "Benchmarking on {} with batch size {}",
        backend_name(),
        config.batch_size
    );

    let result = run_benchmark(&model, &model_config, config, backend_name(), &device)?;

    println!("{}", "Benchmark results".cyan());
    println!("{}", result);
    println!();

    if result.meets_latency_target(TARGET_LATENCY_MS) {
        println!("{} p95 within {:.0}ms", "OK".green(), TARGET_LATENCY_MS);
    } else {
        println!(
            "{} p95 above {:.0}ms target",
            "SLOW".yellow(),
            TARGET_LATENCY_MS
        );
    }

    if let Some(path) = output {
        result.save(&path)?;
        info!("Results saved to: {:?}", path);
    }

    Ok(())
}

fn cmd_dataset(
    name: &str,
    path: PathBuf,
    split: f64,
    shuffle: bool,
    seed: u64,
    ds_rotate: f64,
) -> Result<()> {
    let kind = get_dataset(name)?;
    let options = DatasetOptions {
        ds_rotate,
        ..Default::default()
    };
    let dataset = kind.open(&path, options)?;

    let (train, test) = split_indices(dataset.len(), split, shuffle, seed)?;

    println!("{} {}", "Dataset:".cyan(), kind);
    println!("{} {:?}", "Root:".cyan(), dataset.root());
    println!("{} {}", "Samples:".cyan(), format_number(dataset.len()));
    println!(
        "{} {} train / {} test",
        "Split:".cyan(),
        format_number(train.len()),
        format_number(test.len())
    );
    println!(
        "{} {} channels at {}x{}",
        "Input:".cyan(),
        dataset.options().input_channels(),
        dataset.options().output_size,
        dataset.options().output_size
    );

    if let Some(first) = dataset.get(0) {
        println!("{} {:?}", "First sample:".cyan(), first.grasp);
    }

    Ok(())
}

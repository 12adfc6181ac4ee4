//! `petal` command-line interface.
//!
//! ```bash
//! # Hold out 10 random rows of dataset.csv and classify them with k = 5
//! petal train
//!
//! # Stratified 80/20 split, reproducible, with a JSON report
//! petal train --ratio 0.8 --stratified --seed 42 --report report.json
//!
//! # Statistics plus PCA, LDA and SVD embeddings of dataset.ndjson
//! petal explore --out-dir embeddings
//! ```

mod cli;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ExploreArgs, TrainArgs};
use petal::pipeline;

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn banner(title: &str) {
    let width = 63;
    println!("╔{}╗", "═".repeat(width));
    println!("║{}║", " ".repeat(width));
    println!("║ {:<w$}║", title, w = width - 1);
    println!("║{}║", " ".repeat(width));
    println!("╚{}╝", "═".repeat(width));
    println!();
}

fn train(args: &TrainArgs) -> petal::Result<()> {
    let config = cli::train_config(args)?;
    banner("Iris Flower Classifier using K Nearest Neighbors");

    let outcome = pipeline::train(&config)?;

    println!("Example predictions:");
    for (i, prediction) in outcome.predictions.iter().take(3).enumerate() {
        println!("  [{}] => {}", i, prediction);
    }
    println!("Accuracy: {}", outcome.accuracy);
    Ok(())
}

fn explore(args: &ExploreArgs) -> petal::Result<()> {
    let config = cli::explore_config(args)?;
    banner("Iris Dataset Exploration");

    let outcome = pipeline::explore(&config)?;

    println!("{}", outcome.stats);
    for path in &outcome.embeddings {
        println!("Embedding saved to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match &cli.command {
        Command::Train(args) => train(args),
        Command::Explore(args) => explore(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

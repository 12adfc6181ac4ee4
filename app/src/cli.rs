use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use petal::Metric;
use petal::config::{DataConfig, DataFormat, ExploreConfig, Holdout, TrainConfig};

/// Iris classification and exploration with k-nearest neighbors
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "petal", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Train a k-NN classifier and score it on held-out rows
    Train(TrainArgs),

    /// Describe a dataset and export PCA, LDA and SVD embeddings
    Explore(ExploreArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct DataArgs {
    /// YAML configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Dataset file
    #[arg(short, long)]
    pub dataset: Option<PathBuf>,

    /// Dataset format (inferred from the extension by default)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Csv,
    Ndjson,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricArg {
    Euclidean,
    Manhattan,
    Chebyshev,
    Minkowski,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct TrainArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Number of neighbors
    #[arg(short, long)]
    pub k: Option<usize>,

    /// Distance metric
    #[arg(long, value_enum)]
    pub metric: Option<MetricArg>,

    /// Minkowski order
    #[arg(long, default_value_t = 3.0)]
    pub p: f64,

    /// Weight votes by inverse distance
    #[arg(long)]
    pub weighted: bool,

    /// Hold out this many random rows for testing
    #[arg(long, conflicts_with = "ratio")]
    pub holdout: Option<usize>,

    /// Train on this fraction of the rows, test on the rest
    #[arg(long)]
    pub ratio: Option<f64>,

    /// Keep class proportions on both sides of the split
    #[arg(long, requires = "ratio")]
    pub stratified: bool,

    /// Seed for the shuffle
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the evaluation report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write the testing rows with their predictions as CSV
    #[arg(long)]
    pub predictions: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ExploreArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Components kept by each embedding
    #[arg(short = 'n', long)]
    pub components: Option<usize>,

    /// Where to write the dataset statistics
    #[arg(long)]
    pub stats: Option<PathBuf>,

    /// Where to write per-class statistics
    #[arg(long)]
    pub by_label: Option<PathBuf>,

    /// Directory for pca.csv, lda.csv and svd.csv
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,
}

fn apply_data_overrides(data: &mut DataConfig, args: &DataArgs) {
    if let Some(path) = &args.dataset {
        data.path = path.clone();
    }
    if let Some(format) = args.format {
        data.format = Some(match format {
            FormatArg::Csv => DataFormat::Csv,
            FormatArg::Ndjson => DataFormat::Ndjson,
        });
    }
}

/// Loads the configuration file, if any, and applies command-line overrides.
pub fn train_config(args: &TrainArgs) -> petal::Result<TrainConfig> {
    let mut config = match &args.data.config {
        Some(path) => TrainConfig::from_yaml_file(path)?,
        None => TrainConfig::default(),
    };
    apply_data_overrides(&mut config.data, &args.data);
    if let Some(k) = args.k {
        config.knn.k = k;
    }
    if let Some(metric) = args.metric {
        config.knn.metric = match metric {
            MetricArg::Euclidean => Metric::Euclidean,
            MetricArg::Manhattan => Metric::Manhattan,
            MetricArg::Chebyshev => Metric::Chebyshev,
            MetricArg::Minkowski => Metric::Minkowski(args.p),
        };
    }
    if args.weighted {
        config.knn.weighted = true;
    }
    if let Some(size) = args.holdout {
        config.holdout = Holdout::Take { size };
    }
    if let Some(ratio) = args.ratio {
        config.holdout = Holdout::Split {
            ratio,
            stratified: args.stratified,
        };
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.report.is_some() {
        config.report = args.report.clone();
    }
    if args.predictions.is_some() {
        config.predictions = args.predictions.clone();
    }
    Ok(config)
}

pub fn explore_config(args: &ExploreArgs) -> petal::Result<ExploreConfig> {
    let mut config = match &args.data.config {
        Some(path) => ExploreConfig::from_yaml_file(path)?,
        None => ExploreConfig::default(),
    };
    apply_data_overrides(&mut config.data, &args.data);
    if let Some(components) = args.components {
        config.components = components;
    }
    if let Some(stats) = &args.stats {
        config.stats = stats.clone();
    }
    if args.by_label.is_some() {
        config.by_label = args.by_label.clone();
    }
    if let Some(out_dir) = &args.out_dir {
        config.out_dir = out_dir.clone();
    }
    Ok(config)
}

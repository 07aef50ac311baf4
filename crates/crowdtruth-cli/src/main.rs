//! crowdtruth CLI — ground-truth estimation for crowd-sourced landmark annotations.

mod input;
mod synth;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use crowdtruth::{
    filter_category, AnnotatorCategory, GroundTruthConfig, GroundTruthEstimator, HistoryReport,
    SelectCount, SelectionStrategy,
};
use serde::Serialize;

use input::AnnotationSet;
use synth::SynthConfig;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "crowdtruth")]
#[command(about = "Estimate ground-truth landmark locations from crowd-sourced annotations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run annotator elimination on an annotation set.
    Estimate(CliEstimateArgs),

    /// Write a seeded synthetic annotation set with a known true location.
    Synth(CliSynthArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Drop the annotator with the lowest summed x+y precision each round.
    WorstSingle,
    /// Keep the top --num-select annotators per axis each round.
    RankedTopK,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CategoryArg {
    Worker,
    Expert,
}

impl CategoryArg {
    fn to_core(self) -> AnnotatorCategory {
        match self {
            Self::Worker => AnnotatorCategory::Worker,
            Self::Expert => AnnotatorCategory::Expert,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct CliEstimateArgs {
    /// Path to the annotation set (JSON).
    #[arg(long)]
    input: PathBuf,

    /// Path to write the history report (JSON). Prints to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Optional estimator config (JSON); flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Elimination strategy.
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Ranked selection count: `k` keeps k, `-k` drops the last k, `0.x` keeps a fraction.
    #[arg(long, allow_hyphen_values = true, value_parser = parse_select_count)]
    num_select: Option<SelectCount>,

    /// Maximum mean-convergence iterations per round.
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Per-axis convergence tolerance.
    #[arg(long)]
    tol: Option<f64>,

    /// Maximum elimination rounds (default: annotators - 1).
    #[arg(long)]
    max_rounds: Option<usize>,

    /// Only use annotators of this category.
    #[arg(long, value_enum)]
    category: Option<CategoryArg>,
}

impl CliEstimateArgs {
    fn build_config(&self) -> CliResult<GroundTruthConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
                serde_json::from_str::<GroundTruthConfig>(&text)?
            }
            None => GroundTruthConfig::default(),
        };

        match (self.strategy, self.num_select) {
            (Some(StrategyArg::WorstSingle), Some(_)) => {
                return Err("--num-select only applies to --strategy ranked-top-k".into());
            }
            (Some(StrategyArg::WorstSingle), None) => {
                config.strategy = SelectionStrategy::WorstSingleElimination;
            }
            (Some(StrategyArg::RankedTopK), num_select) => {
                config.strategy = SelectionStrategy::ranked(num_select.unwrap_or_default());
            }
            (None, Some(num_select)) => match &mut config.strategy {
                SelectionStrategy::RankedTopK { num_select: n } => *n = num_select,
                SelectionStrategy::WorstSingleElimination => {
                    return Err("--num-select requires a ranked-top-k strategy".into());
                }
            },
            (None, None) => {}
        }

        if let Some(v) = self.max_iterations {
            config.converge.max_iterations = v;
        }
        if let Some(v) = self.tol {
            config.converge.tol = v;
        }
        if self.max_rounds.is_some() {
            config.max_rounds = self.max_rounds;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Args)]
struct CliSynthArgs {
    /// Path to write the annotation set (JSON).
    #[arg(long)]
    out: PathBuf,

    /// RNG seed.
    #[arg(long, default_value = "0")]
    seed: u64,

    /// True landmark x coordinate.
    #[arg(long, default_value = "10.0", allow_hyphen_values = true)]
    truth_x: f64,

    /// True landmark y coordinate.
    #[arg(long, default_value = "12.0", allow_hyphen_values = true)]
    truth_y: f64,

    /// Number of expert annotators.
    #[arg(long, default_value = "1")]
    experts: usize,

    /// Number of worker annotators.
    #[arg(long, default_value = "2")]
    workers: usize,

    /// Samples per annotator.
    #[arg(long, default_value = "4")]
    samples: usize,

    /// Maximum distance between a worker's aim point and the truth.
    #[arg(long, default_value = "5.0")]
    worker_bias: f64,
}

#[derive(Serialize)]
struct EstimateOutput<'a> {
    config: &'a GroundTruthConfig,
    n_annotators: usize,
    n_samples: usize,
    history: HistoryReport,
}

fn parse_select_count(s: &str) -> Result<SelectCount, String> {
    if s.contains('.') {
        let v: f64 = s
            .parse()
            .map_err(|e| format!("invalid fraction {}: {}", s, e))?;
        return Ok(SelectCount::Fraction(v));
    }
    let n: i64 = s
        .parse()
        .map_err(|e| format!("invalid count {}: {}", s, e))?;
    match n {
        0 => Err("selection count must be non-zero".to_string()),
        n if n < 0 => Ok(SelectCount::AllBut(n.unsigned_abs() as usize)),
        n => Ok(SelectCount::Count(n as usize)),
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Estimate(args) => run_estimate(&args),
        Commands::Synth(args) => run_synth(&args),
    }
}

// ── estimate ───────────────────────────────────────────────────────────

fn run_estimate(args: &CliEstimateArgs) -> CliResult<()> {
    let config = args.build_config()?;

    tracing::info!("Loading annotations: {}", args.input.display());
    let (mut landmarks, mut metadata) = AnnotationSet::from_json_file(&args.input)?.into_parts()?;
    tracing::info!(
        "{} annotators x {} samples",
        landmarks.n_annotators(),
        landmarks.n_samples()
    );

    if let Some(category) = args.category {
        let category = category.to_core();
        (landmarks, metadata) = filter_category(&landmarks, &metadata, category)?;
        tracing::info!("Restricted to {} {} annotators", metadata.len(), category);
    }

    let n_annotators = landmarks.n_annotators();
    let n_samples = landmarks.n_samples();
    let estimator = GroundTruthEstimator::new(config);
    let history = estimator.run(landmarks, &metadata)?;

    if let Some(mean) = history.final_mean() {
        tracing::info!("Ground truth: ({:.4}, {:.4})", mean.x, mean.y);
    }
    let unconverged = history
        .iter()
        .filter(|e| e.converged() == Some(false))
        .count();
    if unconverged > 0 {
        tracing::warn!("{} rounds ended without mean convergence", unconverged);
    }

    let output = EstimateOutput {
        config: estimator.config(),
        n_annotators,
        n_samples,
        history: history.report(),
    };
    let json = serde_json::to_string_pretty(&output)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, &json)?;
            tracing::info!("Results written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

// ── synth ──────────────────────────────────────────────────────────────

fn run_synth(args: &CliSynthArgs) -> CliResult<()> {
    let config = SynthConfig {
        seed: args.seed,
        truth: [args.truth_x, args.truth_y],
        n_experts: args.experts,
        n_workers: args.workers,
        n_samples: args.samples,
        worker_bias: args.worker_bias,
        ..SynthConfig::default()
    };
    let set = synth::generate(&config)?;

    let json = serde_json::to_string_pretty(&set)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!(
        "Wrote {} annotators around ({}, {}) to {}",
        set.annotators.len(),
        args.truth_x,
        args.truth_y,
        args.out.display()
    );

    Ok(())
}

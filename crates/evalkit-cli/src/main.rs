//! evalkit - score model outputs from the command line
//!
//! ## Commands
//!
//! - `run`: evaluate a JSON or JSON Lines dataset with built-in heuristics
//! - `metrics`: list the available heuristic metrics

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info, warn, Level};

use evalkit_core::dataset::{DEFAULT_EXPECTED_KEY, DEFAULT_INPUT_KEY, DEFAULT_OUTPUT_KEY};
use evalkit_core::{
    default_mapper, heuristics, load_records_json, load_records_jsonl, DatasetEvaluator, Engine,
    EngineConfig, EvalContext, EvalReport, EvaluationResults, HeuristicKind, Record, EVAL_COUNTERS,
};

#[derive(Parser)]
#[command(name = "evalkit")]
#[command(author = "Stevedores Org")]
#[command(version = evalkit_core::VERSION)]
#[command(about = "Heuristic evaluation of model outputs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a dataset file and print a JSON report
    Run {
        /// Dataset file: a JSON array of objects, or JSON Lines
        file: PathBuf,

        /// Heuristics to apply, comma separated
        #[arg(
            short,
            long,
            value_delimiter = ',',
            default_value = "levenshtein,jaccard,cosine,rouge_l"
        )]
        metrics: Vec<HeuristicKind>,

        /// Maximum number of records evaluated at once
        #[arg(short, long, env = "EVALKIT_CONCURRENCY", default_value_t = 1)]
        concurrency: usize,

        /// Record field holding the prompt
        #[arg(long, default_value = DEFAULT_INPUT_KEY)]
        input_key: String,

        /// Record field holding the model output
        #[arg(long, default_value = DEFAULT_OUTPUT_KEY)]
        output_key: String,

        /// Record field holding the reference answer
        #[arg(long, default_value = DEFAULT_EXPECTED_KEY)]
        expected_key: String,

        /// Dataset format (detected from the file extension by default)
        #[arg(long, value_enum, default_value_t = DatasetFormat::Auto)]
        format: DatasetFormat,

        /// Include every per-record result in the report
        #[arg(long)]
        details: bool,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the built-in heuristic metrics
    Metrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DatasetFormat {
    Auto,
    Json,
    Jsonl,
}

impl DatasetFormat {
    /// `.jsonl` and `.ndjson` files are JSON Lines; anything else is a JSON array.
    fn resolve(self, path: &Path) -> DatasetFormat {
        if self != DatasetFormat::Auto {
            return self;
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("jsonl") | Some("ndjson") => DatasetFormat::Jsonl,
            _ => DatasetFormat::Json,
        }
    }
}

struct RunOptions {
    file: PathBuf,
    metrics: Vec<HeuristicKind>,
    concurrency: usize,
    input_key: String,
    output_key: String,
    expected_key: String,
    format: DatasetFormat,
    details: bool,
}

#[derive(Debug, Serialize)]
struct RunOutput {
    dataset: String,
    metrics: Vec<HeuristicKind>,
    report: EvalReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<EvaluationResults>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    evalkit_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            file,
            metrics,
            concurrency,
            input_key,
            output_key,
            expected_key,
            format,
            details,
            output,
        } => {
            let opts = RunOptions {
                file,
                metrics,
                concurrency,
                input_key,
                output_key,
                expected_key,
                format,
                details,
            };
            cmd_run(&opts, output.as_deref()).await
        }
        Commands::Metrics => {
            print!("{}", cmd_metrics());
            Ok(())
        }
    }
}

fn load_dataset(path: &Path, format: DatasetFormat) -> Result<Vec<Record>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset: {:?}", path))?;

    let records = match format.resolve(path) {
        DatasetFormat::Jsonl => load_records_jsonl(&text),
        _ => load_records_json(&text),
    }
    .with_context(|| format!("Failed to parse dataset: {:?}", path))?;

    Ok(records)
}

async fn evaluate_dataset(opts: &RunOptions, ctx: &EvalContext) -> Result<RunOutput> {
    if opts.metrics.is_empty() {
        anyhow::bail!("At least one metric is required");
    }

    let records = load_dataset(&opts.file, opts.format)?;
    info!(records = records.len(), file = ?opts.file, "loaded dataset");

    let config = EngineConfig {
        concurrency: opts.concurrency,
    };
    let metrics = opts.metrics.iter().map(|kind| heuristics::build(*kind)).collect();
    let engine =
        Engine::from_config(metrics, &config).with_progress(|completed, total, result| {
            debug!(completed, total, item_id = %result.item_id, "record evaluated");
        });

    let evaluator = DatasetEvaluator::new(
        engine,
        default_mapper(&opts.input_key, &opts.output_key, &opts.expected_key),
    );
    let results = evaluator.evaluate(ctx, &records).await;

    Ok(RunOutput {
        dataset: opts.file.display().to_string(),
        metrics: opts.metrics.clone(),
        report: results.report(),
        results: opts.details.then_some(results),
    })
}

async fn cmd_run(opts: &RunOptions, output: Option<&Path>) -> Result<()> {
    let (ctx, cancel) = EvalContext::new();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling evaluation");
            cancel.cancel();
        }
    });

    let outcome = evaluate_dataset(opts, &ctx).await;
    interrupt.abort();
    let run = outcome?;

    let rendered = serde_json::to_string_pretty(&run)?;
    if let Some(path) = output {
        std::fs::write(path, &rendered)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        info!(path = ?path, "report written");
    } else {
        println!("{}", rendered);
    }

    if run.report.failed > 0 {
        warn!(
            failed = run.report.failed,
            total = run.report.total,
            "some records did not finish"
        );
    }

    EVAL_COUNTERS.flush();
    Ok(())
}

fn cmd_metrics() -> String {
    HeuristicKind::ALL
        .iter()
        .map(|kind| {
            let metric = heuristics::build(*kind);
            format!("{:<20} {}\n", kind.as_str(), metric.name())
        })
        .collect()
}

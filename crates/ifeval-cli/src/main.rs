//! ifeval - instruction-following evaluation CLI
//!
//! ## Commands
//!
//! - `evaluate`: Score model responses against their prompts' instructions
//! - `catalog`: List every supported instruction and its parameters
//! - `describe`: Render the instruction sentence for an id and kwargs
//! - `validate`: Check an input file without evaluating anything
//! - `sample`: Generate random input examples with compatible instructions

mod telemetry;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};

use ifeval_core::dataset::{
    read_input_examples, read_responses, validate_examples, write_results,
};
use ifeval_core::{EvalConfig, InputExample, InstructionRegistry, Params, Report};
use ifeval_runtime::{BatchConfig, BatchEvaluator, CancelFlag, InMemoryResponses};

#[derive(Parser)]
#[command(name = "ifeval")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify that model responses follow machine-checkable instructions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// YAML configuration file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate responses in strict and loose mode and write per-mode results
    Evaluate {
        /// Input examples (JSON lines with prompt, instruction_id_list, kwargs)
        #[arg(long)]
        input_data: PathBuf,

        /// Responses (JSON lines with prompt, response)
        #[arg(long)]
        input_response_data: PathBuf,

        /// Directory for eval_results_<mode>.jsonl
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Examples evaluated concurrently
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// List supported instructions
    Catalog {
        /// Print the catalogue as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the instruction sentence for an id
    Describe {
        /// Instruction id, e.g. keywords:existence
        id: String,

        /// Parameters as a JSON object
        #[arg(long, conflicts_with = "sample")]
        kwargs: Option<String>,

        /// Draw random parameters instead of supplying them
        #[arg(long)]
        sample: bool,

        /// Seed for --sample
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Validate an input file: schema, ids, parameters and conflicts
    ///
    /// The schema check follows `validate_schema` from --config.
    Validate {
        /// Input examples (JSON lines)
        #[arg(long)]
        input_data: PathBuf,
    },

    /// Print random input examples as JSON lines
    Sample {
        /// Number of examples
        #[arg(long, default_value = "1")]
        examples: usize,

        /// Instructions per example
        #[arg(long, default_value = "3")]
        count: usize,

        /// Prompt text for every example
        #[arg(long, default_value = "Write a short essay about the sea.")]
        prompt: String,

        /// RNG seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    telemetry::init_tracing(cli.json_logs, level);

    let config = match &cli.config {
        Some(path) => EvalConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EvalConfig::default(),
    };

    match cli.command {
        Commands::Evaluate {
            input_data,
            input_response_data,
            output_dir,
            concurrency,
        } => {
            cmd_evaluate(
                config,
                &input_data,
                &input_response_data,
                output_dir,
                concurrency,
            )
            .await
        }
        Commands::Catalog { json } => cmd_catalog(json),
        Commands::Describe {
            id,
            kwargs,
            sample,
            seed,
        } => cmd_describe(&id, kwargs.as_deref(), sample.then_some(seed)),
        Commands::Validate { input_data } => cmd_validate(&config, &input_data),
        Commands::Sample {
            examples,
            count,
            prompt,
            seed,
        } => cmd_sample(examples, count, &prompt, seed),
    }
}

async fn cmd_evaluate(
    mut config: EvalConfig,
    input_data: &Path,
    input_response_data: &Path,
    output_dir: Option<PathBuf>,
    concurrency: Option<usize>,
) -> Result<()> {
    if let Some(concurrency) = concurrency {
        config.concurrency = concurrency;
    }
    if output_dir.is_some() {
        config.output_dir = output_dir;
    }
    config.validate().context("Invalid evaluation settings")?;
    let output_dir = config
        .output_dir
        .clone()
        .context("No output directory: pass --output-dir or set output_dir in the config")?;

    let examples = read_input_examples(input_data, config.validate_schema)
        .with_context(|| format!("Failed to read input data from {}", input_data.display()))?;
    let responses = read_responses(input_response_data).with_context(|| {
        format!(
            "Failed to read responses from {}",
            input_response_data.display()
        )
    })?;
    info!(
        examples = examples.len(),
        responses = responses.len(),
        "loaded evaluation data"
    );

    let cancel = CancelFlag::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; finishing examples already in flight");
            interrupt.cancel();
        }
    });

    let evaluator = BatchEvaluator::new(
        Arc::new(InstructionRegistry::builtin()),
        BatchConfig::from(&config),
    );
    let source = InMemoryResponses::new(responses);
    let outcome = evaluator.run(&examples, &source, &cancel).await;

    for failure in outcome.failures() {
        if let Some(e) = &failure.error {
            warn!(key = failure.key, error = %e, "example reported as unscorable");
        }
    }

    for mode in &config.modes {
        let results = outcome.results_for(*mode);
        let path = output_dir.join(format!("eval_results_{}.jsonl", mode));
        write_results(&path, &results)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        info!(path = %path.display(), count = results.len(), "wrote results");

        println!("{}", Report::from_results(&results));
    }

    if outcome.cancelled {
        bail!(
            "Evaluation interrupted: {} of {} examples evaluated",
            outcome.evaluations.len(),
            examples.len()
        );
    }
    Ok(())
}

fn cmd_catalog(json: bool) -> Result<()> {
    let registry = InstructionRegistry::builtin();

    if json {
        let summaries = registry.summaries();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!("{} instructions\n", registry.len());
    for kind in registry.kinds() {
        println!("{}", kind.id());
        for param in kind.params() {
            println!("    {}", param);
        }
    }
    Ok(())
}

fn cmd_describe(id: &str, kwargs: Option<&str>, seed: Option<u64>) -> Result<()> {
    let registry = InstructionRegistry::builtin();
    let kind = registry.resolve(id)?;

    let params = match (kwargs, seed) {
        (_, Some(seed)) => kind.sample_params_seeded(seed),
        (Some(json), None) => serde_json::from_str::<Params>(json)
            .with_context(|| format!("--kwargs is not a JSON object: {}", json))?,
        (None, None) => Params::new(),
    };

    let bound = kind.bind(&params)?;
    println!("{}", bound.describe());
    if seed.is_some() {
        println!("{}", serde_json::to_string(bound.params())?);
    }
    Ok(())
}

fn cmd_validate(config: &EvalConfig, input_data: &Path) -> Result<()> {
    let examples = read_input_examples(input_data, config.validate_schema)
        .with_context(|| format!("Failed to read input data from {}", input_data.display()))?;
    let registry = InstructionRegistry::builtin();

    let issues = validate_examples(&registry, &examples);
    for issue in &issues {
        println!("{}", issue);
    }

    let errors = issues.iter().filter(|i| i.is_error()).count();
    println!(
        "\n{} examples, {} instruction errors, {} conflicting pairs",
        examples.len(),
        errors,
        issues.len() - errors
    );
    if errors > 0 {
        bail!("{} instructions cannot be evaluated", errors);
    }
    Ok(())
}

fn cmd_sample(examples: usize, count: usize, prompt: &str, seed: u64) -> Result<()> {
    let registry = InstructionRegistry::builtin();
    let mut rng = StdRng::seed_from_u64(seed);

    for key in 0..examples {
        let input = InputExample::sampled(&registry, key as i64, prompt, count, &mut rng);
        if input.instruction_id_list.len() < count {
            warn!(
                key,
                requested = count,
                sampled = input.instruction_id_list.len(),
                "not enough compatible instructions"
            );
        }
        println!("{}", serde_json::to_string(&input)?);
    }
    Ok(())
}

//! clauselens CLI
//!
//! ```bash
//! # Full analysis with a local Ollama server
//! clauselens analyze contract.txt
//!
//! # Lexical/static signals only, machine-readable
//! cat contract.txt | clauselens analyze - --no-llm --format json
//!
//! # Inspect segmentation and the template corpus
//! clauselens segment contract.txt
//! clauselens templates --templates ./templates
//! ```

mod display;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use clauselens_ai::{
    Analyzer, DisabledGenerator, Generator, LexicalEmbedder, OllamaClient, TextEmbedder,
};
use clauselens_core::{AnalysisConfig, extract_clauses};
use clauselens_store::{TemplateDir, TemplateSource};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clauselens", version)]
#[command(about = "Contract clause classification, deviation and risk analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis pipeline on a contract
    Analyze {
        /// Contract text file, or `-` for stdin
        input: PathBuf,

        #[command(flatten)]
        opts: AnalyzeOpts,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Skip every generation call (static risk signals only, no summaries)
        #[arg(long)]
        no_llm: bool,
    },

    /// Print the clauses found by the segmenter
    Segment {
        /// Contract text file, or `-` for stdin
        input: PathBuf,
    },

    /// List the template corpus
    Templates {
        /// Directory of `<Label>.txt` template clauses
        #[arg(long, env = "CLAUSELENS_TEMPLATES", default_value = "templates")]
        templates: PathBuf,
    },
}

#[derive(clap::Args)]
struct AnalyzeOpts {
    /// JSON analysis configuration (thresholds, taxonomy)
    #[arg(long, env = "CLAUSELENS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of `<Label>.txt` template clauses
    #[arg(long, env = "CLAUSELENS_TEMPLATES", default_value = "templates")]
    templates: PathBuf,

    /// Ollama base URL
    #[arg(long, env = "OLLAMA_URL", default_value = clauselens_ai::llm::DEFAULT_OLLAMA_URL)]
    ollama_url: String,

    /// Generation model name
    #[arg(long, env = "CLAUSELENS_MODEL", default_value = clauselens_ai::llm::DEFAULT_MODEL)]
    model: String,

    /// Sentence-transformers ONNX model directory (requires the `onnx` feature)
    #[arg(long, env = "CLAUSELENS_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Override the "Other" classification floor
    #[arg(long)]
    low_confidence_threshold: Option<f32>,

    /// Override the mandatory-clause presence threshold
    #[arg(long)]
    presence_threshold: Option<f32>,

    /// Override the template deviation threshold
    #[arg(long)]
    deviation_threshold: Option<f32>,

    /// Maximum in-flight model calls during risk scoring
    #[arg(long)]
    max_concurrency: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            input,
            opts,
            format,
            no_llm,
        } => cmd_analyze(&input, opts, format, no_llm).await,
        Commands::Segment { input } => cmd_segment(&input),
        Commands::Templates { templates } => cmd_templates(&templates),
    }
}

async fn cmd_analyze(
    input: &Path,
    opts: AnalyzeOpts,
    format: OutputFormat,
    no_llm: bool,
) -> anyhow::Result<()> {
    let contract = read_input(input)?;
    let config = load_config(&opts)?;

    let (embedder, embedder_name) = build_embedder(opts.model_dir.as_deref())?;
    let generator: Arc<dyn Generator> = if no_llm {
        Arc::new(DisabledGenerator)
    } else {
        Arc::new(OllamaClient::new(opts.ollama_url.clone(), opts.model.clone()))
    };
    let generator_name = generator.name().to_string();

    let templates = TemplateDir::new(&opts.templates);
    let mut analyzer = Analyzer::new(config, embedder, &templates, generator)
        .with_context(|| format!("preparing analysis with templates in {}", opts.templates.display()))?;
    if no_llm {
        analyzer = analyzer.without_summaries();
    }

    info!(
        embedder = %embedder_name,
        generator = %generator_name,
        templates = analyzer.template_labels().len(),
        "analyzing contract"
    );
    let report = analyzer.analyze(&contract).await?;

    match format {
        OutputFormat::Text => print!("{}", display::render_report(&report)),
        OutputFormat::Json => {
            let json = display::JsonReport::new(&report, &embedder_name, &generator_name);
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}

fn cmd_segment(input: &Path) -> anyhow::Result<()> {
    let contract = read_input(input)?;
    let clauses = extract_clauses(&contract);
    print!("{}", display::render_segments(&clauses));
    Ok(())
}

fn cmd_templates(dir: &Path) -> anyhow::Result<()> {
    let templates = TemplateDir::new(dir)
        .list_templates()
        .with_context(|| format!("listing templates in {}", dir.display()))?;
    print!("{}", display::render_templates(&templates));
    Ok(())
}

/// Read a contract from a file, or from stdin when the path is `-`.
fn read_input(input: &Path) -> anyhow::Result<String> {
    if input == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading contract from stdin")?;
        return Ok(buffer);
    }
    std::fs::read_to_string(input)
        .with_context(|| format!("reading contract from {}", input.display()))
}

/// Config file (or defaults) with command-line overrides applied.
fn load_config(opts: &AnalyzeOpts) -> anyhow::Result<AnalysisConfig> {
    let mut config = match &opts.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(t) = opts.low_confidence_threshold {
        config.low_confidence_threshold = t;
    }
    if let Some(t) = opts.presence_threshold {
        config.presence_threshold = t;
    }
    if let Some(t) = opts.deviation_threshold {
        config.deviation_threshold = t;
    }
    if let Some(n) = opts.max_concurrency {
        config.max_concurrency = n;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(feature = "onnx")]
fn build_embedder(model_dir: Option<&Path>) -> anyhow::Result<(Box<dyn TextEmbedder>, String)> {
    match model_dir {
        Some(dir) => {
            let embedder = clauselens_ai::Embedder::load(dir)
                .with_context(|| format!("loading embedding model from {}", dir.display()))?;
            Ok((Box::new(embedder), format!("onnx:{}", dir.display())))
        }
        None => Ok((Box::new(LexicalEmbedder::default()), "lexical".to_string())),
    }
}

#[cfg(not(feature = "onnx"))]
fn build_embedder(model_dir: Option<&Path>) -> anyhow::Result<(Box<dyn TextEmbedder>, String)> {
    if let Some(dir) = model_dir {
        anyhow::bail!(
            "--model-dir {} needs a build with the `onnx` feature",
            dir.display()
        );
    }
    Ok((Box::new(LexicalEmbedder::default()), "lexical".to_string()))
}

//! QRC CLI - Command-line interface
//!
//! Usage:
//!   qrc map <files>...
//!   qrc lexicon check <file>
//!   qrc lexicon show

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::io::AsyncReadExt;

use qrc_core::{is_unparseable, AppConfig, ConceptGraph, Direction, LoggingConfig};
use qrc_extractor::{ConceptMapper, Lexicon};

/// Input name that reads the summary from stdin
const STDIN_INPUT: &str = "-";

#[derive(Parser)]
#[command(name = "qrc")]
#[command(about = "Concept maps from research paper summaries")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build concept maps from summary files
    Map(MapArgs),
    /// Inspect extraction tables
    Lexicon {
        #[command(subcommand)]
        action: LexiconAction,
    },
}

#[derive(clap::Args)]
struct MapArgs {
    /// Summary files (`-` for stdin)
    #[arg(required = true)]
    files: Vec<String>,

    /// Lexicon TOML file replacing the built-in tables
    #[arg(long)]
    lexicon: Option<PathBuf>,

    /// Maximum number of nodes
    #[arg(long)]
    max_nodes: Option<usize>,

    /// Maximum number of edges
    #[arg(long)]
    max_edges: Option<usize>,

    /// Also draw concepts without relationships
    #[arg(long)]
    declare_isolated: bool,

    /// Diagram direction
    #[arg(long, value_enum)]
    direction: Option<DirectionArg>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Mermaid)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum LexiconAction {
    /// Load and validate a lexicon file
    Check { file: PathBuf },
    /// Print the built-in lexicon as TOML
    Show,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DirectionArg {
    Td,
    Lr,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Td => Direction::TopDown,
            DirectionArg::Lr => Direction::LeftRight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Mermaid,
    Json,
}

/// One JSON line per input when several inputs are mapped
#[derive(Serialize)]
struct JsonRecord<'a> {
    input: &'a str,
    graph: &'a ConceptGraph,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Map(args) => run_map(config, args).await?,
        Commands::Lexicon { action } => match action {
            LexiconAction::Check { file } => {
                let lexicon = Lexicon::from_file(&file)
                    .with_context(|| format!("Invalid lexicon {}", file.display()))?;
                println!(
                    "{}: ok ({} terms, {} relations, {} rules)",
                    file.display(),
                    lexicon.terms.len(),
                    lexicon.relations.len(),
                    lexicon.rules.len()
                );
            }
            LexiconAction::Show => {
                print!("{}", Lexicon::quantum().to_toml_string()?);
            }
        },
    }

    Ok(())
}

/// Config file (if any), then environment overrides
fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };
    config
        .with_env_override()
        .context("Invalid environment configuration")
}

/// Logs go to stderr; stdout carries only diagrams
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_map(mut config: AppConfig, args: MapArgs) -> anyhow::Result<()> {
    let map_config = &mut config.concept_map;
    if let Some(path) = args.lexicon {
        map_config.lexicon_path = Some(path);
    }
    if let Some(max_nodes) = args.max_nodes {
        map_config.max_nodes = max_nodes;
    }
    if let Some(max_edges) = args.max_edges {
        map_config.max_edges = max_edges;
    }
    if args.declare_isolated {
        map_config.declare_isolated_nodes = true;
    }
    if let Some(direction) = args.direction {
        map_config.direction = direction.into();
    }

    check_inputs(&args.files)?;

    let mapper = Arc::new(
        ConceptMapper::from_config(config.concept_map).context("Failed to build concept mapper")?,
    );
    tracing::info!(inputs = args.files.len(), "Mapping summaries");

    // Inputs are mapped concurrently and printed in argument order
    let mut tasks = Vec::with_capacity(args.files.len());
    for input in &args.files {
        let text = read_input(input).await?;
        if is_unparseable(&text) {
            tracing::warn!(input = %input, "Skipping summary of unparseable PDF");
            continue;
        }

        let mapper = Arc::clone(&mapper);
        let task = tokio::task::spawn_blocking(move || mapper.build_graph(&text));
        tasks.push((input.as_str(), task));
    }

    let multiple = args.files.len() > 1;
    for (input, task) in tasks {
        let graph = task
            .await
            .context("Mapping task panicked")?
            .with_context(|| format!("Failed to map {}", input))?;

        tracing::debug!(
            input = %input,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Concept map built"
        );

        println!("{}", format_output(&mapper, input, &graph, args.format, multiple)?);
    }

    Ok(())
}

/// Stdin can be consumed only once per run
fn check_inputs(files: &[String]) -> anyhow::Result<()> {
    let stdin_count = files.iter().filter(|f| f.as_str() == STDIN_INPUT).count();
    if stdin_count > 1 {
        anyhow::bail!("`{}` (stdin) given {} times; it can be read only once", STDIN_INPUT, stdin_count);
    }
    Ok(())
}

async fn read_input(input: &str) -> anyhow::Result<String> {
    if input == STDIN_INPUT {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read stdin")?;
        return Ok(text);
    }

    tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input))
}

fn format_output(
    mapper: &ConceptMapper,
    input: &str,
    graph: &ConceptGraph,
    format: OutputFormat,
    multiple: bool,
) -> anyhow::Result<String> {
    let output = match (format, multiple) {
        (OutputFormat::Mermaid, false) => mapper.render(graph),
        (OutputFormat::Mermaid, true) => format!("%% {}\n{}", input, mapper.render(graph)),
        (OutputFormat::Json, false) => serde_json::to_string_pretty(graph)?,
        (OutputFormat::Json, true) => serde_json::to_string(&JsonRecord { input, graph })?,
    };
    Ok(output)
}

//! ocrtable CLI - OCR block graph to CSV and structured JSON

mod openai;
mod webhook;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::runtime::Runtime;

use ocrtable::model::BlockType;
use ocrtable::{
    parse_file, BatchItem, DocumentProcessor, ExtractOptions, ExtractionStats, FileBlockSource,
    FsArtifactSink, JobRunner, JobStatus, JsonFormat, OutputLayout,
};

use crate::openai::OpenAiConsolidator;
use crate::webhook::WebhookNotifier;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "ocrtable")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Convert OCR block graphs to CSV and structured JSON", long_about = None)]
struct Cli {
    /// Input block JSON file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert block files to CSV and JSON
    Convert {
        /// Input block JSON files
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Convert a block file to CSV
    Csv {
        /// Input block JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Convert a block file to the structured JSON record
    Json {
        /// Input block JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Show block counts and extraction statistics
    Info {
        /// Input block JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Run a job from a completion notification
    Job {
        /// Notification event JSON file
        #[arg(value_name = "EVENT")]
        event: PathBuf,

        /// Directory holding `{job_id}.json` block files
        #[arg(long, value_name = "DIR")]
        blocks_dir: PathBuf,

        /// Directory artifacts are written under
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Output key prefix
        #[arg(long, env = "OUTPUT_PREFIX", default_value = "processed")]
        prefix: String,

        /// Report bucket URLs for this bucket instead of local paths
        #[arg(long, env = "OUTPUT_S3_BUCKET")]
        bucket: Option<String>,

        /// Webhook receiving the job outcome
        #[arg(long, env = "WEBHOOK_URL")]
        webhook_url: Option<String>,

        /// Shared secret sent with the webhook
        #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
        webhook_secret: Option<String>,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Show version information
    Version,
}

#[derive(Args, Clone)]
struct ExtractArgs {
    /// Skip geometry and use declared cell structure only
    #[arg(long)]
    structural_only: bool,

    /// Consolidate multi-row table headers in the JSON record
    #[arg(long)]
    consolidate_headers: bool,

    /// API key for header consolidation
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Model used for header consolidation
    #[arg(long, default_value = openai::DEFAULT_MODEL)]
    openai_model: String,
}

impl Default for ExtractArgs {
    fn default() -> Self {
        Self {
            structural_only: false,
            consolidate_headers: false,
            openai_api_key: None,
            openai_model: openai::DEFAULT_MODEL.to_string(),
        }
    }
}

impl ExtractArgs {
    fn options(&self) -> ExtractOptions {
        let options = ExtractOptions::new();
        if self.structural_only {
            options.structural_only()
        } else {
            options
        }
    }

    fn processor(&self, runtime: &Arc<Runtime>) -> CliResult<DocumentProcessor> {
        let processor = DocumentProcessor::with_options(self.options());
        if !self.consolidate_headers {
            return Ok(processor);
        }

        match &self.openai_api_key {
            Some(key) => {
                let consolidator =
                    OpenAiConsolidator::new(key.clone(), self.openai_model.clone(), runtime.clone())?;
                Ok(processor.with_consolidator(Arc::new(consolidator)))
            }
            None => {
                eprintln!(
                    "{} header consolidation skipped (no API key)",
                    "Warning:".yellow().bold()
                );
                Ok(processor)
            }
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Convert {
            inputs,
            output,
            extract,
        }) => cmd_convert(&inputs, output.as_deref(), &extract),
        Some(Commands::Csv {
            input,
            output,
            extract,
        }) => cmd_csv(&input, output.as_deref(), &extract),
        Some(Commands::Json {
            input,
            output,
            compact,
            extract,
        }) => cmd_json(&input, output.as_deref(), compact, &extract),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Job {
            event,
            blocks_dir,
            output,
            prefix,
            bucket,
            webhook_url,
            webhook_secret,
            extract,
        }) => cmd_job(
            &event,
            &blocks_dir,
            &output,
            &prefix,
            bucket,
            webhook_url,
            webhook_secret,
            &extract,
        ),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: convert if input is provided
            if let Some(input) = cli.input {
                cmd_convert(&[input], cli.output.as_deref(), &ExtractArgs::default())
            } else {
                println!("{}", "Usage: ocrtable <FILE> [OUTPUT]".yellow());
                println!("       ocrtable --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn runtime() -> CliResult<Arc<Runtime>> {
    Ok(Arc::new(Runtime::new()?))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

fn write_or_print(output: Option<&Path>, content: &str) -> CliResult<()> {
    if let Some(path) = output {
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        print!("{}", content);
    }
    Ok(())
}

fn cmd_convert(inputs: &[PathBuf], output: Option<&Path>, extract: &ExtractArgs) -> CliResult<()> {
    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&output_dir)?;

    let runtime = runtime()?;
    let processor = extract.processor(&runtime)?;

    let pb = ProgressBar::new(inputs.len() as u64 + 1);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")?
            .progress_chars("#>-"),
    );

    pb.set_message("Loading blocks...");
    let mut items = Vec::with_capacity(inputs.len());
    for input in inputs {
        let graph = parse_file(input)?;
        items.push(BatchItem::new(graph, input.display().to_string(), file_stem(input)));
    }
    pb.inc(1);

    pb.set_message("Reconstructing tables...");
    let results = processor.process_batch(&items);

    let mut written = Vec::new();
    let mut totals = ExtractionStats::new();
    let mut failures = 0;
    for (input, result) in inputs.iter().zip(results) {
        pb.inc(1);
        let processed = match result {
            Ok(processed) => processed,
            Err(e) => {
                pb.println(format!("{} {}: {}", "Failed".red(), input.display(), e));
                failures += 1;
                continue;
            }
        };

        totals.merge(&processed.stats);
        let stem = file_stem(input);
        if processed.has_rows() {
            let name = format!("{}.csv", stem);
            fs::write(output_dir.join(&name), processed.csv()?)?;
            written.push(name);
        }
        let name = format!("{}.json", stem);
        fs::write(output_dir.join(&name), processed.json(JsonFormat::Pretty)?)?;
        written.push(name);
    }

    pb.finish_with_message("Done!");

    println!("\n{}", "Output files:".green().bold());
    for (i, name) in written.iter().enumerate() {
        let branch = if i + 1 == written.len() { "└─" } else { "├─" };
        println!("  {} {}", branch.dimmed(), name);
    }

    println!(
        "\n{}: {} of {} tables reconstructed ({} spatial, {} structural), {} form fields, {} lines",
        "Totals".bold(),
        totals.reconstructed_count(),
        totals.table_count,
        totals.spatial_table_count,
        totals.structural_table_count,
        totals.key_value_count,
        totals.line_count
    );

    if failures > 0 {
        return Err(format!("{} of {} documents failed", failures, inputs.len()).into());
    }
    Ok(())
}

fn cmd_csv(input: &Path, output: Option<&Path>, extract: &ExtractArgs) -> CliResult<()> {
    let graph = parse_file(input)?;
    let processor = DocumentProcessor::with_options(extract.options());
    let processed = processor.process(&graph, &input.display().to_string(), &file_stem(input))?;

    write_or_print(output, &processed.csv()?)
}

fn cmd_json(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
    extract: &ExtractArgs,
) -> CliResult<()> {
    let graph = parse_file(input)?;
    let runtime = runtime()?;
    let processor = extract.processor(&runtime)?;
    let processed = processor.process(&graph, &input.display().to_string(), &file_stem(input))?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let mut json = processed.json(format)?;
    json.push('\n');
    write_or_print(output, &json)
}

fn cmd_info(input: &Path) -> CliResult<()> {
    let graph = parse_file(input)?;

    println!("{}", "Block Graph".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Blocks".bold(), graph.len());
    for block_type in [
        BlockType::Page,
        BlockType::Line,
        BlockType::Word,
        BlockType::Table,
        BlockType::Cell,
        BlockType::MergedCell,
        BlockType::KeyValueSet,
        BlockType::SelectionElement,
    ] {
        let count = graph.of_type(block_type).count();
        if count > 0 {
            println!("  {:?}: {}", block_type, count);
        }
    }

    let processed = DocumentProcessor::new().process(&graph, &input.display().to_string(), &file_stem(input))?;
    let stats = &processed.stats;

    println!();
    println!("{}", "Extraction Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "Pages".bold(), stats.page_count);
    println!(
        "{}: {} found, {} spatial, {} structural, {} skipped",
        "Tables".bold(),
        stats.table_count,
        stats.spatial_table_count,
        stats.structural_table_count,
        stats.skipped_table_count
    );
    for table in &processed.tables.tables {
        let detail = match &table.grid {
            Some(grid) => format!(
                "{} x {} ({:?})",
                grid.row_count(),
                grid.column_count(),
                grid.provenance
            ),
            None => "skipped".dimmed().to_string(),
        };
        println!("  {} {}", table.label().dimmed(), detail);
    }
    println!("{}: {}", "Form fields".bold(), stats.key_value_count);
    println!("{}: {}", "Lines".bold(), stats.line_count);
    println!("{}: {}", "Words".bold(), stats.word_count);
    println!("{}: {}", "CSV rows".bold(), processed.rows.len());

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_job(
    event: &Path,
    blocks_dir: &Path,
    output: &Path,
    prefix: &str,
    bucket: Option<String>,
    webhook_url: Option<String>,
    webhook_secret: Option<String>,
    extract: &ExtractArgs,
) -> CliResult<()> {
    let event = fs::read_to_string(event)?;
    let runtime = runtime()?;

    let mut sink = FsArtifactSink::new(output);
    if let Some(bucket) = bucket {
        sink = sink.with_bucket(bucket);
    }

    let mut runner = JobRunner::new(Arc::new(FileBlockSource::new(blocks_dir)), Arc::new(sink))
        .with_processor(extract.processor(&runtime)?)
        .with_layout(OutputLayout::new(prefix));

    if let Some(url) = webhook_url {
        let notifier = WebhookNotifier::new(url, webhook_secret, runtime.clone())?;
        runner = runner.with_notifier(Arc::new(notifier));
    } else {
        log::info!("No webhook URL configured, skipping webhook");
    }

    let outcome = runner.handle_event(&event)?;

    let label = match outcome.status {
        JobStatus::Processed => "Processed".green().bold(),
        JobStatus::AnalysisFailed => "Analysis failed".yellow().bold(),
        JobStatus::NoContent => "No content".yellow().bold(),
        JobStatus::ProcessingFailed => "Processing failed".red().bold(),
    };
    println!("{} job {}", label, outcome.payload.textract_job_id);
    println!("{}", serde_json::to_string_pretty(&outcome.payload)?);

    if outcome.status == JobStatus::ProcessingFailed {
        let message = outcome.payload.error_message.unwrap_or_default();
        return Err(ocrtable::Error::JobFailed(message).into());
    }
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "ocrtable".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("OCR table reconstruction tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/ocrtable".dimmed());
    println!("License: MIT");
}

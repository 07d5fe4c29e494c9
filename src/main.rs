use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use dep_judge::cli;
use dep_judge::domain::edge::DepKind;
use dep_judge::domain::query::QueryMode;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "djtool",
    version,
    about = "Grade language-model dependency reasoning against static-analysis ground truth"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score collected model responses and produce a summary report
    Evaluate {
        /// Corpus root containing per-language label and scan files
        #[arg(long)]
        corpus: PathBuf,
        /// JSONL response file, or directory of response files
        #[arg(long)]
        responses: PathBuf,
        /// Restrict to one task (data, control, infoflow)
        #[arg(long)]
        task: Option<String>,
        /// Restrict to one language
        #[arg(long)]
        language: Option<String>,
        /// Restrict to one mode (source, trace)
        #[arg(long)]
        mode: Option<String>,
        /// Lite subset file restricting evaluation scope
        #[arg(long)]
        lite: Option<PathBuf>,
        /// Write per-instance results as JSONL
        #[arg(long)]
        out: Option<PathBuf>,
        /// Write the summary report as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Print a corpus summary
    Inspect {
        /// Corpus root containing per-language label and scan files
        #[arg(long)]
        corpus: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    match args.command {
        Command::Evaluate {
            corpus,
            responses,
            task,
            language,
            mode,
            lite,
            out,
            csv,
        } => {
            let task = task
                .as_deref()
                .map(|s| DepKind::parse(s).ok_or_else(|| anyhow!("Unknown task: {s}")))
                .transpose()?;
            let mode = mode
                .as_deref()
                .map(|s| QueryMode::parse(s).ok_or_else(|| anyhow!("Unknown mode: {s}")))
                .transpose()?;
            cli::run_evaluate(
                &corpus,
                &responses,
                task,
                language.as_deref(),
                mode,
                lite.as_deref(),
                out.as_deref(),
                csv.as_deref(),
            )
        }
        Command::Inspect { corpus } => cli::run_inspect(&corpus),
    }
}

//! TED Ingest - procurement notice extraction tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use ted_common::logging::{init_logging, LogConfig, LogLevel};
use ted_common::types::{MonthRange, YearMonth};
use ted_ingest::config::{ExtractConfig, DEFAULT_DATA_DIR, DEFAULT_JOBS};
use ted_ingest::corpus::{CorpusBuilder, UnicodeSegmenter};
use ted_ingest::{output, progress, CpvFilter, Extractor};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "ted-ingest")]
#[command(author, version, about = "Extract TED procurement notices to CSV")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transform monthly packages in the data directory to a CSV file
    Extract {
        /// First month to process (YYYY-MM)
        start: YearMonth,

        /// Last month to process (YYYY-MM)
        end: YearMonth,

        /// Output CSV file, `-` for stdout
        output: PathBuf,

        /// CPV codes to keep: 2 to 5 digit prefixes or full codes
        cpv: Vec<String>,

        /// Directory holding YYYY-MM.tar.gz packages
        #[arg(long, env = "TED_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Monthly packages processed concurrently
        #[arg(short, long, env = "TED_JOBS", default_value_t = DEFAULT_JOBS)]
        jobs: usize,

        /// Write a JSON run summary to this file
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Extract sentences from rows matching the CPV codes, one per line
    Corpus {
        /// CSV file written by `extract`
        input: PathBuf,

        /// Output text file, `-` for stdout
        output: PathBuf,

        /// CPV codes to keep; all rows when omitted
        cpv: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("ted-ingest")
        .build()
        .merge_env()?;
    let _guard = init_logging(&log_config)?;

    match cli.command {
        Command::Extract {
            start,
            end,
            output,
            cpv,
            data_dir,
            jobs,
            summary,
        } => {
            let range = MonthRange::new(start, end)?;
            let config = ExtractConfig::new(range)
                .with_data_dir(data_dir)
                .with_jobs(jobs)
                .with_cpv(cpv);
            extract(config, &output, summary.as_deref()).await?;
        },
        Command::Corpus { input, output, cpv } => {
            corpus(&input, &output, &cpv)?;
        },
    }

    Ok(())
}

async fn extract(config: ExtractConfig, output: &Path, summary_path: Option<&Path>) -> Result<()> {
    config.validate(YearMonth::current())?;
    info!(
        start = %config.range.start(),
        end = %config.range.end(),
        data_dir = %config.data_dir.display(),
        cpv = ?config.cpv,
        "Extracting notices"
    );

    let writer = output::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let spinner = progress::member_spinner();
    let cancel = CancellationToken::new();
    let extractor = Extractor::new(config.cpv_filter()?, writer)
        .with_cancellation(cancel.clone())
        .with_progress(spinner.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current notice");
            cancel.cancel();
        }
    });

    let result = extractor
        .run_parallel(&config.data_dir(), config.range, config.jobs)
        .await;
    spinner.finish_and_clear();
    let summary = result?;
    extractor.finish()?;

    if let Some(path) = summary_path {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write summary {}", path.display()))?;
    }

    info!(
        members = summary.members,
        notices = summary.notices,
        rows = summary.rows,
        malformed = summary.malformed,
        schema_violations = summary.schema_violations,
        missing_months = summary.missing_months,
        "Extraction complete"
    );
    if summary.cancelled {
        warn!("Run was cancelled, output is incomplete");
    }
    Ok(())
}

fn corpus(input: &Path, output: &Path, cpv: &[String]) -> Result<()> {
    let codes = CpvFilter::new(cpv)?.allow_list().to_vec();
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?,
    );
    let writer: Box<dyn Write> = if output.as_os_str() == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        Box::new(BufWriter::new(
            File::create(output).with_context(|| format!("Failed to create {}", output.display()))?,
        ))
    };

    let spinner = progress::row_spinner("Reading rows");
    let report = CorpusBuilder::new(Box::new(UnicodeSegmenter), codes)
        .with_progress(spinner.clone())
        .build(reader, writer)?;
    spinner.finish_and_clear();

    eprintln!(
        "{} unique sentences ({} total sentences) from {} non-empty rows ({} total rows) with CPV {}",
        report.unique_sentences,
        report.total_sentences,
        report.non_empty_rows,
        report.matching_rows,
        cpv.join(" ")
    );
    for column in &report.columns {
        eprintln!("{:<34} {:>8}", column.column, column.sentences);
    }
    Ok(())
}

//! Partition probabilities CLI.
//!
//! The `pp-core` binary handles:
//! - Aggregating anomaly records into per-partition maximum score summaries
//! - Looking up a partition's maximum score in a stored summary
//! - Converting summaries between the JSON document and binary stream forms
//! - Computing result ids for a job bucket

use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pp_common::config::LoadedSettings;
use pp_common::error::format_error_human;
use pp_common::id::validate_job_id;
use pp_common::{ConfigResolver, Error, OutputFormat, ResultId, Result, StructuredError};
use pp_core::codec::{document, stream};
use pp_core::exit_codes::ExitCode;
use pp_core::logging::{generate_run_id, init_logging, LogConfig, LogFormat};
use pp_core::probabilities::timestamp_from_millis;
use pp_core::{AnomalyRecord, PartitionMaxAggregator, PerPartitionMaxProbabilities};
use tracing::{debug, info, warn};

/// Per-partition maximum record scores for anomaly detection jobs
#[derive(Parser)]
#[command(name = "pp-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Settings file (overrides PARTITION_PROBS_CONFIG and the XDG location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format [default: from settings, else json]
    #[arg(long, short = 'f', global = true)]
    format: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format for stderr
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Reduce a batch of anomaly records to per-partition maximum scores
    Aggregate(AggregateArgs),

    /// Print the maximum score stored for one partition value
    Lookup(LookupArgs),

    /// Re-encode a stored summary in the selected output format
    Convert(ConvertArgs),

    /// Print the result id for a job bucket
    Id(IdArgs),
}

#[derive(Args, Debug)]
struct AggregateArgs {
    /// Records file: a JSON array, or one record per line for `.jsonl`; `-` reads stdin
    #[arg(long, default_value = "-")]
    records: String,

    /// Job id [default: job id of the first record]
    #[arg(long)]
    job_id: Option<String>,

    /// Bucket timestamp, epoch milliseconds or RFC 3339 [default: first record]
    #[arg(long)]
    timestamp: Option<String>,

    /// Bucket span in seconds [default: first record, then settings]
    #[arg(long)]
    bucket_span: Option<u64>,
}

#[derive(Args, Debug)]
struct LookupArgs {
    /// Stored summary file; `-` reads stdin
    #[arg(long)]
    summary: String,

    /// Partition value to look up (exact match)
    #[arg(long)]
    partition: String,

    /// Encoding of the summary file
    #[arg(long, value_enum, default_value_t = InputFormat::Json)]
    input_format: InputFormat,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Stored summary file; `-` reads stdin
    #[arg(long)]
    input: String,

    /// Encoding of the input
    #[arg(long, value_enum, default_value_t = InputFormat::Json)]
    from: InputFormat,
}

#[derive(Args, Debug)]
struct IdArgs {
    #[arg(long)]
    job_id: String,

    /// Bucket timestamp, epoch milliseconds or RFC 3339
    #[arg(long)]
    timestamp: String,

    /// Bucket span in seconds
    #[arg(long)]
    bucket_span: u64,
}

/// Encoding of a stored summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    Json,
    Binary,
}

fn main() {
    let cli = Cli::parse();

    let log_level = LogConfig::level_from_verbosity(cli.global.verbose, cli.global.quiet);
    init_logging(&LogConfig::from_env(log_level, cli.global.log_format));

    let run_id = generate_run_id();
    let span = tracing::info_span!("run", run_id = %run_id);
    let _guard = span.enter();

    let exit_code = match ConfigResolver::new(cli.global.config.clone()).load() {
        Ok(loaded) => {
            info!(
                resolution = %loaded.source.resolution,
                path = loaded.source.path.as_deref().unwrap_or("<defaults>"),
                hash = loaded.source.hash.as_deref().unwrap_or("-"),
                "settings loaded"
            );
            let format = cli.global.format.unwrap_or(loaded.settings.output_format);
            run(&cli, &loaded, format).unwrap_or_else(|err| fail(&cli.global, format, &err))
        }
        // Settings never loaded, so only the flag or the built-in default applies.
        Err(err) => fail(&cli.global, cli.global.format.unwrap_or_default(), &err),
    };

    if exit_code.is_error() {
        info!(exit_code = exit_code.as_i32(), code_name = exit_code.code_name(), "run failed");
    } else {
        debug!(exit_code = exit_code.as_i32(), code_name = exit_code.code_name(), "run finished");
    }
    std::process::exit(exit_code.as_i32());
}

fn run(cli: &Cli, loaded: &LoadedSettings, format: OutputFormat) -> Result<ExitCode> {
    match &cli.command {
        Commands::Aggregate(args) => run_aggregate(loaded, format, args),
        Commands::Lookup(args) => run_lookup(format, args),
        Commands::Convert(args) => run_convert(format, args),
        Commands::Id(args) => run_id(format, args),
    }
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_aggregate(loaded: &LoadedSettings, format: OutputFormat, args: &AggregateArgs) -> Result<ExitCode> {
    let records = read_records(&args.records)?;
    let first = records.first();

    let job_id = match (&args.job_id, first) {
        (Some(job_id), _) => job_id.clone(),
        (None, Some(record)) => record.job_id.clone(),
        (None, None) => {
            return Err(Error::InvalidArgument(
                "--job-id is required when the record batch is empty".to_string(),
            ))
        }
    };
    let timestamp = match (&args.timestamp, first) {
        (Some(raw), _) => parse_timestamp_arg(raw)?,
        (None, Some(record)) => record.timestamp,
        (None, None) => {
            return Err(Error::InvalidArgument(
                "--timestamp is required when the record batch is empty".to_string(),
            ))
        }
    };
    let bucket_span = args
        .bucket_span
        .or_else(|| first.map(|r| r.bucket_span))
        .unwrap_or(loaded.settings.default_bucket_span);

    let foreign = records.iter().filter(|r| r.job_id != job_id).count();
    if foreign > 0 {
        warn!(job_id = %job_id, foreign, "records from other jobs included in aggregation");
    }

    let mut aggregator = PartitionMaxAggregator::new();
    aggregator.observe_all(&records);
    if aggregator.skipped() > 0 {
        info!(
            skipped = aggregator.skipped(),
            observed = aggregator.observed(),
            "records without a partition or with a non-finite score were skipped"
        );
    }
    let summary = aggregator.finish(job_id, timestamp, bucket_span)?;

    write_summary(&summary, format)?;
    Ok(ExitCode::Clean)
}

fn run_lookup(format: OutputFormat, args: &LookupArgs) -> Result<ExitCode> {
    let summary = read_summary(&args.summary, args.input_format)?;
    let score = summary.lookup(&args.partition);

    let mut out = io::stdout().lock();
    if format.is_human() {
        match score {
            Some(score) => writeln!(out, "{}", score)?,
            None => writeln!(out, "partition [{}] not found in {}", args.partition, summary.id())?,
        }
    } else {
        let body = serde_json::json!({
            "id": summary.id().as_str(),
            "partition_value": args.partition,
            "found": score.is_some(),
            "max_record_score": score,
        });
        writeln!(out, "{}", body)?;
    }

    Ok(match score {
        Some(_) => ExitCode::Clean,
        None => ExitCode::NotFound,
    })
}

fn run_convert(format: OutputFormat, args: &ConvertArgs) -> Result<ExitCode> {
    let summary = read_summary(&args.input, args.from)?;
    write_summary(&summary, format)?;
    Ok(ExitCode::Clean)
}

fn run_id(format: OutputFormat, args: &IdArgs) -> Result<ExitCode> {
    validate_job_id(&args.job_id)?;
    let timestamp = parse_timestamp_arg(&args.timestamp)?;
    let id = ResultId::for_bucket(&args.job_id, timestamp.timestamp_millis(), args.bucket_span);

    let mut out = io::stdout().lock();
    if format.is_human() {
        writeln!(out, "{}", id)?;
    } else {
        writeln!(out, "{}", serde_json::json!({ "id": id.as_str() }))?;
    }
    Ok(ExitCode::Clean)
}

// ============================================================================
// Input / output helpers
// ============================================================================

fn read_input(path: &str) -> Result<Vec<u8>> {
    if path == "-" {
        let mut buf = Vec::new();
        io::stdin().lock().read_to_end(&mut buf)?;
        return Ok(buf);
    }
    Ok(fs::read(path)?)
}

fn read_records(path: &str) -> Result<Vec<AnomalyRecord>> {
    let bytes = read_input(path)?;
    let is_jsonl = Path::new(path)
        .extension()
        .map(|ext| ext == "jsonl")
        .unwrap_or(false);

    let records: Vec<AnomalyRecord> = if is_jsonl {
        bytes
            .split(|&b| b == b'\n')
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .map(|line| serde_json::from_slice::<AnomalyRecord>(line))
            .collect::<std::result::Result<Vec<_>, _>>()?
    } else {
        serde_json::from_slice(&bytes)?
    };

    debug!(path, records = records.len(), "records loaded");
    Ok(records)
}

fn read_summary(path: &str, encoding: InputFormat) -> Result<PerPartitionMaxProbabilities> {
    let bytes = read_input(path)?;
    match encoding {
        InputFormat::Binary => stream::decode(&bytes),
        InputFormat::Json => document::from_slice(&bytes),
    }
}

fn write_summary(summary: &PerPartitionMaxProbabilities, format: OutputFormat) -> Result<()> {
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Json => writeln!(out, "{}", document::to_string_pretty(summary)?)?,
        OutputFormat::Binary => out.write_all(&stream::encode(summary)?)?,
        OutputFormat::Summary => {
            writeln!(
                out,
                "{} ({} partitions, bucket span {}s)",
                summary.id(),
                summary.len(),
                summary.bucket_span()
            )?;
            for probability in summary.partition_probabilities() {
                writeln!(
                    out,
                    "  {}\t{}",
                    probability.partition_value(),
                    probability.max_record_score()
                )?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// Parse a timestamp flag given as epoch milliseconds or RFC 3339.
fn parse_timestamp_arg(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(millis) = raw.parse::<i64>() {
        return timestamp_from_millis("--timestamp", millis)
            .map_err(|e| Error::InvalidArgument(e.to_string()));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            Error::InvalidArgument(format!(
                "--timestamp [{}] is neither epoch milliseconds nor RFC 3339: {}",
                raw, e
            ))
        })
}

/// Report `err` on stderr in the style of the resolved output format.
fn fail(global: &GlobalOpts, format: OutputFormat, err: &Error) -> ExitCode {
    let code = ExitCode::from_error(err);
    match format {
        OutputFormat::Json => {
            let structured =
                StructuredError::from(err).with_context("exit_code", code.code_name());
            eprintln!("{}", structured.to_json());
        }
        _ => {
            let use_color = !global.no_color && io::stderr().is_terminal();
            eprintln!("{}", format_error_human(err, use_color));
        }
    }
    code
}

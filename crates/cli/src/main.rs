//! sqldedup CLI
//!
//! Find and remove duplicate user records in SQL dumps

mod config;
mod progress;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use sqldedup_core::{
    audit_duplicates, report_email_duplicates, DedupContext, DedupMode, DuplicateMatch,
    KeyDeduplicator, RemovalPass,
};
use sqldedup_formats::{write_text, RecordExtractor, RecordSchema, SqlDump};
use std::fs::File;
use std::io::{BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{Action, JobConfig};
use progress::ProgressReporter;

#[derive(Parser)]
#[command(name = "sqldedup")]
#[command(version, about = "Find and remove duplicate user records in SQL dumps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output results in JSON format
    #[arg(long, global = true)]
    json: bool,
}

/// Where records come from and how they are recognised
#[derive(Args)]
struct InputArgs {
    /// SQL dump file (`.gz` is decompressed)
    #[arg(short, long)]
    input: PathBuf,

    /// Record schema: lenient or strict
    #[arg(long, default_value = "lenient")]
    schema: RecordSchema,

    /// Only consider lines containing this email-domain marker (repeatable)
    #[arg(short, long = "domain", value_name = "MARKER")]
    domains: Vec<String>,

    /// Compare trimmed, lower-cased keys
    #[arg(short, long)]
    normalize: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report records that share an email
    Report {
        #[command(flatten)]
        source: InputArgs,
    },

    /// Remove duplicate record lines, keeping the first occurrence
    Remove {
        #[command(flatten)]
        source: InputArgs,

        /// Key deciding a duplicate: email, username or either
        #[arg(short, long, default_value = "either")]
        by: DedupMode,

        /// Output file (defaults to <stem>_cleaned.<ext> next to the input)
        #[arg(short, long, conflicts_with = "in_place")]
        output: Option<PathBuf>,

        /// Overwrite the input file
        #[arg(long)]
        in_place: bool,

        /// Write one JSON line per removed duplicate to this file
        #[arg(long, value_name = "FILE")]
        removed: Option<PathBuf>,

        /// Show statistics without writing output
        #[arg(long)]
        dry_run: bool,
    },

    /// List every duplicate email and username relationship
    Audit {
        #[command(flatten)]
        source: InputArgs,
    },

    /// Count lines and records in a dump
    Count {
        #[command(flatten)]
        source: InputArgs,
    },

    /// Run a job described by a config file (YAML or TOML)
    Run {
        /// Job config file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Resolved input settings shared by every command
struct Source {
    input: PathBuf,
    extractor: RecordExtractor,
    normalize: bool,
}

impl From<InputArgs> for Source {
    fn from(args: InputArgs) -> Self {
        Self {
            extractor: RecordExtractor::new(args.schema).with_domains(args.domains),
            input: args.input,
            normalize: args.normalize,
        }
    }
}

struct RemoveOptions {
    mode: DedupMode,
    output: Option<PathBuf>,
    in_place: bool,
    removed_log: Option<PathBuf>,
    dry_run: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout is reserved for reports
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_ansi(!cli.json && std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Report { source } => report(&source.into(), cli.json)?,
        Commands::Remove {
            source,
            by,
            output,
            in_place,
            removed,
            dry_run,
        } => {
            let options = RemoveOptions {
                mode: by,
                output,
                in_place,
                removed_log: removed,
                dry_run,
            };
            remove(&source.into(), &options, cli.json)?;
        }
        Commands::Audit { source } => audit(&source.into(), cli.json)?,
        Commands::Count { source } => count(&source.into(), cli.json)?,
        Commands::Run { config } => run_job(&config, cli.json)?,
        Commands::Completions { shell } => generate_completions(shell),
    }

    Ok(())
}

fn load_dump(path: &Path) -> Result<SqlDump> {
    SqlDump::open(path).with_context(|| format!("Failed to read dump: {}", path.display()))
}

fn report(source: &Source, json_output: bool) -> Result<()> {
    info!("Reporting duplicate emails");
    info!("  Input: {:?}", source.input);

    let dump = load_dump(&source.input)?;
    let report = report_email_duplicates(&dump, &source.extractor, source.normalize);

    if json_output {
        let groups: Vec<_> = report.duplicates().collect();
        let json = serde_json::json!({
            "input": source.input.to_string_lossy().to_string(),
            "total_records": report.total_records(),
            "unique_emails": report.unique_emails(),
            "duplicate_groups": groups,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        print!("{}", report.render());
    }

    Ok(())
}

/// Derive the default cleaned path from the input path.
///
/// Examples:
///   db.sql     → db_cleaned.sql
///   db.sql.gz  → db_cleaned.sql.gz
fn cleaned_path(input: &Path) -> PathBuf {
    let name = input.file_name().unwrap_or_default().to_string_lossy();
    let (base, gz) = match name.strip_suffix(".gz") {
        Some(base) => (base, ".gz"),
        None => (&*name, ""),
    };

    let cleaned = match base.rfind('.') {
        Some(dot) if dot > 0 => format!("{}_cleaned{}{}", &base[..dot], &base[dot..], gz),
        _ => format!("{}_cleaned{}", base, gz),
    };
    input.with_file_name(cleaned)
}

/// Where the cleaned body goes; `None` for a dry run
fn resolve_output(input: &Path, options: &RemoveOptions) -> Option<PathBuf> {
    if options.dry_run {
        None
    } else if options.in_place {
        Some(input.to_path_buf())
    } else {
        Some(
            options
                .output
                .clone()
                .unwrap_or_else(|| cleaned_path(input)),
        )
    }
}

fn write_removed_log(path: &Path, matches: &[DuplicateMatch]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create removed log: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for m in matches {
        writeln!(writer, "{}", serde_json::to_string(m)?)?;
    }
    writer.flush()?;
    Ok(())
}

fn remove(source: &Source, options: &RemoveOptions, json_output: bool) -> Result<()> {
    let output = resolve_output(&source.input, options);

    info!("Starting duplicate removal");
    info!("  Input: {:?}", source.input);
    if let Some(ref path) = output {
        info!("  Output: {:?}", path);
    }
    info!("  By: {}", options.mode);
    info!("  Normalize: {}", source.normalize);

    let dump = load_dump(&source.input)?;

    let mut ctx = DedupContext::new();
    let deduplicator = KeyDeduplicator::new(options.mode).with_normalization(source.normalize);
    let progress = ProgressReporter::new(dump.line_count() as u64, json_output);

    let mut pass = RemovalPass::new(&source.extractor, deduplicator, &mut ctx);
    for (idx, line) in dump.lines().enumerate() {
        pass.feed(idx + 1, line);

        if (idx + 1) % 1000 == 0 {
            progress.update(idx + 1, pass.stats().total_seen, pass.removed_count());
        }
    }
    progress.update(pass.lines_seen(), pass.stats().total_seen, pass.removed_count());
    progress.finish();

    let outcome = pass.finish(&dump);

    if let Some(ref path) = output {
        write_text(path, &outcome.body)
            .with_context(|| format!("Failed to write output: {}", path.display()))?;
    }

    let removed_log = if options.dry_run {
        None
    } else {
        options.removed_log.as_deref()
    };
    if let Some(path) = removed_log {
        write_removed_log(path, &outcome.matches)?;
    }

    if json_output {
        let report = serde_json::json!({
            "input": source.input.to_string_lossy().to_string(),
            "output": output.as_ref().map(|p| p.to_string_lossy().to_string()),
            "removed_output": removed_log.map(|p| p.to_string_lossy().to_string()),
            "by": options.mode,
            "total_records": outcome.stats.total_seen,
            "unique_records": outcome.stats.unique_count,
            "duplicates_removed": outcome.removed_count(),
            "deduplication_rate": outcome.stats.dedup_rate(),
            "removed_lines": outcome.removed_lines,
            "dry_run": options.dry_run,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        progress::print_summary_report(
            &source.input,
            output.as_deref(),
            outcome.stats.total_seen,
            outcome.removed_count(),
        );
        if let Some(path) = removed_log {
            println!("  Removed records: {:?} ({} entries)", path, outcome.matches.len());
        }
    }

    Ok(())
}

fn audit(source: &Source, json_output: bool) -> Result<()> {
    info!("Auditing duplicate emails and usernames");
    info!("  Input: {:?}", source.input);

    let dump = load_dump(&source.input)?;
    let mut ctx = DedupContext::new();
    let found = audit_duplicates(&dump, &source.extractor, source.normalize, &mut ctx);

    if json_output {
        let json = serde_json::json!({
            "input": source.input.to_string_lossy().to_string(),
            "duplicates": found,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if found.is_empty() {
        println!("No duplicates found!");
        return Ok(());
    }

    for m in &found {
        println!(
            "Line {}: duplicate {} '{}' ({}), first seen on line {}",
            m.duplicate_line, m.kind, m.value, m.name, m.original_line
        );
    }
    println!(
        "\nFound {} duplicate relationships",
        progress::format_with_commas(found.len())
    );

    Ok(())
}

fn count(source: &Source, json_output: bool) -> Result<()> {
    info!("Counting records in: {:?}", source.input);

    let dump = load_dump(&source.input)?;
    let records = dump.records(&source.extractor).count();

    if json_output {
        let json = serde_json::json!({
            "input": source.input.to_string_lossy().to_string(),
            "total_lines": dump.line_count(),
            "total_records": records,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("Total lines: {}", progress::format_with_commas(dump.line_count()));
        println!("Total records: {}", progress::format_with_commas(records));
    }

    Ok(())
}

fn run_job(config_path: &Path, json_output: bool) -> Result<()> {
    info!("Running job from {:?}", config_path);

    let job = JobConfig::load(config_path)?;
    let source = Source {
        input: PathBuf::from(&job.input.path),
        extractor: RecordExtractor::new(job.input.schema).with_domains(job.input.domains.clone()),
        normalize: job.dedup.normalize,
    };

    match job.dedup.action {
        Action::Report => report(&source, json_output),
        Action::Audit => audit(&source, json_output),
        Action::Remove => {
            let output = job.output.unwrap_or_default();
            let options = RemoveOptions {
                mode: job.dedup.by,
                output: output.path.map(PathBuf::from),
                in_place: output.in_place,
                removed_log: output.removed_log.map(PathBuf::from),
                dry_run: output.dry_run,
            };
            remove(&source, &options, json_output)
        }
    }
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
}

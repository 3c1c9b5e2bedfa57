use clap::Parser;
use std::path::Path;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use dirbak::config::{self, Config};
use dirbak::fs_utils::{self, ExcludeSet};
use dirbak::naming;
use dirbak::process::{self, BackupJob};
use dirbak::shell_exec::execute_and_stream_command;

#[derive(Parser, Debug)]
#[command(author, version, about = "DirBak directory backup tool", long_about = None)]
pub struct Cli {
    /// Output directory for archives (can be defined via config/env)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Include time of day in archive file names
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub with_time: bool,

    /// Dry run (just list jobs and files)
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    pub dry: bool,

    /// Command to execute before the run
    #[arg(short, long)]
    pub before: Option<String>,

    /// Command to execute after the run
    #[arg(short, long)]
    pub after: Option<String>,

    /// Patterns to exclude at any depth (can be specified multiple times)
    #[arg(short = 'e', long)]
    pub exclude: Vec<String>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    pub verbose: bool,

    /// Generate YAML config to stdout
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub generate_yaml_config: bool,

    /// Source directories to back up
    #[arg()]
    pub paths: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    // Step 1: Read environment
    let env_config = config::read_env();

    // Step 2: Read config file (if exists)
    let mut file_config = Config::default();
    if let Some(path) = cli.config.clone().or(env_config.config.clone()) {
        file_config = config::read_config_file(&path)?;
    }

    // Step 3: Merge configs: env < file < CLI
    let merged = config::merge_configs(env_config, file_config, cli_to_config(&cli));

    // Validate required fields (after merging all sources)
    let output = merged.output.clone().unwrap_or_default();
    if output.is_empty() {
        eprintln!("Error: output directory (--output or config:output or DIRBAK_OUTPUT) is required");
        std::process::exit(2);
    }

    let paths = merged.paths.clone().unwrap_or_default();
    if paths.is_empty() {
        eprintln!(
            "Error: at least one source directory must be provided (CLI argument, config:paths, or DIRBAK_PATHS)"
        );
        std::process::exit(3);
    }

    // Scheduled invocations have no meaningful working directory, so
    // relative paths are rejected outright.
    for p in paths.iter().chain(std::iter::once(&output)) {
        if !Path::new(p).is_absolute() {
            eprintln!("Error: all configured paths must be absolute, got: {p}");
            std::process::exit(4);
        }
    }

    // Generate YAML config if requested
    if cli.generate_yaml_config {
        let yaml = serde_yaml::to_string(&merged)?;
        println!("{yaml}");
        return Ok(());
    }

    let jobs = process::jobs_from_config(&merged);

    // Dry run: list jobs, resolved destinations and entries
    if merged.dry.unwrap_or(false) {
        return dry_run(&merged, &jobs);
    }

    if let Some(cmd) = merged.before.as_deref() {
        execute_and_stream_command(cmd)?;
    }

    let results = process::run_jobs(&jobs, merged.with_time.unwrap_or(false));

    if let Some(cmd) = merged.after.as_deref() {
        execute_and_stream_command(cmd)?;
    }

    if results.iter().any(|r| !r.success()) {
        std::process::exit(1);
    }
    Ok(())
}

fn dry_run(config: &Config, jobs: &[BackupJob]) -> anyhow::Result<()> {
    println!("--- DRY RUN ---");
    println!("{}", serde_yaml::to_string(config)?);

    let with_time = config.with_time.unwrap_or(false);
    let mut total_files = 0usize;
    let mut total_bytes = 0u64;

    for job in jobs {
        if !job.source_path.is_dir() {
            println!(
                "{}: missing or not a directory, would be skipped",
                job.source_path.display()
            );
            continue;
        }

        let name = naming::archive_file_name(&job.source_path, &chrono::Local::now(), with_time)?;
        let excludes = ExcludeSet::compile(&job.exclude_patterns)?;
        let entries = fs_utils::collect_entries(&job.source_path, &excludes)?;
        let bytes = fs_utils::total_size(&entries)?;
        let files = entries.iter().filter(|e| e.path.is_file()).count();

        println!(
            "{} -> {} ({} files, {})",
            job.source_path.display(),
            job.output_dir.join(name).display(),
            files,
            fs_utils::encode_size(bytes)
        );
        for entry in &entries {
            println!("  {}", entry.name_in_archive);
        }

        total_files += files;
        total_bytes += bytes;
    }

    println!("Total files: {total_files}");
    println!("Total size: {}", fs_utils::encode_size(total_bytes));
    Ok(())
}

fn init_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dirbak=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();
}

/// Converts CLI struct into Config
fn cli_to_config(cli: &Cli) -> Config {
    Config {
        output: cli.output.clone(),
        config: cli.config.clone(),
        dry: if cli.dry { Some(true) } else { None },
        with_time: if cli.with_time { Some(true) } else { None },
        before: cli.before.clone(),
        after: cli.after.clone(),
        paths: if cli.paths.is_empty() {
            None
        } else {
            Some(cli.paths.clone())
        },
        exclude: if cli.exclude.is_empty() {
            None
        } else {
            Some(cli.exclude.clone())
        },
    }
}

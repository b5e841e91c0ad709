//! Release hooks CLI
//!
//! Entry point for the `release-hooks` command-line tool.

use clap::{Parser, Subcommand};
use release_hooks::config::{
    discover_repo_config, write_defaults, ConfigError, ConfigLayers, ConfigOrigin,
    EffectiveConfig, FormatRegistry, InitOutcome,
};
use release_hooks::timeout::hook_timeout;
use release_hooks::{
    EngineOptions, Environment, ExecutionEvent, MissingKeyPolicy, Outcome, Phase,
    ReleaseError, ReleasePipeline, RunKind, RunResult, ShellRunner,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "release-hooks")]
#[command(about = "Merge release configuration and run lifecycle hooks", version)]
struct Cli {
    /// Extra config fragment; later files take priority (repeatable)
    #[arg(long, short = 'c', global = true)]
    config: Vec<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the merged configuration as JSON
    Config {
        /// Show sensitive values instead of redacting them
        #[arg(long)]
        full: bool,
    },

    /// Run the hooks of one phase for an event
    Run {
        /// Phase to run (before, after)
        #[arg(long)]
        phase: Phase,

        /// Event name, e.g. "release" or "publish"
        #[arg(long)]
        event: String,

        /// Outcome of the guarded operation (success, failure)
        #[arg(long)]
        outcome: Option<Outcome>,

        /// Platform tag matched by hook filters
        #[arg(long)]
        platform: Option<String>,

        /// Treat this run as a snapshot
        #[arg(long, conflicts_with = "prerelease")]
        snapshot: bool,

        /// Treat this run as a prerelease
        #[arg(long)]
        prerelease: bool,

        /// Resolve missing placeholders to empty strings
        #[arg(long)]
        lenient: bool,

        /// Default per-hook timeout in seconds
        #[arg(long)]
        timeout: Option<i64>,

        /// Run the phase once per configured distribution
        #[arg(long)]
        all_distributions: bool,
    },

    /// Write the default configuration file
    Init {
        /// Output format (see `formats`)
        #[arg(long, short = 'f', default_value = "toml")]
        format: String,

        /// Replace an existing file
        #[arg(long)]
        overwrite: bool,

        /// Target directory (default: current directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// List supported configuration formats
    Formats,
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let registry = FormatRegistry::builtin();
    let result = match cli.command {
        Commands::Config { full } => run_config(&cli.config, &registry, full),
        Commands::Run {
            phase,
            event,
            outcome,
            platform,
            snapshot,
            prerelease,
            lenient,
            timeout,
            all_distributions,
        } => {
            let run_kind = if snapshot {
                Some(RunKind::Snapshot)
            } else if prerelease {
                Some(RunKind::Prerelease)
            } else {
                None
            };
            let mut event = match outcome {
                Some(outcome) => ExecutionEvent::after(event, outcome).in_phase(phase),
                None => ExecutionEvent::before(event).in_phase(phase),
            };
            event.platform = platform;
            let policy = if lenient {
                MissingKeyPolicy::Lenient
            } else {
                MissingKeyPolicy::Strict
            };
            run_hooks(
                &cli.config,
                &registry,
                run_kind,
                event,
                policy,
                timeout,
                all_distributions,
            )
        }
        Commands::Init {
            format,
            overwrite,
            dir,
        } => run_init(&registry, &format, overwrite, dir),
        Commands::Formats => {
            for handler in registry.handlers() {
                println!("{:<6} {}", handler.id, handler.extensions.join(", "));
            }
            Ok(())
        }
    };

    if let Err(e) = result {
        report(&e);
        process::exit(e.exit_code());
    }
}

fn report(err: &ReleaseError) {
    eprintln!("Error: {}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
}

/// Host config under `$XDG_CONFIG_HOME/release-hooks` or `~/.config/release-hooks`
fn host_config(registry: &FormatRegistry) -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;
    let dir = base.join("release-hooks");
    registry
        .extensions()
        .map(|ext| dir.join(format!("config.{}", ext)))
        .find(|candidate| candidate.is_file())
}

fn layers(extra: &[PathBuf], registry: &FormatRegistry) -> Result<ConfigLayers, ReleaseError> {
    let mut layers = ConfigLayers::default();
    if let Some(path) = host_config(registry) {
        layers.files.push((ConfigOrigin::Host, path));
    }
    let cwd = std::env::current_dir()?;
    if let Some(path) = discover_repo_config(&cwd, registry) {
        layers.files.push((ConfigOrigin::Repo, path));
    }
    for path in extra {
        layers.files.push((ConfigOrigin::Cli, path.clone()));
    }
    Ok(layers)
}

fn run_config(extra: &[PathBuf], registry: &FormatRegistry, full: bool) -> Result<(), ReleaseError> {
    let config = EffectiveConfig::load(&layers(extra, registry)?, registry)?;
    println!("{}", config.to_json(full)?);
    Ok(())
}

fn run_hooks(
    extra: &[PathBuf],
    registry: &FormatRegistry,
    run_kind: Option<RunKind>,
    event: ExecutionEvent,
    missing_keys: MissingKeyPolicy,
    timeout: Option<i64>,
    all_distributions: bool,
) -> Result<(), ReleaseError> {
    let default_timeout = match timeout {
        Some(seconds) => Some(
            hook_timeout(seconds)
                .map_err(|e| ConfigError::ValidationError(format!("--timeout: {}", e)))?,
        ),
        None => None,
    };

    let pipeline = ReleasePipeline::load(
        &layers(extra, registry)?,
        registry,
        run_kind,
        &Environment::capture(),
    )?;
    let engine = pipeline.engine(
        ShellRunner::new(),
        EngineOptions {
            missing_keys,
            default_timeout,
        },
    );

    let phase = event.phase;
    let results: Vec<RunResult> = if all_distributions {
        let events = pipeline.target_events(&event);
        if events.is_empty() {
            tracing::warn!("no distributions configured, running once");
            vec![engine.run(phase, &event)]
        } else {
            engine
                .run_targets(phase, &events)
                .into_iter()
                .map(|(_, result)| result)
                .collect()
        }
    } else {
        vec![engine.run(phase, &event)]
    };

    let mut first_failure = None;
    for result in results {
        println!("{}", result.human_summary());
        for warning in result.warnings() {
            println!("  warning: {}: {}", warning, warning.cause);
        }
        if first_failure.is_none() {
            first_failure = result.ok().err();
        }
    }

    match first_failure {
        Some(failure) => Err(failure.into()),
        None => Ok(()),
    }
}

fn run_init(
    registry: &FormatRegistry,
    format: &str,
    overwrite: bool,
    dir: Option<PathBuf>,
) -> Result<(), ReleaseError> {
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    match write_defaults(&dir, format, overwrite, registry)? {
        InitOutcome::Written(path) => println!("Wrote {}", path.display()),
        InitOutcome::AlreadyExists(path) => {
            println!(
                "{} already exists, use --overwrite to replace it",
                path.display()
            );
        }
    }
    Ok(())
}

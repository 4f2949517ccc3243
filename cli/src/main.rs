//! CLI entrypoint for cadence
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use cadence_application::{
    AutoApproveChannel, AutoReviseChannel, HumanChannel, NoRunProgress, RunObjectiveError,
    RunObjectiveInput, RunObjectiveUseCase, RunProgressNotifier,
};
use cadence_domain::{AgentRole, FinalReport, HilMode};
use cadence_infrastructure::{
    ConfigLoader, FileConfig, FsWorkspaceStore, JsonlEventSink, RoutingGateway, TracingEventSink,
};
use cadence_presentation::{
    Cli, Command, ConsoleFormatter, ConsoleHumanChannel, HilArg, OutputFormat, ProgressReporter,
    RunArgs, SimpleProgress,
};
use clap::Parser;
use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Exit status for configuration and usage errors.
const EXIT_CONFIG: u8 = 2;
/// Conventional status for a run stopped by SIGINT.
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let log_file = cli.log_file.as_deref().or(config.logging.log_file.as_deref());
    let _guard = match init_tracing(cli.verbose, log_file) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    info!("Starting cadence");

    let outcome = match &cli.command {
        Command::Config => show_config(&cli, &config),
        Command::Run(args) => run(args, &config).await,
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_CONFIG)
        }
    }
}

/// Initialize logging based on verbosity level, optionally teeing to a file.
fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("--log-file {} has no file name", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr.and(writer))
        .init();
    Ok(Some(guard))
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    if cli.no_config {
        return Ok(ConfigLoader::load_defaults());
    }
    ConfigLoader::load(cli.config.as_ref()).context("failed to load configuration")
}

fn show_config(cli: &Cli, config: &FileConfig) -> Result<ExitCode> {
    for line in ConfigLoader::describe_sources(cli.config.as_ref()) {
        println!("{}", line);
    }
    println!();

    let issues = config.validate();
    if issues.is_empty() {
        println!("No configuration issues found.");
    } else {
        println!("Configuration issues:");
        for issue in &issues {
            println!("  {}", issue);
        }
    }
    println!();

    let chains = config.build_chains()?;
    println!("Fallback chains:");
    for role in AgentRole::ALL {
        let candidates: Vec<String> = chains
            .for_role(role)
            .iter()
            .map(|c| c.to_string())
            .collect();
        println!("  {:<10} {}", role.as_str(), candidates.join(" -> "));
    }

    let code = if issues.iter().any(|i| i.is_error()) {
        ExitCode::from(EXIT_CONFIG)
    } else {
        ExitCode::SUCCESS
    };
    Ok(code)
}

/// Split `--workspace` into a store root and a relative handle.
fn split_workspace(dir: &Path) -> Result<(PathBuf, String)> {
    let absolute = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()
            .context("cannot resolve current directory")?
            .join(dir)
    };
    if absolute.components().any(|c| c == Component::ParentDir) {
        bail!("--workspace {} must not contain '..'", dir.display());
    }
    let normalized: PathBuf = absolute.components().collect();

    let handle = normalized
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("--workspace {} names no directory", dir.display()))?;
    let root = normalized
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));
    Ok((root, handle))
}

fn hil_mode(args: &RunArgs, config: &FileConfig) -> HilMode {
    match args.hil {
        Some(HilArg::Interactive) => HilMode::Interactive,
        Some(HilArg::AutoApprove) => HilMode::AutoApprove,
        Some(HilArg::AutoRevise) => HilMode::AutoRevise,
        None => config.run.parse_hil_mode().0,
    }
}

async fn run(args: &RunArgs, config: &FileConfig) -> Result<ExitCode> {
    match config.check() {
        Ok(warnings) => {
            for issue in warnings {
                warn!("{}", issue.message);
            }
        }
        Err(e) => {
            if let cadence_infrastructure::ConfigError::Invalid(issues) = &e {
                for issue in issues {
                    eprintln!("  {}", issue);
                }
            }
            return Err(e).context("configuration is invalid; run `cadence config` for details");
        }
    }

    // === Options ===
    let mut options = config.run.to_run_options(config.build_chains()?);
    if let Some(max) = args.max_iterations {
        options = options.with_max_iterations(max.max(1));
    }
    if let Some(max) = args.max_step_attempts {
        options = options.with_max_step_attempts(max.max(1));
    }
    if let Some(max) = args.max_approval_revisions {
        options = options.with_max_approval_revisions(max.max(1));
    }
    let hil = hil_mode(args, config);

    let (root, handle) = split_workspace(&args.workspace)?;
    info!("Workspace root {} handle {}", root.display(), handle);

    // === Dependency Injection ===
    let gateway = Arc::new(RoutingGateway::from_commands(config.command_specs()));
    let store = Arc::new(FsWorkspaceStore::new(root));

    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling run");
                token.cancel();
            }
        });
    }

    let channel: Arc<dyn HumanChannel> = match hil {
        HilMode::Interactive => Arc::new(ConsoleHumanChannel::new()),
        HilMode::AutoApprove => Arc::new(AutoApproveChannel),
        HilMode::AutoRevise => Arc::new(AutoReviseChannel::default()),
    };

    let mut use_case = RunObjectiveUseCase::new(gateway, store)
        .with_event_sink(Arc::new(TracingEventSink))
        .with_human_channel(channel)
        .with_cancellation(token)
        .with_timeout(config.run.timeout());

    if let Some(path) = args.events.as_ref().or(config.logging.events_jsonl.as_ref()) {
        match JsonlEventSink::new(path) {
            Some(sink) => {
                info!("Writing events to {}", sink.path().display());
                use_case = use_case.with_event_sink(Arc::new(sink));
            }
            None => warn!("Event log disabled: cannot write {}", path.display()),
        }
    }

    // Spinners would redraw over the interactive approval prompt
    let progress: Box<dyn RunProgressNotifier> = if args.quiet {
        Box::new(NoRunProgress)
    } else if hil == HilMode::Interactive {
        Box::new(SimpleProgress)
    } else {
        Box::new(ProgressReporter::new())
    };

    let input = RunObjectiveInput::new(args.objective.clone(), handle, options);
    let result = use_case
        .execute_with_progress(input, progress.as_ref())
        .await;

    match result {
        Ok(report) => {
            print_report(&report, args.output);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            if let Some(report) = e.report() {
                print_report(report, args.output);
            }
            eprintln!("Error: {}", e);
            Ok(ExitCode::from(exit_code(&e)))
        }
    }
}

fn print_report(report: &FinalReport, format: OutputFormat) {
    println!("{}", ConsoleFormatter::render(report, format));
}

fn exit_code(error: &RunObjectiveError) -> u8 {
    if error.is_cancelled() {
        EXIT_CANCELLED
    } else {
        EXIT_CONFIG
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_absolute_workspace() {
        let (root, handle) = split_workspace(Path::new("/tmp/runs/guide")).unwrap();
        assert_eq!(root, PathBuf::from("/tmp/runs"));
        assert_eq!(handle, "guide");
    }

    #[test]
    fn test_split_relative_workspace() {
        let (root, handle) = split_workspace(Path::new("out/./guide")).unwrap();
        assert_eq!(root, std::env::current_dir().unwrap().join("out"));
        assert_eq!(handle, "guide");
    }

    #[test]
    fn test_split_rejects_parent_components() {
        assert!(split_workspace(Path::new("../guide")).is_err());
        assert!(split_workspace(Path::new("/")).is_err());
    }
}

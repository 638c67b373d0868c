// Main entry point for rpgtest

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info, warn};

use rpgtest::cli::Cli;
use rpgtest::config::{BackendKind, Config};
use rpgtest::AdapterError;
use rpgtest::execution::{EventListener, RunTracker};
use rpgtest::logging;
use rpgtest::report::{ConsoleBackend, InMemoryBackend, ReportingBackend, StreamingJsonBackend};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    if let Some(path) = &cli.init_config {
        std::fs::write(path, Config::default().to_toml())
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        println!("Created default configuration at {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::load().unwrap_or_default(),
    };
    cli.apply(&mut config);

    let events = cli.events.as_deref().context("no event file given")?;
    let reader = open_events(events)?;
    let backend = open_backend(&config)?;

    info!(backend = ?config.backend.kind, "replaying {}", events.display());

    let tracker = RunTracker::new(backend, config.tracker_options());
    let mut listener = EventListener::new(tracker)
        .with_policy(config.policy.on_backend_error)
        .with_default_description(config.launch.description.clone());

    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", events.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        // The listener has already logged the failure and halted or degraded.
        // Replay continues so the outcome tally stays complete.
        if let Err(AdapterError::Decode(_)) = listener.on_json_line(&line) {
            warn!(line = index + 1, "report stops at this record");
        }
    }

    if listener.tracker().is_running() && !listener.is_halted() {
        warn!(
            "event stream ended with {} node(s) still open",
            listener.tracker().depth()
        );
    }

    print_summary(&listener);

    // Exit status reflects the tests, never the adapter
    if listener.tally().any_failed() {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn open_events(path: &Path) -> Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_backend(config: &Config) -> Result<Box<dyn ReportingBackend>> {
    let backend: Box<dyn ReportingBackend> = match config.backend.kind {
        BackendKind::Stream => match &config.backend.output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                Box::new(StreamingJsonBackend::new(file))
            }
            None => Box::new(StreamingJsonBackend::stdout()),
        },
        BackendKind::Console => Box::new(ConsoleBackend::stdout()),
        BackendKind::Memory => Box::new(InMemoryBackend::new()),
    };
    Ok(backend)
}

fn print_summary<B: ReportingBackend>(listener: &EventListener<B>) {
    let tally = listener.tally();
    eprintln!();
    if tally.any_failed() {
        eprintln!(
            "FAILED ({} failed, {} passed, {} skipped)",
            tally.failed, tally.passed, tally.skipped
        );
    } else {
        eprintln!(
            "PASSED ({} passed, {} skipped)",
            tally.passed, tally.skipped
        );
    }

    match listener.summary() {
        Some(summary) => {
            eprintln!("Report:");
            eprintln!("   • Groups: {}", summary.groups);
            eprintln!("   • Cases: {}", summary.cases);
            eprintln!("   • Failure logs: {}", summary.log_entries);
            eprintln!("   • Duration: {}ms", summary.duration_ms);
            eprintln!("   • Pass rate: {:.0}%", summary.pass_rate());
        }
        None => eprintln!("Report incomplete"),
    }
    if listener.backend_errors() > 0 {
        eprintln!("   • Backend errors: {}", listener.backend_errors());
    }
}

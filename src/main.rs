use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use agentgraph_core::{AppConfig, ValidationIssue};
use agentgraph_mapper::{execution_order, export_flow, import_flow_str, validate_flow, ExportOptions};
use agentgraph_runtime::{
    Breakpoint, JsonLinesSource, RunReport, SessionControl, SessionHandle, SessionRunner,
    SessionSnapshot, StepMode,
};

#[derive(Parser)]
#[command(name = "agentgraph", version, about = "Multi-agent flow graph mapper and session replayer")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "agentgraph.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a flow graph and report every issue found
    Validate {
        /// Flow graph JSON file
        file: PathBuf,
        /// Print issues as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a flow graph and export it in the current schema
    Export {
        file: PathBuf,
        /// Replace credentials with placeholders
        #[arg(long)]
        hide_secrets: bool,
        /// Omit cross-reference fields
        #[arg(long)]
        skip_links: bool,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the chat execution order of a flow
    Order { file: PathBuf },
    /// Replay a JSONL runtime event log through a session
    Replay {
        /// Event log, one JSON event per line ("-" for stdin)
        events: PathBuf,
        /// Pause before every event
        #[arg(long)]
        step: bool,
        /// Pause on a breakpoint: KIND, event:KIND, agent:NAME or NAME:KIND (repeatable)
        #[arg(long = "break-on", value_name = "BREAKPOINT")]
        break_on: Vec<String>,
        /// Answer every input request with this text
        #[arg(long, value_name = "TEXT")]
        auto_respond: Option<String>,
        /// Print the final session snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "agentgraph", &mut io::stdout());
        return Ok(());
    }

    let config = AppConfig::load_or_default(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Validate { file, json } => validate(&config, &file, json),
        Commands::Export {
            file,
            hide_secrets,
            skip_links,
            output,
        } => {
            let options = ExportOptions {
                hide_secrets: hide_secrets || config.export.hide_secrets,
                skip_links: skip_links || config.export.skip_links,
            };
            export(&file, options, output.as_deref())
        }
        Commands::Order { file } => {
            let outcome = import_flow_str(&read(&file)?)?;
            let plan = execution_order(&outcome.flow);
            for (prerequisite, dependant) in &plan.excluded_edges {
                warn!(%prerequisite, %dependant, "prerequisite closes a cycle, ignored");
            }
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(())
        }
        Commands::Replay {
            events,
            step,
            break_on,
            auto_respond,
            json,
        } => {
            let mode = if step {
                StepMode::Step
            } else if !break_on.is_empty() {
                let points = break_on
                    .iter()
                    .map(|raw| raw.parse::<Breakpoint>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(anyhow::Error::msg)?;
                StepMode::breakpoints(points)
            } else {
                StepMode::from_config(&config.runtime).map_err(anyhow::Error::msg)?
            };
            replay(&config, &events, mode, auto_respond, json).await
        }
        Commands::Config => {
            println!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Completions { .. } => unreachable!("handled before config load"),
    }
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn validate(config: &AppConfig, file: &Path, json: bool) -> anyhow::Result<()> {
    let outcome = import_flow_str(&read(file)?)?;
    let mut issues = outcome.issues;
    // Import already repaired some of these; report each once.
    for issue in validate_flow(&outcome.flow) {
        if !issues.contains(&issue) {
            issues.push(issue);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
    } else {
        print_issues(&issues);
        println!(
            "{}: {} agents, {} chats, {} issue(s)",
            outcome.flow.name,
            outcome.flow.agents.len(),
            outcome.flow.chats.len(),
            issues.len()
        );
    }

    if config.import.fail_on_issues && !issues.is_empty() {
        anyhow::bail!("{} issue(s) found in {}", issues.len(), file.display());
    }
    Ok(())
}

fn print_issues(issues: &[ValidationIssue]) {
    for issue in issues {
        println!("  {}", issue);
    }
}

fn export(file: &Path, options: ExportOptions, output: Option<&Path>) -> anyhow::Result<()> {
    let outcome = import_flow_str(&read(file)?)?;
    if !outcome.is_clean() {
        warn!(issues = outcome.issues.len(), "flow imported with issues");
    }
    let text = serde_json::to_string_pretty(&export_flow(&outcome.flow, options))?;
    match output {
        Some(path) => {
            std::fs::write(path, text + "\n")
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "flow exported");
        }
        None => println!("{}", text),
    }
    Ok(())
}

async fn replay(
    config: &AppConfig,
    events: &Path,
    mode: StepMode,
    auto_respond: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let from_stdin = events == Path::new("-");
    let interactive = mode != StepMode::Run;
    if from_stdin && interactive {
        anyhow::bail!("step mode reads controls from stdin; pass the event log as a file");
    }

    let cancel = CancellationToken::new();
    let report = if from_stdin {
        let source = JsonLinesSource::new(BufReader::new(tokio::io::stdin()));
        drive(source, mode, config.runtime.control_buffer, cancel, auto_respond, json).await?
    } else {
        let file = tokio::fs::File::open(events)
            .await
            .with_context(|| format!("failed to open {}", events.display()))?;
        let source = JsonLinesSource::new(BufReader::new(file));
        drive(source, mode, config.runtime.control_buffer, cancel, auto_respond, json).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report.snapshot)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

async fn drive<S: agentgraph_runtime::EventSource + 'static>(
    source: S,
    mode: StepMode,
    control_buffer: usize,
    cancel: CancellationToken,
    auto_respond: Option<String>,
    quiet: bool,
) -> anyhow::Result<RunReport> {
    let interactive = mode != StepMode::Run;
    let (runner, handle, mut responses) = SessionRunner::new(source, mode, control_buffer, cancel);
    let task = tokio::spawn(runner.run());

    // Stand-in for the execution engine: accept forwarded answers.
    tokio::spawn(async move {
        while let Some(response) = responses.recv().await {
            info!(request = %response.request_id, "response forwarded");
        }
    });

    if interactive {
        spawn_stdin_controls(handle.clone());
    }

    let mut state = handle.subscribe();
    let mut printed = 0;
    let mut answered: Option<String> = None;
    let mut paused_at = 0;
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, cancelling session");
                handle.cancel();
                continue;
            }
        }
        let current = state.borrow_and_update().clone();
        if !quiet {
            printed = print_timeline(&current.snapshot, printed);
        }

        if let Some(request) = &current.snapshot.active_request {
            if answered.as_deref() != Some(request.request_id.as_str()) {
                match &auto_respond {
                    Some(text) => {
                        let response = agentgraph_runtime::InputResponse::new(
                            request.request_id.clone(),
                            text.clone(),
                        );
                        if handle.respond(response).await.is_err() {
                            debug!("runner stopped before the response was sent");
                        }
                    }
                    None => eprintln!("[input requested] {} ({})", request.prompt, request.request_id),
                }
                answered = Some(request.request_id.clone());
            }
        }

        if interactive && current.held > 0 && current.held != paused_at {
            eprintln!(
                "[paused] {} event(s) held. enter = continue, r = run, q = quit",
                current.held
            );
        }
        paused_at = current.held;
    }

    let report = task.await.context("session runner panicked")?;
    if !quiet {
        print_timeline(&report.snapshot, printed);
    }
    Ok(report)
}

fn spawn_stdin_controls(handle: SessionHandle) {
    let rt = tokio::runtime::Handle::current();
    // Detached: a blocked stdin read must not hold up shutdown.
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines().map_while(|l| l.ok()) {
            let control = match line.trim() {
                "" | "c" => SessionControl::Continue,
                "r" => SessionControl::SetMode(StepMode::Run),
                "q" => SessionControl::Cancel,
                other => {
                    eprintln!("unknown command: {}", other);
                    continue;
                }
            };
            if rt.block_on(handle.send(control)).is_err() {
                break;
            }
        }
    });
}

fn print_timeline(snapshot: &SessionSnapshot, from: usize) -> usize {
    for message in snapshot.timeline.iter().skip(from) {
        let to = message.recipient.as_deref().unwrap_or("*");
        println!("[{}] {} -> {}: {}", message.role, message.sender, to, message.content.to_text());
    }
    snapshot.timeline.len().max(from)
}

fn print_summary(report: &RunReport) {
    let snapshot = &report.snapshot;
    println!();
    println!("Session {}: {}", snapshot.id, snapshot.status);
    println!("  Messages:   {}", snapshot.timeline.len());
    println!("  Total cost: ${:.4}", snapshot.total_cost);
    if let Some(error) = &snapshot.error {
        println!("  Error:      {}", error);
    }
    if let Some(request) = &snapshot.active_request {
        println!("  Waiting on: {} ({})", request.prompt, request.request_id);
    }
    if !snapshot.violations.is_empty() {
        println!("  Protocol violations:");
        for violation in &snapshot.violations {
            println!("    {}", violation);
        }
    }
    let stats = report.stats;
    println!(
        "  Events: {} received, {} applied, {} ignored, {} out of order",
        stats.received, stats.applied, stats.ignored, stats.out_of_order
    );
}

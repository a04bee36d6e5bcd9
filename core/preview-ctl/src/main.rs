//! preview-ctl: forwards editor state transitions to the preview daemon.
//!
//! Editor integrations call this on buffer open, buffer switch, save, and
//! explicit refresh. The daemon decides what happens to the artifact.
//!
//! ## Subcommands
//!
//! - `event`: Send a raw preview event (reads JSON from stdin)
//! - `preview`: Show `SOURCE` as the session's preview
//! - `close`: Tell the daemon the session no longer wants a preview
//! - `end-session`: Remove a session's artifact (session is gone)
//! - `artifacts`: List live artifacts
//! - `health`: Daemon status

mod daemon_client;
mod logging;

use clap::{Parser, Subcommand, ValueEnum};
use daemon_client::{ClientError, DaemonClient};
use preview_core::{artifact_path_for, load_config, PreviewConfig};
use preview_protocol::{
    BuffersListAction, MainWindowAction, PreviewEvent, PreviewState, PreviewToolAction, SessionId,
    SessionSnapshot, StateActionPair,
};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "preview-ctl")]
#[command(about = "Markdown preview sync client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a preview event (reads PreviewEvent JSON from stdin)
    Event,

    /// Render SOURCE as the session's preview
    Preview {
        /// Editing session identifier
        #[arg(long)]
        session: String,

        /// Markdown document to preview
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Artifact path (defaults to <artifact_dir>/<session>.html)
        #[arg(long)]
        target: Option<PathBuf>,

        /// Editor action that triggered the preview
        #[arg(long, value_enum, default_value_t = Trigger::Written)]
        trigger: Trigger,
    },

    /// Close the session's preview
    Close {
        #[arg(long)]
        session: String,
    },

    /// Remove a session's artifact after the session has gone away
    EndSession {
        #[arg(value_name = "SESSION")]
        session: String,
    },

    /// List live preview artifacts
    Artifacts,

    /// Show daemon health
    Health,
}

#[derive(Clone, Copy, ValueEnum)]
enum Trigger {
    /// Explicit refresh from the preview tool
    Refresh,
    /// Buffer opened from the buffer list
    Open,
    /// Current buffer changed
    Switch,
    /// Buffer saved
    Written,
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        tracing::error!(error = %e, "preview-ctl failed");
        eprintln!("preview-ctl: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), String> {
    let client = DaemonClient::from_env().map_err(|e| e.to_string())?;

    let data = match command {
        Commands::Event => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .map_err(|e| format!("Failed to read stdin: {}", e))?;
            let event: PreviewEvent = serde_json::from_str(&input)
                .map_err(|e| format!("Invalid preview event: {}", e))?;
            client.send_event(event).map_err(to_message)?
        }
        Commands::Preview {
            session,
            source,
            target,
            trigger,
        } => {
            let source = absolute(&source)?;
            let target = match target {
                Some(target) => absolute(&target)?,
                None => {
                    artifact_path_for(&config().artifact_dir(), &SessionId::new(session.as_str()))
                }
            };
            let state = SessionSnapshot {
                session_id: SessionId::new(session),
                preview: PreviewState {
                    buffer: Some(source),
                    html: Some(target),
                },
            };
            client
                .send_event(event_for(trigger, state))
                .map_err(to_message)?
        }
        Commands::Close { session } => {
            let state = SessionSnapshot {
                session_id: SessionId::new(session),
                preview: PreviewState::default(),
            };
            client
                .send_event(event_for(Trigger::Refresh, state))
                .map_err(to_message)?
        }
        Commands::EndSession { session } => client
            .end_session(SessionId::new(session))
            .map_err(to_message)?,
        Commands::Artifacts => {
            let artifacts = client.artifacts().map_err(to_message)?;
            serde_json::to_value(artifacts).map_err(|e| e.to_string())?
        }
        Commands::Health => client.health().map_err(to_message)?,
    };

    print_json(&data)
}

fn event_for(trigger: Trigger, state: SessionSnapshot) -> PreviewEvent {
    match trigger {
        Trigger::Refresh => PreviewEvent::PreviewTool(StateActionPair {
            state,
            action: PreviewToolAction::RefreshNow,
        }),
        Trigger::Open => PreviewEvent::BuffersList(StateActionPair {
            state,
            action: BuffersListAction::Open,
        }),
        Trigger::Switch => PreviewEvent::MainWindow(StateActionPair {
            state,
            action: MainWindowAction::NewCurrentBuffer,
        }),
        Trigger::Written => PreviewEvent::MainWindow(StateActionPair {
            state,
            action: MainWindowAction::BufferWritten,
        }),
    }
}

fn config() -> PreviewConfig {
    load_config(None).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Failed to load preview config; using defaults");
        PreviewConfig::default()
    })
}

fn absolute(path: &Path) -> Result<PathBuf, String> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| format!("Failed to resolve {}: {}", path.display(), e))
}

fn to_message(err: ClientError) -> String {
    err.to_string()
}

fn print_json(data: &Value) -> Result<(), String> {
    let text = serde_json::to_string_pretty(data).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}

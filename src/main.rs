//! focal - a real-time classroom focus-session client

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use focal::api::ApiClient;
use focal::client::{Notice, SessionClient};
use focal::config::Config;
use focal::protocol::ControlKind;
use focal::session::{SessionState, SessionStatus};

#[derive(Parser)]
#[command(name = "focal")]
#[command(about = "A real-time classroom focus-session client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a live session and follow it from the terminal
    Join {
        /// Session id
        session_id: i64,

        /// Stream a synthetic focus signal (for demos without a camera)
        #[arg(long)]
        simulate_focus: bool,
    },
    /// List session records
    Sessions,
    /// Send a lifecycle command to a live session (instructor)
    Control {
        /// Session id
        session_id: i64,

        /// One of: start, pause, resume, end
        verb: String,
    },
    /// End a session over the REST API (instructor)
    End {
        /// Session id
        session_id: i64,
    },
    /// Leave a session over the REST API
    Leave {
        /// Session id
        session_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Join {
            session_id,
            simulate_focus,
        } => join(&config, session_id, simulate_focus).await,
        Commands::Sessions => list_sessions(&config).await,
        Commands::Control { session_id, verb } => control(&config, session_id, &verb).await,
        Commands::End { session_id } => {
            ApiClient::new(&config)?.end_session(session_id).await?;
            println!("Session {} ended.", session_id);
            Ok(())
        }
        Commands::Leave { session_id } => {
            ApiClient::new(&config)?.leave_session(session_id).await?;
            println!("Left session {}.", session_id);
            Ok(())
        }
    }
}

/// Register attendance, attach the engine, and mirror the session to the
/// terminal until it ends. Stdin lines become chat messages.
async fn join(config: &Config, session_id: i64, simulate_focus: bool) -> Result<()> {
    let api = ApiClient::new(config)?;
    if let Err(e) = api.join_session(session_id).await {
        tracing::warn!("REST join failed (continuing to live attach): {e:#}");
    }

    let (client, mut notices) = SessionClient::connect(config, session_id)?;
    let mut state_rx = client.state();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    let mut focus_tick = tokio::time::interval(Duration::from_millis(100));
    let mut focus_phase = 0f64;

    let mut printed = Printed::default();
    print_updates(&mut printed, &state_rx.borrow().clone());

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow().clone();
                print_updates(&mut printed, &state);
            }

            notice = notices.recv() => match notice {
                Some(Notice::Ended) => {
                    println!("* session ended");
                    break;
                }
                Some(Notice::ReconnectFailed) => {
                    eprintln!("* lost connection and could not reconnect");
                    break;
                }
                Some(Notice::Reconnecting { attempt }) => {
                    eprintln!("* reconnecting (attempt {attempt})...");
                }
                Some(Notice::Connected) => {
                    println!("* connected");
                }
                Some(Notice::ServerError { message }) => {
                    eprintln!("* server error: {message}");
                }
                Some(Notice::LocalFocus { .. }) => {}
                None => break,
            },

            line = stdin.next_line() => match line? {
                Some(line) => client.send_chat_message(line),
                None => {
                    // EOF: announce departure, then tear down below.
                    client.send_leave_session();
                    break;
                }
            },

            _ = focus_tick.tick(), if simulate_focus => {
                // Synthetic stand-in for the camera-derived score source;
                // the engine's throttle bounds what reaches the wire.
                focus_phase += 0.1;
                client.send_focus_update(0.5 + 0.4 * focus_phase.sin());
            }
        }
    }

    client.disconnect().await;
    Ok(())
}

async fn list_sessions(config: &Config) -> Result<()> {
    let sessions = ApiClient::new(config)?.list_sessions().await?;
    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }
    for s in sessions {
        println!(
            "{}  classroom={}  {}",
            s.id,
            s.classroom,
            if s.is_active { "active" } else { "ended" }
        );
    }
    Ok(())
}

/// Attach just long enough to deliver one lifecycle command.
async fn control(config: &Config, session_id: i64, verb: &str) -> Result<()> {
    let control = match verb {
        "start" => ControlKind::Start,
        "pause" => ControlKind::Pause,
        "resume" => ControlKind::Resume,
        "end" => ControlKind::End,
        other => return Err(anyhow!("unknown control verb '{}'", other)),
    };

    let (client, mut notices) = SessionClient::connect(config, session_id)?;

    // Wait for the handshake before sending.
    let deadline = tokio::time::sleep(Duration::from_secs(10));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            notice = notices.recv() => match notice {
                Some(Notice::Connected) => break,
                Some(Notice::ReconnectFailed) | None => {
                    return Err(anyhow!("could not reach session {}", session_id));
                }
                Some(_) => {}
            },
            _ = &mut deadline => return Err(anyhow!("timed out reaching session {}", session_id)),
        }
    }

    client.send_session_control(control);
    // Give the frame a moment to flush before closing.
    tokio::time::sleep(Duration::from_millis(200)).await;
    client.disconnect().await;
    println!("Sent '{}' to session {}.", verb, session_id);
    Ok(())
}

/// What the join loop has already echoed, to print only deltas.
#[derive(Default)]
struct Printed {
    status: Option<SessionStatus>,
    chat_seen: u64,
    elapsed: u64,
}

fn print_updates(printed: &mut Printed, state: &SessionState) {
    if printed.status != Some(state.status) {
        printed.status = Some(state.status);
        let stats = state.stats_view();
        println!(
            "* status: {:?} | {}/{} active | avg focus {:.2}",
            state.status,
            state.active_participants(),
            state.participants.len(),
            stats.average_focus_score,
        );
    }

    let minute = (state.elapsed_secs as u64) / 60;
    if minute != printed.elapsed && state.status == SessionStatus::Active {
        printed.elapsed = minute;
        println!("* elapsed: {}m", minute);
    }

    if state.chat_seen > printed.chat_seen {
        let new = (state.chat_seen - printed.chat_seen).min(state.chat.len() as u64) as usize;
        for entry in state.chat.iter().skip(state.chat.len() - new) {
            println!("<{}> {}", entry.author, entry.body);
        }
        printed.chat_seen = state.chat_seen;
    }
}

mod command;
mod render;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use command::{Command, HELP};
use dialoguer::Input;
use render::ViewPrinter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use watchparty::client::{
    ClientConfig, DeniedCapture, EndReason, LocalAction, MediaCapture, MeshCoordinator,
    MeshHandle, MeshServices, Player, SessionPhase, SyntheticCapture, VirtualPlayer,
    WebRtcEngineFactory, WsSignaling, forward_events,
};
use watchparty::model::PlaybackAction;

const REJOIN_DELAY: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "watchparty", version, about = "Watch videos together from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a watch party through a signaling relay.
    Join(JoinArgs),
}

#[derive(Args)]
struct JoinArgs {
    /// Signaling relay websocket url. Overrides the config file.
    #[arg(long)]
    server: Option<String>,

    /// Display name. Prompted for when absent.
    #[arg(long)]
    name: Option<String>,

    /// JSON client config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Refuse camera and microphone requests.
    #[arg(long)]
    no_capture: bool,

    /// Join again with a fresh session whenever the session ends.
    #[arg(long)]
    rejoin: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Join(args) => join(args).await,
    }
}

async fn join(args: JoinArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(server) = args.server {
        config.signaling_url = server;
    }

    let name = match args.name {
        Some(name) => name,
        None => prompt_name().await?,
    };

    let mut lines = spawn_stdin_reader();

    loop {
        println!("{}", format!("Connecting to {}...", config.signaling_url).cyan());
        let reason = run_session(&config, &name, args.no_capture, &mut lines).await?;

        if !args.rejoin || matches!(reason, EndReason::Left | EndReason::Shutdown) {
            break;
        }
        println!("{}", "Rejoining with a fresh session...".yellow());
        tokio::time::sleep(REJOIN_DELAY).await;
    }

    Ok(())
}

async fn prompt_name() -> Result<String> {
    tokio::task::spawn_blocking(|| {
        Input::<String>::new()
            .with_prompt("Display name")
            .interact_text()
            .context("Failed to read display name")
    })
    .await
    .context("Name prompt panicked")?
}

fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut stdin = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = stdin.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    rx
}

/// Runs one session until it ends. Returns why it ended.
async fn run_session(
    config: &ClientConfig,
    name: &str,
    no_capture: bool,
    lines: &mut mpsc::UnboundedReceiver<String>,
) -> Result<EndReason> {
    let (signaling, events) = WsSignaling::connect(&config.signaling_url).await?;
    let engines = WebRtcEngineFactory::new(config.link_config())?;
    let capture: Arc<dyn MediaCapture> = if no_capture {
        Arc::new(DeniedCapture)
    } else {
        Arc::new(SyntheticCapture::new())
    };
    let mut player = VirtualPlayer::new();

    let handle = MeshCoordinator::spawn(
        config.clone(),
        MeshServices {
            signaling: Arc::new(signaling),
            engines: Arc::new(engines),
            capture,
            player: Box::new(player.clone()),
        },
    );
    tokio::spawn(forward_events(events, handle.clone()));

    // Queued by the coordinator until the relay assigns our id.
    let naming = handle.clone();
    let name = name.to_owned();
    tokio::spawn(async move {
        if let Err(e) = naming.act(LocalAction::SetName(name)).await {
            warn!("Could not set display name: {}", e);
        }
    });

    let mut views = handle.subscribe();
    let mut printer = ViewPrinter::default();
    let mut input_open = true;

    loop {
        tokio::select! {
            changed = views.changed() => {
                let view = views.borrow_and_update().clone();
                printer.show(&view);
                if let SessionPhase::Ended(reason) = view.phase {
                    return Ok(reason);
                }
                if changed.is_err() {
                    return Ok(EndReason::Shutdown);
                }
            }

            line = lines.recv(), if input_open => {
                let Some(line) = line else {
                    info!("Input closed, leaving");
                    input_open = false;
                    let _ = handle.act(LocalAction::Leave).await;
                    continue;
                };
                run_line(&handle, &mut player, &line).await;
            }
        }
    }
}

async fn run_line(handle: &MeshHandle, player: &mut VirtualPlayer, line: &str) {
    let command = match command::parse(line) {
        Ok(Some(command)) => command,
        Ok(None) => return,
        Err(e) => {
            println!("{}", e.to_string().red());
            return;
        }
    };

    let result = match command {
        Command::Action(action) => handle.act(action).await,
        Command::Transport {
            action,
            position_seconds,
        } => {
            if let Some(position) = position_seconds {
                player.seek(position);
            }
            match action {
                PlaybackAction::Play => player.play(),
                PlaybackAction::Pause => player.pause(),
                PlaybackAction::Seek => {}
            }
            handle
                .act(LocalAction::Player {
                    action,
                    position_seconds: Some(player.current_time()),
                })
                .await
        }
        Command::Peers => {
            for row in render::peer_table(&handle.view()) {
                println!("{}", row);
            }
            Ok(())
        }
        Command::Help => {
            println!("{}", HELP);
            Ok(())
        }
    };

    if let Err(e) = result {
        println!("{}", e.to_string().red());
    }
}

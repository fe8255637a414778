//! Deskline Chat: terminal client for the realtime layer.
//!
//! Loads configuration, opens one session, and drives it from stdin.

mod command;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{EnvFilter, fmt};

use deskline_core::config::AppConfig;
use deskline_core::error::AppError;
use deskline_realtime::{AuthToken, MessageType, RealtimeSession, SessionIdentity, SessionUpdate};

use command::Command;

/// Deskline Chat: realtime presence, typing, and messaging from a terminal
#[derive(Debug, Parser)]
#[command(name = "deskline-chat", version, about, long_about = None)]
struct Cli {
    /// Configuration environment overlay (config/{env}.toml)
    #[arg(long, env = "DESKLINE_ENV", default_value = "development")]
    env: String,

    /// Realtime endpoint, overriding realtime.url
    #[arg(long)]
    url: Option<String>,

    /// Your user id
    #[arg(long)]
    user_id: String,

    /// Display name shown to others
    #[arg(long, default_value = "")]
    name: String,

    /// Bearer token presented at handshake
    #[arg(long, env = "DESKLINE_TOKEN", hide_env_values = true)]
    token: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_configuration(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(cli, config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment, then apply CLI overrides
fn load_configuration(cli: &Cli) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load(&cli.env)?;
    if let Some(url) = &cli.url {
        config.realtime.url = url.clone();
        config.validate()?;
    }
    Ok(config)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

/// Main client run function
async fn run(cli: Cli, config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Deskline Chat v{}", env!("CARGO_PKG_VERSION"));

    let display_name = if cli.name.is_empty() {
        cli.user_id.clone()
    } else {
        cli.name
    };
    let identity = SessionIdentity::new(cli.user_id, display_name, AuthToken::new(cli.token))?;
    let session = RealtimeSession::websocket(config.realtime, identity)?;

    let mut updates = session.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => print_update(&update),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Update printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let transport_id = session.start().await?;
    println!(
        "connected as {} [{}] ({})",
        session.display_name(),
        session.user_id(),
        transport_id
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stdin");
                break;
            }
        };

        match Command::parse(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => {
                if let Err(e) = execute(&session, command).await {
                    println!("error: {}", e);
                }
            }
            Ok(None) => {}
            Err(usage) => println!("{}", usage),
        }
    }

    session.shutdown().await;
    printer.abort();
    tracing::info!("Deskline Chat stopped");
    Ok(())
}

async fn execute(session: &RealtimeSession, command: Command) -> Result<(), AppError> {
    match command {
        Command::Send { room, text } => {
            let temp_id = session
                .dispatcher
                .send_message(room, text, MessageType::Text, None)
                .await?;
            println!("sent ({})", temp_id);
        }
        Command::Read { room } => session.dispatcher.mark_read(room).await?,
        Command::Typing { room } => session.dispatcher.start_typing(room).await?,
        Command::Stop { room } => session.dispatcher.stop_typing(room).await?,
        Command::Who { room } => {
            let names: Vec<String> = session
                .typing_users_for(&room)
                .into_iter()
                .map(|u| u.user_name)
                .collect();
            if names.is_empty() {
                println!("nobody is typing in {}", room);
            } else {
                println!("typing in {}: {}", room, names.join(", "));
            }
        }
        Command::Online => {
            for user in session.online_users() {
                println!(
                    "{}\t{}",
                    user.user_id,
                    user.user_name.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Status => {
            println!("state: {}", session.state().as_str());
            if let Some(info) = session.connection_info().await {
                println!(
                    "transport: {} (epoch {}, since {})",
                    info.transport_id, info.epoch, info.connected_at
                );
            }
            let metrics = serde_json::to_string(&session.metrics())?;
            println!("metrics: {}", metrics);
        }
        Command::Quit => {}
    }
    Ok(())
}

fn print_update(update: &SessionUpdate) {
    match update {
        SessionUpdate::Connection(state) => println!("* connection {}", state.as_str()),
        SessionUpdate::Presence { user_id, online } => {
            let status = if *online { "online" } else { "offline" };
            println!("* {} is {}", user_id, status);
        }
        SessionUpdate::PresenceCleared => println!("* presence cleared"),
        SessionUpdate::Typing { room_id } => println!("* typing changed in {}", room_id),
        SessionUpdate::TypingCleared => println!("* typing cleared"),
    }
}

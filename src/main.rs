//! scheroes - console client for the SC Heroes chat server and game API.
//!
//! Connects to the chat server, joins the configured language room (and
//! clan chat), prints incoming lines and sends whatever is typed.

mod common;
mod config;
mod console;
mod protocol;

use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use config::{env::get_config_path, load_and_validate, Config};
use console::commands::HELP;
use console::{parse_line, Command, MessageFormatter};
use protocol::api::{GameSession, HttpClient};
use protocol::chat::{ChatSender, ChatSession};

/// How long to wait for the receive loop after a stop request.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("scheroes v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Chat: {}:{}", config.chat.host, config.chat.port);
    info!("  Name: {} ({})", config.chat.name, config.chat.uid);
    info!("  Language: {}", config.chat.language);
    info!("  API: {}:{} (v{})", config.api.host, config.api.port, config.api.version);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ============================================================
    // Chat connection
    // ============================================================
    let mut session = ChatSession::connect(&config.chat.host, config.chat.port, shutdown_rx).await?;
    session.join(config.chat.uid, &config.chat.language).await?;
    info!("Joined chat as {}", config.chat.name);

    if let Some(clan_id) = config.chat.clan_id {
        session.join_clan(clan_id).await?;
        info!("Joined clan chat {}", clan_id);
    }

    let sender = session.sender();

    // The receive task reads the current room for %channel.
    let (language_tx, language_rx) = watch::channel(config.chat.language.clone());
    let formatter = config
        .chat
        .format
        .clone()
        .map(MessageFormatter::new)
        .unwrap_or_default();

    let mut receive_task = tokio::spawn(async move {
        session
            .receive_loop(|message| {
                let language = language_rx.borrow().clone();
                println!("{}", formatter.format(&message, &language));
            })
            .await
    });

    // ============================================================
    // Console input
    // ============================================================
    let mut api = GameSession::with_http(&config.api.host, config.api.port, config.api.version.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut console = Console {
        config: &config,
        sender: &sender,
        api: &mut api,
        language_tx: &language_tx,
    };

    let receive_finished = loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        info!("Input closed");
                        break false;
                    }
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        break false;
                    }
                };

                match parse_line(&line) {
                    None => {}
                    Some(Ok(Command::Quit)) => break false,
                    Some(Ok(command)) => {
                        if let Err(e) = console.run(command).await {
                            error!("{}", e);
                        }
                    }
                    Some(Err(e)) => println!("{}", e),
                }
            }
            _ = shutdown_signal() => {
                info!("Shutdown signal received");
                break false;
            }
            result = &mut receive_task => {
                match result {
                    Ok(Ok(())) => info!("Chat connection closed"),
                    Ok(Err(e)) => error!("Chat connection failed: {}", e),
                    Err(e) => error!("Chat receive task panicked: {}", e),
                }
                break true;
            }
        }
    };

    // ============================================================
    // Shutdown
    // ============================================================
    if !receive_finished {
        if let Err(e) = shutdown_tx.send(true) {
            debug!("Shutdown channel closed (receive loop already exited): {}", e);
        }
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, receive_task).await {
            Ok(Ok(Ok(()))) => info!("Chat receive loop stopped"),
            Ok(Ok(Err(e))) => warn!("Chat receive loop ended with error: {}", e),
            Ok(Err(e)) => warn!("Chat receive task panicked: {}", e),
            Err(_) => warn!("Chat receive loop did not stop in time"),
        }
    }

    info!("Exiting...");
    Ok(())
}

/// Executes console commands against the chat and API sessions.
struct Console<'a> {
    config: &'a Config,
    sender: &'a ChatSender<tokio::net::TcpStream>,
    api: &'a mut GameSession<HttpClient>,
    language_tx: &'a watch::Sender<String>,
}

impl Console<'_> {
    async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Say(text) => self.sender.say(&text).await?,
            Command::ClanSay(text) => {
                if self.config.chat.clan_id.is_none() {
                    println!("No clan configured (chat.clan_id)");
                }
                self.sender.clan_say(&text).await?;
            }
            Command::ChangeLanguage(language) => {
                if !protocol::chat::languages::ALL.contains(&language.as_str()) {
                    println!(
                        "Unknown language '{}' (use: {})",
                        language,
                        protocol::chat::languages::ALL.join(", ")
                    );
                    return Ok(());
                }
                self.sender
                    .change_language(self.config.chat.uid, &language)
                    .await?;
                self.language_tx.send_replace(language.clone());
                println!("Switched to {}", language);
            }
            Command::Online => {
                println!("Users online: {}", self.sender.online_users());
            }
            Command::Status => {
                println!("Chat: {:?}", self.sender.state());
                println!("Game API: {:?}", self.api.state());
                match self.sender.auth_request_key() {
                    Some(key) => println!("Key exchange requested ({} byte key)", key.len()),
                    None => println!("No key exchange requested"),
                }
            }
            Command::ServerTime => {
                let response = self.api.server_time().await?;
                println!("Server time: {}", response.time.format("%d.%m.%Y %H:%M:%S UTC"));
            }
            Command::Auth => {
                let response = self.api.auth_request(self.config.chat.uid).await?;
                println!("Game server: {}", response.game_server);
                println!("Chat server: {}", response.chat_server);
            }
            Command::AuthChallenge => {
                let response = self.api.auth_challenge_response(self.config.chat.uid).await?;
                println!("Challenge reply: {} bytes", response.body.len());
            }
            Command::AuthReply(key) => {
                let len = key.len();
                self.sender.auth_response(key).await?;
                println!("Sent key-exchange reply ({} bytes)", len);
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => {}
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

//! cuekeeperd - The cuekeeper background service
//!
//! This is the main entry point for the cuekeeperd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - The session ledger
//! - IPC server

use anyhow::{Context, Result};
use clap::Parser;
use cuekeeper_api::{
    Command, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus, Response,
    ResponsePayload, StatusReply, TransitionReply, API_VERSION,
};
use cuekeeper_config::{load_config_or_default, Settings, StoreBackend, StoreConfig};
use cuekeeper_core::{Ledger, TableAction};
use cuekeeper_ipc::{IpcServer, ServerMessage};
use cuekeeper_store::{JsonFileStore, SqliteStore, Store};
use cuekeeper_util::{default_config_path, ClientId, TableId};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// cuekeeperd - Pool table session ledger service
#[derive(Parser, Debug)]
#[command(name = "cuekeeperd")]
#[command(about = "Pool table session ledger service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/cuekeeper/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set CUEKEEPER_SOCKET env var)
    #[arg(short, long, env = "CUEKEEPER_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set CUEKEEPER_DATA_DIR env var)
    #[arg(short, long, env = "CUEKEEPER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    ledger: Ledger,
    ipc: Arc<IpcServer>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let settings = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            table_count = settings.table_ids.len(),
            default_rate = settings.default_rate,
            "Configuration loaded"
        );

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| settings.service.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| settings.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let store = open_store(&settings.store, &data_dir)?;
        let ledger = load_ledger(&settings, store)?;

        if cuekeeper_util::is_mock_time_active() {
            warn!(
                now = %cuekeeper_util::format_datetime_full(&cuekeeper_util::now()),
                "Mock time is active, session times will be shifted"
            );
        }

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start()
            .await
            .with_context(|| format!("Failed to start IPC server on {:?}", socket_path))?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        Ok(Self {
            ledger,
            ipc: Arc::new(ipc),
        })
    }

    async fn run(self) -> Result<()> {
        let ipc_ref = self.ipc.clone();
        let mut ipc_messages = ipc_ref
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        // One lock over the whole ledger; each transition and its save run
        // to completion under it
        let ledger = Arc::new(Mutex::new(self.ledger));

        let ipc_accept = ipc_ref.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                Some(msg) = ipc_messages.recv() => {
                    Self::handle_ipc_message(&ledger, &ipc_ref, msg).await;
                }
            }
        }

        info!("Shutting down cuekeeperd");

        ipc_ref.broadcast_event(Event::new(EventPayload::Shutdown));
        // Give writer tasks a moment to flush the shutdown event
        tokio::time::sleep(Duration::from_millis(100)).await;

        ipc_ref.shutdown();

        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_ipc_message(ledger: &Arc<Mutex<Ledger>>, ipc: &Arc<IpcServer>, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                let (response, broadcasts) = if request.api_version != API_VERSION {
                    let response = Response::error(
                        request.request_id,
                        ErrorInfo::new(
                            ErrorCode::UnsupportedVersion,
                            format!(
                                "API version {} not supported (expected {})",
                                request.api_version, API_VERSION
                            ),
                        ),
                    );
                    (response, Vec::new())
                } else {
                    Self::handle_command(ledger, &client_id, request.request_id, request.command).await
                };

                if let Err(e) = ipc.send_response(&client_id, response).await {
                    debug!(client_id = %client_id, error = %e, "Failed to send response");
                }

                for payload in broadcasts {
                    ipc.broadcast_event(Event::new(payload));
                }
            }

            ServerMessage::ClientConnected { client_id } => {
                info!(client_id = %client_id, "Client connected");
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");
            }
        }
    }

    /// Execute one command, returning the response and the events it caused
    async fn handle_command(
        ledger: &Mutex<Ledger>,
        client_id: &ClientId,
        request_id: u64,
        command: Command,
    ) -> (Response, Vec<EventPayload>) {
        match command {
            Command::StartTable { table_id } => {
                Self::transition(ledger, &table_id, TableAction::Start, request_id).await
            }
            Command::PauseTable { table_id } => {
                Self::transition(ledger, &table_id, TableAction::Pause, request_id).await
            }
            Command::ResumeTable { table_id } => {
                Self::transition(ledger, &table_id, TableAction::Resume, request_id).await
            }
            Command::EndTable { table_id } => {
                Self::transition(ledger, &table_id, TableAction::End, request_id).await
            }

            Command::GetTableStatus { table_id } => {
                let reply = StatusReply::from(ledger.lock().await.status(&table_id).cloned());
                (
                    Response::success(request_id, ResponsePayload::Status(reply)),
                    Vec::new(),
                )
            }

            Command::ListTables => {
                let tables = ledger.lock().await.list();
                (
                    Response::success(request_id, ResponsePayload::Tables { tables }),
                    Vec::new(),
                )
            }

            Command::SubscribeEvents => (
                Response::success(
                    request_id,
                    ResponsePayload::Subscribed {
                        client_id: client_id.clone(),
                    },
                ),
                Vec::new(),
            ),

            Command::UnsubscribeEvents => (
                Response::success(request_id, ResponsePayload::Unsubscribed),
                Vec::new(),
            ),

            Command::GetHealth => {
                let ledger = ledger.lock().await;
                let health = HealthStatus {
                    live: true,
                    ready: true,
                    store_ok: ledger.store_healthy(),
                    table_count: ledger.table_count(),
                };
                (
                    Response::success(request_id, ResponsePayload::Health(health)),
                    Vec::new(),
                )
            }

            Command::Ping => (
                Response::success(request_id, ResponsePayload::Pong),
                Vec::new(),
            ),
        }
    }

    async fn transition(
        ledger: &Mutex<Ledger>,
        table_id: &TableId,
        action: TableAction,
        request_id: u64,
    ) -> (Response, Vec<EventPayload>) {
        let mut ledger = ledger.lock().await;
        let now = cuekeeper_util::now();

        match ledger.apply(table_id, action, now) {
            Ok(event) => (
                Response::success(request_id, ResponsePayload::Transition(event.reply())),
                event.broadcasts(),
            ),
            Err(e) => {
                debug!(table_id = %table_id, action = %action, error = %e, "Command refused");
                (
                    Response::success(
                        request_id,
                        ResponsePayload::Transition(TransitionReply::failed()),
                    ),
                    Vec::new(),
                )
            }
        }
    }
}

fn open_store(config: &StoreConfig, data_dir: &Path) -> Result<Arc<dyn Store>> {
    let path = config.resolved_path(data_dir);

    let store: Arc<dyn Store> = match config.backend {
        StoreBackend::Json => Arc::new(JsonFileStore::new(&path)),
        StoreBackend::Sqlite => Arc::new(
            SqliteStore::open(&path)
                .with_context(|| format!("Failed to open database {:?}", path))?,
        ),
    };

    info!(backend = ?config.backend, path = %path.display(), "Store initialized");
    Ok(store)
}

fn load_ledger(settings: &Settings, store: Arc<dyn Store>) -> Result<Ledger> {
    Ledger::load(&settings.table_ids, settings.default_rate, store)
        .context("Failed to load table sessions")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "cuekeeperd starting"
    );

    let service = Service::new(&args).await?;
    service.run().await
}

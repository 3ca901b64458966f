//! cuectl - command-line front desk for cuekeeperd
//!
//! Talks to the service over its IPC socket. Live elapsed time and running
//! cost are computed here from session snapshots; the service only folds
//! time on pause and end.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use cuekeeper_api::{
    Command, EventPayload, ResponsePayload, StatusReply, TableEntry, TableSession,
    TransitionDetail, TransitionReply,
};
use cuekeeper_core::{live_elapsed, Bill};
use cuekeeper_ipc::IpcClient;
use cuekeeper_util::{default_socket_path, format_datetime_full, format_timer, TableId};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// cuectl - Manage pool tables through cuekeeperd
#[derive(Parser, Debug)]
#[command(name = "cuectl")]
#[command(about = "Manage pool tables through cuekeeperd", long_about = None)]
struct Args {
    /// Socket path (or set CUEKEEPER_SOCKET env var)
    #[arg(short, long, default_value_os_t = default_socket_path())]
    socket: PathBuf,

    /// Print raw JSON replies
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Show every table
    List,
    /// Show one table
    Status { table_id: String },
    /// Open a session on an available table
    Start { table_id: String },
    /// Pause a running table
    Pause { table_id: String },
    /// Resume a paused table
    Resume { table_id: String },
    /// Close a session and print the bill
    End { table_id: String },
    /// Follow table changes as they happen
    Watch,
    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let client = IpcClient::connect(&args.socket)
        .await
        .with_context(|| format!("Failed to connect to cuekeeperd at {:?}", args.socket))?;
    debug!(socket = %args.socket.display(), "Connected");

    match args.command {
        Action::Watch => watch(client, args.json).await,
        action => {
            let mut client = client;
            let (command, table_id) = to_command(action);
            let payload = client.call(command).await.context("Request failed")?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&payload)?);
                return Ok(());
            }

            render(payload, table_id.as_ref(), cuekeeper_util::now())
        }
    }
}

fn to_command(action: Action) -> (Command, Option<TableId>) {
    let with_id = |id: String, make: fn(TableId) -> Command| {
        let table_id = TableId::new(id);
        (make(table_id.clone()), Some(table_id))
    };

    match action {
        Action::List => (Command::ListTables, None),
        Action::Status { table_id } => {
            with_id(table_id, |table_id| Command::GetTableStatus { table_id })
        }
        Action::Start { table_id } => with_id(table_id, |table_id| Command::StartTable { table_id }),
        Action::Pause { table_id } => with_id(table_id, |table_id| Command::PauseTable { table_id }),
        Action::Resume { table_id } => {
            with_id(table_id, |table_id| Command::ResumeTable { table_id })
        }
        Action::End { table_id } => with_id(table_id, |table_id| Command::EndTable { table_id }),
        Action::Health => (Command::GetHealth, None),
        Action::Watch => (Command::SubscribeEvents, None),
    }
}

fn render(payload: ResponsePayload, table_id: Option<&TableId>, now: DateTime<Local>) -> Result<()> {
    match payload {
        ResponsePayload::Tables { tables } => {
            println!("{}", table_header());
            for entry in &tables {
                println!("{}", table_row(entry, now));
            }
        }

        ResponsePayload::Status(StatusReply::Found(session)) => {
            let entry = TableEntry {
                table_id: table_id.cloned().unwrap_or_else(|| TableId::new("?")),
                session,
            };
            println!("{}", table_header());
            println!("{}", table_row(&entry, now));
        }
        ResponsePayload::Status(StatusReply::NotFound { error }) => bail!(error),

        ResponsePayload::Transition(reply) => {
            let label = table_id.map(TableId::as_str).unwrap_or("table");
            println!("{}", describe_transition(label, &reply)?);
        }

        ResponsePayload::Health(health) => {
            println!("live:   {}", health.live);
            println!("ready:  {}", health.ready);
            println!("store:  {}", if health.store_ok { "ok" } else { "FAILING" });
            println!("tables: {}", health.table_count);
        }

        other => println!("{}", serde_json::to_string(&other)?),
    }

    Ok(())
}

fn describe_transition(label: &str, reply: &TransitionReply) -> Result<String> {
    match &reply.detail {
        None => bail!("{}: request refused", label),
        Some(TransitionDetail::Running { start_time, .. }) => Ok(format!(
            "{} running since {}",
            label,
            format_datetime_full(start_time)
        )),
        Some(TransitionDetail::Paused { total_time, .. }) => {
            Ok(format!("{} paused at {}", label, format_timer(*total_time)))
        }
        Some(TransitionDetail::Ended {
            total_cost,
            total_hours,
        }) => Ok(format!(
            "{} closed: {:.2} h, total {:.2}",
            label, total_hours, total_cost
        )),
    }
}

fn table_header() -> String {
    format!(
        "{:<12} {:<10} {:>10} {:>8} {:>9}",
        "TABLE", "STATUS", "ELAPSED", "RATE", "COST"
    )
}

fn table_row(entry: &TableEntry, now: DateTime<Local>) -> String {
    let (elapsed, cost) = running_figures(&entry.session, now);
    format!(
        "{:<12} {:<10} {:>10} {:>8.2} {:>9.2}",
        entry.table_id.as_str(),
        entry.session.status().as_str(),
        format_timer(elapsed),
        entry.session.rate,
        cost
    )
}

/// Elapsed seconds including any open interval, and what that would cost now
fn running_figures(session: &TableSession, now: DateTime<Local>) -> (f64, f64) {
    let elapsed = live_elapsed(session, now);
    (elapsed, Bill::compute(elapsed, session.rate).total_cost)
}

async fn watch(client: IpcClient, json: bool) -> Result<()> {
    let mut events = client
        .subscribe()
        .await
        .context("Failed to subscribe to events")?;

    loop {
        let event = events.next().await.context("Event stream ended")?;

        if json {
            println!("{}", serde_json::to_string(&event)?);
            continue;
        }

        let at = format_datetime_full(&event.timestamp);
        match event.payload {
            EventPayload::TableChanged { table_id, session } => {
                let (elapsed, cost) = running_figures(&session, event.timestamp);
                println!(
                    "[{}] {} {} ({}, {:.2})",
                    at,
                    table_id,
                    session.status(),
                    format_timer(elapsed),
                    cost
                );
            }
            EventPayload::TableEnded {
                table_id,
                total_cost,
                total_hours,
            } => {
                println!(
                    "[{}] {} closed: {:.2} h, total {:.2}",
                    at, table_id, total_hours, total_cost
                );
            }
            EventPayload::Shutdown => {
                println!("[{}] cuekeeperd is shutting down", at);
                return Ok(());
            }
        }
    }
}

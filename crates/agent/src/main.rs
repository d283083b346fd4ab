//! `flowdeck-agent` -- terminal client for the agent workflow backend.
//!
//! Sends chat messages, follows the workflow run each message triggers,
//! browses the agent and tool catalogs, and manages the local run history.
//!
//! # Environment variables
//!
//! | Variable                      | Default                 | Description                          |
//! |-------------------------------|-------------------------|--------------------------------------|
//! | `FLOWDECK_API_URL`            | `http://localhost:8000` | Backend base URL                     |
//! | `FLOWDECK_STATE_TIMEOUT_SECS` | `10`                    | Per-call timeout for state fetches   |
//! | `FLOWDECK_CHAT_TIMEOUT_SECS`  | `120`                   | Per-call timeout for chat calls      |
//! | `FLOWDECK_POLL_INTERVAL_MS`   | `1000`                  | Live monitor cadence                 |
//! | `FLOWDECK_DATA_DIR`           | `./.flowdeck`           | Identity, history, and preferences   |

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use flowdeck_agent::commands::App;
use flowdeck_agent::config::AgentConfig;
use flowdeck_core::refresh::RefreshInterval;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Chat with the agent workflow backend and follow its runs.
#[derive(Parser)]
#[command(name = "flowdeck-agent")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a message and follow the workflow run it triggers
    Send {
        /// The message text
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,

        /// Wait for the reply instead of following the run live
        #[arg(long)]
        wait: bool,
    },

    /// Print the current workflow state
    Status,

    /// Print workflow updates until interrupted
    Watch {
        /// Polling interval in milliseconds (graph view offers 2000, 5000, 10000, 30000)
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Start a new conversation with a fresh session id
    NewSession,

    /// Forget the stored user and session ids
    Forget,

    /// Archived workflow runs
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Agents offered by the backend
    Agents {
        #[command(subcommand)]
        action: AgentsAction,
    },

    /// Tools offered by the backend
    Tools {
        #[command(subcommand)]
        action: ToolsAction,
    },

    /// Show or set the node panel width
    Width {
        /// New width in pixels (8 px per terminal column)
        pixels: Option<u32>,
    },
}

#[derive(Subcommand)]
enum AgentsAction {
    /// List agents
    List {
        /// Only agents whose name, description, or type contains this text
        #[arg(long)]
        search: Option<String>,
    },

    /// Show one agent with its configuration
    Show { id: String },

    /// Send a one-off message to an agent
    Message {
        /// Target agent; the backend's default agent when omitted
        #[arg(long)]
        agent: Option<String>,

        /// The message text
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ToolsAction {
    /// List tools
    List {
        /// Only tools whose name, description, or category contains this text
        #[arg(long)]
        search: Option<String>,
    },

    /// Show one tool with its configuration
    Show { id: String },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List archived runs
    List,

    /// Write an archived run to a JSON file
    Export {
        /// Run number as shown by `history list`
        number: usize,

        /// Destination directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Delete all archived runs
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flowdeck_agent=info,flowdeck_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AgentConfig::from_env();

    tracing::debug!(
        api_url = %config.client.api_url,
        data_dir = %config.data_dir.display(),
        poll_interval_ms = config.poll_interval.duration().as_millis() as u64,
        "Starting flowdeck-agent",
    );

    let app = App::open(config)?;

    match cli.command {
        Commands::Send { message, wait } => {
            let text = message.join(" ");
            if wait {
                app.send_and_wait(&text).await?;
            } else {
                app.send_and_follow(&text).await?;
            }
        }
        Commands::Status => app.status().await?,
        Commands::Watch { interval_ms } => {
            let interval = match interval_ms {
                Some(ms) => RefreshInterval::from_millis(ms)?,
                None => RefreshInterval::GRAPH_DEFAULT,
            };
            app.watch(interval).await?;
        }
        Commands::NewSession => app.new_session().await?,
        Commands::Forget => app.forget_identity(),
        Commands::History { action } => match action {
            HistoryAction::List => app.history_list(),
            HistoryAction::Export { number, dir } => app.history_export(number, &dir)?,
            HistoryAction::Clear => app.history_clear(),
        },
        Commands::Agents { action } => match action {
            AgentsAction::List { search } => app.agents(search.as_deref()).await?,
            AgentsAction::Show { id } => app.agent(&id).await?,
            AgentsAction::Message { agent, message } => {
                app.message_agent(&message.join(" "), agent.as_deref()).await?
            }
        },
        Commands::Tools { action } => match action {
            ToolsAction::List { search } => app.tools(search.as_deref()).await?,
            ToolsAction::Show { id } => app.tool(&id).await?,
        },
        Commands::Width { pixels } => match pixels {
            Some(width) => app.set_panel_width(width)?,
            None => app.show_panel_width(),
        },
    }

    Ok(())
}

//! Command implementations for the terminal client.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use flowdeck_client::{ChatSession, WorkflowApi};
use flowdeck_core::refresh::RefreshInterval;
use flowdeck_core::{normalize, StateSource, WorkflowPhase, WorkflowSnapshot};
use flowdeck_store::{FileStore, KvStore, PanelPreferences};
use flowdeck_sync::{
    HistoryArchive, LatestWorkflowData, Reconciler, ResponseStream, WorkflowMonitor,
    WorkflowUpdate,
};
use tokio::sync::{broadcast, mpsc};

use crate::config::AgentConfig;
use crate::render::{
    panel_columns, render_agents, render_history, render_nodes, render_tools, render_update,
};

/// Shared handles for one invocation of the client.
pub struct App {
    config: AgentConfig,
    store: Arc<dyn KvStore>,
    api: Arc<WorkflowApi>,
}

impl App {
    /// Open durable storage and build the backend client.
    pub fn open(config: AgentConfig) -> Result<Self> {
        let store = FileStore::open(&config.data_dir).with_context(|| {
            format!("Failed to open data directory {}", config.data_dir.display())
        })?;
        let api = Arc::new(WorkflowApi::new(config.client.clone()));

        Ok(Self {
            config,
            store: Arc::new(store),
            api,
        })
    }

    fn chat(&self, latest: LatestWorkflowData) -> ChatSession {
        ChatSession::new(self.api.clone(), Arc::clone(&self.store), latest)
    }

    fn archive(&self) -> HistoryArchive {
        HistoryArchive::open(Arc::clone(&self.store))
    }

    fn panel_width(&self) -> u32 {
        PanelPreferences::new(Arc::clone(&self.store)).width()
    }

    fn panel_columns(&self) -> usize {
        panel_columns(self.panel_width())
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    /// Send a message and wait for the backend's reply.
    pub async fn send_and_wait(&self, text: &str) -> Result<()> {
        let mut chat = self.chat(LatestWorkflowData::new());
        chat.identity().initialize().await.context("Identity setup failed")?;

        let reply = chat.send(text).await?;
        println!("{}", reply.content);
        Ok(())
    }

    /// Send a message without blocking, then follow the workflow run it
    /// triggers: node transitions as they happen and the response text
    /// fragment by fragment.
    pub async fn send_and_follow(&self, text: &str) -> Result<()> {
        let latest = LatestWorkflowData::new();
        let mut chat = self.chat(latest.clone());
        chat.identity().initialize().await.context("Identity setup failed")?;

        // State before the message, so a run left over from an earlier
        // message is not mistaken for this one.
        let baseline = match self.api.fetch_state().await {
            Ok(raw) => Some(normalize(&raw)),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read workflow state before sending");
                None
            }
        };

        let reconciler = Reconciler::new(latest.clone()).with_archive(Arc::new(self.archive()));
        let mut updates = reconciler.subscribe();
        let (error_tx, mut error_rx) = mpsc::unbounded_channel();
        let monitor = WorkflowMonitor::start(
            self.api.clone(),
            self.config.poll_interval,
            reconciler,
            Some(error_tx),
        );

        let send = chat.send_async(text)?;
        // Resolves only if the send fails; a successful send is observed
        // through the monitor instead.
        let send_failure = async move {
            match send.await {
                Ok(Ok(_)) => std::future::pending::<anyhow::Error>().await,
                Ok(Err(e)) => anyhow::Error::new(e).context("Sending the message failed"),
                Err(e) => anyhow::Error::new(e).context("Send task failed"),
            }
        };
        tokio::pin!(send_failure);

        let started = tokio::time::timeout(self.config.client.chat_timeout, async {
            loop {
                tokio::select! {
                    update = updates.recv() => match update {
                        Ok(update) => {
                            print_update(&update);
                            if run_started(baseline.as_ref(), &update) {
                                return Ok(());
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => bail!("Workflow monitor stopped"),
                    },
                    e = &mut send_failure => return Err(e),
                    Some(e) = error_rx.recv() => {
                        eprintln!("! {e}");
                    }
                }
            }
        })
        .await;

        match started {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                monitor.shutdown().await;
                return Err(e);
            }
            Err(_) => {
                monitor.shutdown().await;
                bail!("Timed out waiting for the workflow to start");
            }
        }

        let printer = tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(update) => print_update(&update),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let mut stream = ResponseStream::new(latest);
        let mut reply = String::new();
        let finished = tokio::time::timeout(self.config.client.chat_timeout, async {
            while let Some(fragment) = stream.next().await {
                print!("{fragment}");
                std::io::stdout().flush().ok();
                reply.push_str(&fragment);
            }
        })
        .await;
        println!();

        monitor.shutdown().await;
        printer.abort();

        if !reply.is_empty() {
            chat.push_agent_message(reply);
        }
        if finished.is_err() {
            bail!("Timed out waiting for the workflow to finish");
        }
        Ok(())
    }

    /// Renew the session id so the next message starts a new conversation.
    pub async fn new_session(&self) -> Result<()> {
        let mut chat = self.chat(LatestWorkflowData::new());
        let identity = chat.reset().await?;
        println!(
            "new session {} for user {}",
            identity.session_id.as_deref().unwrap_or("-"),
            identity.user_id
        );
        Ok(())
    }

    /// Forget the stored identity.
    pub fn forget_identity(&self) {
        self.chat(LatestWorkflowData::new()).identity().clear();
        println!("identity cleared");
    }

    // -----------------------------------------------------------------------
    // Workflow state
    // -----------------------------------------------------------------------

    /// Print the current workflow state once.
    pub async fn status(&self) -> Result<()> {
        let raw = self.api.fetch_state().await?;
        print!("{}", render_nodes(&normalize(&raw), self.panel_columns()));
        Ok(())
    }

    /// Print every change until interrupted.
    pub async fn watch(&self, interval: RefreshInterval) -> Result<()> {
        let reconciler =
            Reconciler::new(LatestWorkflowData::new()).with_archive(Arc::new(self.archive()));
        let mut updates = reconciler.subscribe();
        let monitor = WorkflowMonitor::start(self.api.clone(), interval, reconciler, None);
        let columns = self.panel_columns();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                update = updates.recv() => match update {
                    Ok(update) => {
                        print_update(&update);
                        print!("{}", render_nodes(&update.snapshot, columns));
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Display fell behind workflow updates");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        monitor.shutdown().await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Agent and tool catalogs
    // -----------------------------------------------------------------------

    /// List agents, optionally filtered by a search term.
    pub async fn agents(&self, search: Option<&str>) -> Result<()> {
        let agents = self.api.list_agents().await.context("Failed to list agents")?;
        let shown: Vec<_> = agents
            .iter()
            .filter(|a| search.map_or(true, |term| a.matches(term)))
            .collect();
        print!("{}", render_agents(&shown));
        Ok(())
    }

    /// Print one agent in full, configuration included.
    pub async fn agent(&self, id: &str) -> Result<()> {
        let agent = self
            .api
            .get_agent(id)
            .await
            .with_context(|| format!("Failed to fetch agent {id}"))?;
        println!("{}", serde_json::to_string_pretty(&agent)?);
        Ok(())
    }

    /// Send a one-off message to an agent outside the chat session.
    pub async fn message_agent(&self, text: &str, agent_id: Option<&str>) -> Result<()> {
        let reply = self
            .api
            .message_agent(text, agent_id)
            .await
            .context("Agent message failed")?;
        println!("{}", reply.text());
        Ok(())
    }

    /// List tools, optionally filtered by a search term.
    pub async fn tools(&self, search: Option<&str>) -> Result<()> {
        let tools = self.api.list_tools().await.context("Failed to list tools")?;
        let shown: Vec<_> = tools
            .iter()
            .filter(|t| search.map_or(true, |term| t.matches(term)))
            .collect();
        print!("{}", render_tools(&shown));
        Ok(())
    }

    /// Print one tool in full, configuration included.
    pub async fn tool(&self, id: &str) -> Result<()> {
        let tool = self
            .api
            .get_tool(id)
            .await
            .with_context(|| format!("Failed to fetch tool {id}"))?;
        println!("{}", serde_json::to_string_pretty(&tool)?);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    pub fn history_list(&self) {
        print!("{}", render_history(&self.archive().list()));
    }

    /// Export the `number`-th (1-based) archived run into `dir`.
    pub fn history_export(&self, number: usize, dir: &Path) -> Result<()> {
        let records = self.archive().list();
        let Some(record) = number.checked_sub(1).and_then(|i| records.get(i)) else {
            bail!("No archived run #{number} ({} available)", records.len());
        };
        let path = HistoryArchive::export_to_dir(record, dir)?;
        println!("{}", path.display());
        Ok(())
    }

    pub fn history_clear(&self) {
        self.archive().clear();
        println!("history cleared");
    }

    // -----------------------------------------------------------------------
    // Preferences
    // -----------------------------------------------------------------------

    pub fn set_panel_width(&self, width: u32) -> Result<()> {
        if width == 0 {
            bail!("Panel width must be greater than zero");
        }
        PanelPreferences::new(Arc::clone(&self.store)).set_width(width);
        Ok(())
    }

    pub fn show_panel_width(&self) {
        let width = self.panel_width();
        println!("{width} px ({} columns)", panel_columns(width));
    }
}

fn print_update(update: &WorkflowUpdate) {
    for line in render_update(update) {
        println!("{line}");
    }
}

/// Whether `update` belongs to a run triggered after `baseline` was read.
pub fn run_started(baseline: Option<&WorkflowSnapshot>, update: &WorkflowUpdate) -> bool {
    match update.phase {
        WorkflowPhase::Init | WorkflowPhase::Running => true,
        _ => baseline.is_some_and(|b| *b != *update.snapshot),
    }
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use scout_client::{FileCredentialStore, HtmlPage, ReqwestTransport};
use scout_core::config::{ScoutConfig, parse_endpoint};
use scout_core::dispatch::{ScrapeStatus, TriggerRequest, TriggerResponse, serve, trigger_channel};
use scout_core::extract::RecordExtractor;
use scout_core::ingest::{FollowUp, FollowUpReceiver, FollowUpSender, follow_up_channel};
use scout_core::models::ConnectionStatus;
use scout_core::{
    ConnectionMonitor, IngestionClient, LivenessReporter, ScoutPipeline, TracingIndicator,
    clear_credential, resolve_credential, save_credential,
};

#[derive(Parser)]
#[command(name = "scout", version, about = "Green Candle load board scout")]
struct Cli {
    /// Directory holding the credential store
    #[arg(
        long,
        global = true,
        env = "SCOUT_CREDENTIALS_DIR",
        default_value = ".scout"
    )]
    credentials_dir: PathBuf,

    /// Base URL of the scout service (overrides SCOUT_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a saved load board page, badge it, and send the loads
    Scrape {
        /// HTML file of the load board
        #[arg(short, long)]
        page: PathBuf,

        /// Write the badged page here
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Badge high-value loads without sending anything
    Annotate {
        /// HTML file of the load board
        #[arg(short, long)]
        page: PathBuf,

        /// Write the badged page here (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Probe the service and print the connection status
    Check,

    /// Monitor the connection until interrupted
    Watch {
        /// Scrape this page once the monitor is running
        #[arg(short, long)]
        page: Option<PathBuf>,
    },

    /// Manage the stored API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store a key and check it against the service
    Set {
        /// API key from the Green Candle dashboard
        key: String,
    },
    /// Show the stored key, masked
    Show,
    /// Remove the stored key
    Clear,
}

type Monitor = ConnectionMonitor<ReqwestTransport, FileCredentialStore, TracingIndicator>;
type Pipeline = ScoutPipeline<ReqwestTransport, FileCredentialStore>;

/// Collaborators shared by every command.
struct Scout {
    config: ScoutConfig,
    transport: ReqwestTransport,
    store: FileCredentialStore,
}

impl Scout {
    fn new(cli: &Cli) -> Result<Self> {
        let mut config = ScoutConfig::from_env().context("Invalid SCOUT_* configuration")?;
        if let Some(raw) = &cli.endpoint {
            config.endpoint = parse_endpoint(raw).context("Invalid --endpoint")?;
        }

        let transport = ReqwestTransport::new(config.endpoint.clone())
            .context("Failed to create HTTP client")?;
        let store = FileCredentialStore::new(&cli.credentials_dir);

        tracing::debug!(
            endpoint = %config.endpoint,
            credentials_dir = %cli.credentials_dir.display(),
            "Configured"
        );

        Ok(Self {
            config,
            transport,
            store,
        })
    }

    fn monitor(&self) -> Monitor {
        ConnectionMonitor::new(
            IngestionClient::new(self.transport.clone(), self.store.clone()),
            LivenessReporter::new(self.transport.clone(), self.config.heartbeat()),
            TracingIndicator,
        )
        .with_interval(self.config.probe_interval)
    }

    fn pipeline(&self, follow_ups: FollowUpSender) -> Pipeline {
        let mut extractor = RecordExtractor::new(self.config.equipment_type.clone());
        if let Some(source) = &self.config.load_source {
            extractor = extractor.with_load_source(source.clone());
        }
        let client = IngestionClient::new(self.transport.clone(), self.store.clone())
            .with_follow_ups(follow_ups);
        ScoutPipeline::new(client).with_extractor(extractor)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("scout=info".parse()?)
                .add_directive("scout_core=info".parse()?)
                .add_directive("scout_client=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let scout = Scout::new(&cli)?;

    match cli.command {
        Commands::Scrape { page, out } => cmd_scrape(&scout, &page, out.as_deref()).await?,
        Commands::Annotate { page, out } => cmd_annotate(&scout, &page, out.as_deref()).await?,
        Commands::Check => cmd_check(&scout).await?,
        Commands::Watch { page } => cmd_watch(&scout, page.as_deref()).await?,
        Commands::Key { action } => cmd_key(&scout, action).await?,
    }

    Ok(())
}

fn load_page(path: &Path) -> Result<HtmlPage> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read page: {}", path.display()))?;
    HtmlPage::parse(&html).context("Failed to parse page")
}

fn write_page(page: &HtmlPage, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, page.to_html())
            .with_context(|| format!("Failed to write page: {}", path.display())),
        None => {
            println!("{}", page.to_html());
            Ok(())
        }
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Send one SCRAPE_NOW through the trigger channel and serve it.
async fn scrape_page(
    page: &mut HtmlPage,
    pipeline: &Pipeline,
    monitor: &Monitor,
) -> Result<TriggerResponse> {
    let (handle, inbox) = trigger_channel(1);

    // The handle is dropped once the reply arrives, which ends `serve`.
    let request = async move { handle.request(TriggerRequest::ScrapeNow).await };
    let (response, ()) = tokio::join!(request, serve(inbox, page, pipeline, monitor));

    Ok(response?)
}

fn report_scrape(response: &TriggerResponse) -> Result<()> {
    print_json(response)?;
    match response {
        TriggerResponse::Scrape(reply) if reply.status == ScrapeStatus::Error => {
            anyhow::bail!("{}", reply.error.as_deref().unwrap_or("Scrape failed"))
        }
        _ => Ok(()),
    }
}

/// Handle queued follow-ups before a one-shot command exits.
async fn drain_follow_ups(monitor: &Monitor, follow_ups: &mut FollowUpReceiver) {
    while let Ok(follow_up) = follow_ups.try_recv() {
        match follow_up {
            FollowUp::Recheck => {
                monitor.probe().await;
            }
            FollowUp::Heartbeat => {
                if let Some(handle) = monitor.heartbeat().await {
                    let _ = handle.await;
                }
            }
        }
    }
}

async fn cmd_scrape(scout: &Scout, page_path: &Path, out: Option<&Path>) -> Result<()> {
    let mut page = load_page(page_path)?;
    let (tx, mut rx) = follow_up_channel();
    let pipeline = scout.pipeline(tx);
    let monitor = scout.monitor();

    let response = scrape_page(&mut page, &pipeline, &monitor).await?;
    drain_follow_ups(&monitor, &mut rx).await;

    if let Some(path) = out {
        write_page(&page, Some(path))?;
    }
    report_scrape(&response)
}

async fn cmd_annotate(scout: &Scout, page_path: &Path, out: Option<&Path>) -> Result<()> {
    let mut page = load_page(page_path)?;
    let (tx, _rx) = follow_up_channel();
    let pipeline = scout.pipeline(tx);

    let report = pipeline
        .auto_enhance(&mut page, scout.config.settle_delay)
        .await;
    tracing::info!(
        loads = report.records.len(),
        badges_added = report.badges_added,
        "Page annotated"
    );

    write_page(&page, out)
}

async fn cmd_check(scout: &Scout) -> Result<()> {
    let monitor = scout.monitor();
    let reply = monitor.check().await;
    print_json(&reply)?;
    if !reply.connected {
        anyhow::bail!("{}", reply.message);
    }
    Ok(())
}

async fn cmd_watch(scout: &Scout, page_path: Option<&Path>) -> Result<()> {
    let (tx, rx) = follow_up_channel();
    let pipeline = scout.pipeline(tx);
    let monitor = scout.monitor();
    let cancel_token = CancellationToken::new();

    let shutdown = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
        }
        shutdown.cancel();
    });

    let scan = async {
        let Some(path) = page_path else {
            return Ok(());
        };
        let mut page = load_page(path)?;
        pipeline
            .auto_enhance(&mut page, scout.config.settle_delay)
            .await;
        let response = scrape_page(&mut page, &pipeline, &monitor).await?;
        print_json(&response)
    };

    let (scanned, ()) = tokio::join!(scan, monitor.run(cancel_token.clone(), rx));
    scanned
}

async fn cmd_key(scout: &Scout, action: KeyAction) -> Result<()> {
    match action {
        KeyAction::Set { key } => {
            save_credential(&scout.store, &key)
                .await
                .context("Failed to save API key")?;
            println!("API key saved!");
            cmd_check(scout).await
        }
        KeyAction::Show => {
            match resolve_credential(&scout.store)
                .await
                .context("Failed to read API key")?
            {
                Some(key) => println!("{}", mask(&key)),
                None => println!("No API key configured"),
            }
            Ok(())
        }
        KeyAction::Clear => {
            let status = clear_key(scout).await?;
            println!("API key cleared ({})", status.message());
            Ok(())
        }
    }
}

/// Remove the stored key and refresh the connection status.
async fn clear_key(scout: &Scout) -> Result<ConnectionStatus> {
    clear_credential(&scout.store)
        .await
        .context("Failed to clear API key")?;
    Ok(scout.monitor().probe().await)
}

/// Keep the first four characters of a key visible.
fn mask(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    let hidden = key.chars().count().saturating_sub(4);
    format!("{visible}{}", "*".repeat(hidden))
}

//! Kafka App Harness CLI - Thin driver around ApplicationHarness
//!
//! Each invocation loads the persisted relations and peer store from the
//! state directory, delivers one event or action, and writes the state back.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use kafka_app_harness::{
    Action, ApplicationHarness, FilePeerStore, HarnessConfig, HarnessEvent, RelationRegistry,
    Role,
};
use kafka_harness_client::{ClientFactory, InMemoryBroker};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const RELATIONS_FILE: &str = "relations.json";
const PEER_FILE: &str = "peer.json";
const BROKER_FILE: &str = "broker.json";

#[derive(Parser)]
#[command(name = "kafka-app-harness", about = "Kafka credential negotiation test harness")]
struct Cli {
    /// Harness configuration (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<String>,

    /// Directory holding relations, peer store and in-memory broker state
    #[arg(long, global = true, default_value = ".harness")]
    state_dir: PathBuf,

    /// Client backend used by produce and consume
    #[arg(long, global = true, value_enum, default_value_t = Backend::Memory)]
    backend: Backend,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Memory,
    Kafka,
}

#[derive(Subcommand)]
enum Command {
    /// Mark the harness active
    Start,
    /// Establish a channel for a role
    Relate {
        #[arg(value_parser = parse_role)]
        role: Role,
        /// Remote application name; omit to leave the relation unbound
        #[arg(long)]
        app: Option<String>,
    },
    /// Publish provider data on the newest channel for a role
    Grant {
        #[arg(value_parser = parse_role)]
        role: Role,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        endpoints: Option<String>,
        #[arg(long)]
        tls: Option<String>,
    },
    /// Break the newest channel for a role
    Unrelate {
        #[arg(value_parser = parse_role)]
        role: Role,
    },
    /// Create the topic and produce messages
    Produce,
    /// Consume and require the configured minimum
    Consume,
    /// Print relations and peer data
    Show,
}

fn parse_role(s: &str) -> Result<Role, String> {
    s.parse().map_err(|e: kafka_app_harness::HarnessError| e.to_string())
}

fn client_factory(
    backend: Backend,
    broker: &InMemoryBroker,
) -> anyhow::Result<Arc<dyn ClientFactory>> {
    match backend {
        Backend::Memory => Ok(Arc::new(broker.clone())),
        #[cfg(feature = "rdkafka")]
        Backend::Kafka => Ok(Arc::new(kafka_harness_client::RdKafkaFactory)),
        #[cfg(not(feature = "rdkafka"))]
        Backend::Kafka => Err(kafka_harness_client::ClientError::UnsupportedBackend(
            "built without the rdkafka feature".to_string(),
        )
        .into()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => HarnessConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path))?,
        None => HarnessConfig::default(),
    };

    std::fs::create_dir_all(&cli.state_dir)
        .with_context(|| format!("failed to create {}", cli.state_dir.display()))?;
    let relations_path = cli.state_dir.join(RELATIONS_FILE);
    let broker_path = cli.state_dir.join(BROKER_FILE);

    let broker = InMemoryBroker::load(&broker_path)?;
    let store = Arc::new(FilePeerStore::open(cli.state_dir.join(PEER_FILE)).await?);
    let mut harness = ApplicationHarness::new(config, store, client_factory(cli.backend, &broker)?)?
        .with_registry(RelationRegistry::load(&relations_path)?);

    match cli.command {
        Command::Start => harness.handle(HarnessEvent::Start).await?,
        Command::Relate { role, app } => {
            let id = harness.relate(role, app.as_deref()).await?;
            info!("Established {} channel as relation {}", role, id);
        }
        Command::Grant {
            role,
            username,
            password,
            endpoints,
            tls,
        } => {
            let id = harness.latest_relation(role)?;
            let updates = [
                ("username", username),
                ("password", password),
                ("endpoints", endpoints),
                ("tls", tls),
            ]
            .into_iter()
            .filter(|(_, value)| value.is_some())
            .map(|(key, value)| (key.to_string(), value));
            harness.publish_remote(id, updates).await?;
        }
        Command::Unrelate { role } => {
            let relation_id = harness.latest_relation(role)?;
            harness
                .handle(HarnessEvent::RelationBroken { relation_id })
                .await?;
        }
        Command::Produce => {
            run_action(&harness, Action::Produce, cli.backend, &broker, &broker_path).await?
        }
        Command::Consume => {
            run_action(&harness, Action::Consume, cli.backend, &broker, &broker_path).await?
        }
        Command::Show => {
            let snapshot = harness.store().snapshot().await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "relations": harness.registry(),
                    "peer": snapshot,
                }))?
            );
        }
    }

    save_registry(harness.registry(), &relations_path)
}

/// Run an action, persisting in-memory broker state even when it fails
async fn run_action(
    harness: &ApplicationHarness,
    action: Action,
    backend: Backend,
    broker: &InMemoryBroker,
    broker_path: &Path,
) -> anyhow::Result<()> {
    let outcome = harness.run_action(action).await;
    if backend == Backend::Memory {
        broker.save(broker_path)?;
    }
    println!("{}", serde_json::to_string_pretty(&outcome?)?);
    Ok(())
}

fn save_registry(registry: &RelationRegistry, path: &Path) -> anyhow::Result<()> {
    if path.is_dir() {
        bail!("{} is a directory", path.display());
    }
    registry
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

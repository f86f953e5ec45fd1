// File: viprestore/src/main.rs
use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDateTime, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use viprestore::config::Config;
use viprestore::constants::defaults::CONFIG_DIR;
use viprestore::filter::{self, FilterCriteria, TimeRange};
use viprestore::model::{ServiceId, ServiceRecord, ServiceSnapshot};
use viprestore::path_graph;
use viprestore::{
    BatchOrchestrator, BatchResult, ConfigManager, HttpControllerClient, RemoteClient,
    SelectionFile, Session,
};

/// End timestamps further out than this are shown as open-ended
const FOREVER_THRESHOLD_DAYS: i64 = 3650;

#[derive(Parser)]
#[command(name = "viprestore", version, about = "Save, restore and cancel controller services")]
struct Cli {
    /// Configuration directory
    #[arg(long, global = true, env = "VIPRESTORE_CONFIG_DIR", default_value = CONFIG_DIR)]
    config_dir: PathBuf,

    /// Controller system to use (defaults to default_system)
    #[arg(long, short, global = true)]
    system: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Source expression, e.g. "CAM 1 OR CAM 2"
    #[arg(long)]
    source: Option<String>,

    /// Destination expression
    #[arg(long)]
    dest: Option<String>,

    /// Range start: epoch milliseconds or "YYYY-MM-DD HH:MM" local time
    #[arg(long)]
    after: Option<String>,

    /// Range end: epoch milliseconds or "YYYY-MM-DD HH:MM" local time
    #[arg(long)]
    before: Option<String>,

    /// Allowed profile id (repeatable)
    #[arg(long = "profile")]
    profiles: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured controller systems
    Systems,

    /// List services matching the filters
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Include group services
        #[arg(long)]
        groups: bool,
        /// Print the profile options instead of the services
        #[arg(long)]
        profile_options: bool,
    },

    /// Save matching services to a selection file
    Save {
        /// Destination file
        output: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        /// Restrict to these service ids (repeatable)
        #[arg(long = "id")]
        ids: Vec<ServiceId>,
    },

    /// Re-create services from a selection file
    Restore {
        /// Selection file
        input: PathBuf,
        /// Restore only these entries (repeatable); default is every entry
        #[arg(long = "id")]
        ids: Vec<ServiceId>,
    },

    /// Cancel services
    Cancel {
        /// Service ids to cancel
        #[arg(required = true)]
        ids: Vec<ServiceId>,
    },

    /// Show the main and spare paths of one service
    Graph {
        service_id: ServiceId,
        /// Print the graph as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(config: &Config) -> Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("viprestore=info".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?);

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            fmt()
                .with_env_filter(env_filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
    }
    Ok(())
}

fn parse_time(input: &str) -> Result<i64> {
    if let Ok(ms) = input.trim().parse::<i64>() {
        return Ok(ms);
    }
    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input.trim(), format) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.timestamp_millis())
                .ok_or_else(|| anyhow!("'{}' does not exist in the local time zone", input));
        }
    }
    Err(anyhow!("Cannot parse time '{}'", input))
}

fn format_timestamp(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn format_end(end: Option<i64>) -> String {
    let horizon = Utc::now().timestamp_millis() + FOREVER_THRESHOLD_DAYS * 24 * 60 * 60 * 1000;
    match end {
        Some(end) if end < horizon => format_timestamp(end),
        _ => "∞".to_string(),
    }
}

impl FilterArgs {
    fn criteria(&self) -> Result<FilterCriteria> {
        let mut criteria = FilterCriteria::reset();
        if let Some(source) = &self.source {
            criteria = criteria.with_source(source.clone());
        }
        if let Some(dest) = &self.dest {
            criteria = criteria.with_destination(dest.clone());
        }
        if self.after.is_some() || self.before.is_some() {
            let start = self.after.as_deref().map(parse_time).transpose()?.unwrap_or(i64::MIN);
            let end = self.before.as_deref().map(parse_time).transpose()?.unwrap_or(i64::MAX);
            criteria = criteria.with_time_range(TimeRange::new(start, end));
        }
        if !self.profiles.is_empty() {
            criteria = criteria.with_profiles(self.profiles.iter().cloned());
        }
        Ok(criteria)
    }
}

struct Connection {
    client: Arc<HttpControllerClient>,
    session: Session,
}

async fn connect(config: &Config, system: Option<&str>) -> Result<Connection> {
    let system = config.system(system)?;
    let credentials = system.credentials()?;
    let client = Arc::new(HttpControllerClient::from_config(system, config)?);

    info!("Connecting to {} at {}", system.name, system.controller.base_url);
    let session = client.authenticate(credentials).await?;
    Ok(Connection { client, session })
}

async fn fetch_snapshot(connection: &Connection) -> Result<ServiceSnapshot> {
    let records = connection.client.list_services(&connection.session).await?;
    Ok(ServiceSnapshot::new(records))
}

fn print_records(records: &[ServiceRecord], snapshot: &ServiceSnapshot) {
    for record in records {
        let kind = if record.is_group() { " [group]" } else { "" };
        println!(
            "{}{}  {} -> {}  profile={}  start={}  end={}  state={}",
            record.service_id,
            kind,
            record.from.label,
            record.to.label,
            record.profile.name,
            format_timestamp(record.schedule.start_timestamp),
            format_end(record.schedule.end_timestamp),
            record.allocation_state
        );
        match snapshot.resolve_group_parent(record) {
            Ok(Some(parent)) => println!("    child of group {}", parent.service_id),
            Ok(None) => {}
            Err(e) => warn!("{}", e),
        }
    }
    println!("{} service(s)", records.len());
}

fn print_batch(result: &BatchResult) {
    for outcome in result.outcomes() {
        match (&outcome.remote_id, &outcome.detail) {
            (Some(remote_id), _) => println!("{:?}  {} -> {}", outcome.status, outcome.identifier, remote_id),
            (None, Some(detail)) => println!("{:?}  {}: {}", outcome.status, outcome.identifier, detail),
            (None, None) => println!("{:?}  {}", outcome.status, outcome.identifier),
        }
    }
    println!("{}", result.summary());
}

/// Token that fires on Ctrl-C. Items already in flight still finish.
fn abort_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling pending items");
            trigger.cancel();
        }
    });
    token
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.config_dir).await?;
    let config = config_manager.get_current_config();
    init_logging(&config)?;

    let system = cli.system.as_deref();

    match cli.command {
        Commands::Systems => {
            for name in config.system_names() {
                let system = config.system(Some(name))?;
                let default = if config.default_system.as_deref() == Some(name) { " (default)" } else { "" };
                println!(
                    "{}{}  {}  {}",
                    name,
                    default,
                    system.controller.base_url,
                    system.controller.description.as_deref().unwrap_or("")
                );
            }
        }

        Commands::List {
            filter: filter_args,
            groups,
            profile_options,
        } => {
            let connection = connect(&config, system).await?;
            let snapshot = fetch_snapshot(&connection).await?;

            let base = if groups {
                snapshot.records().to_vec()
            } else {
                snapshot.endpoint_services()
            };

            if profile_options {
                for option in filter::profile_options(&base) {
                    println!("{}  {}", option.id, option.name);
                }
                return Ok(());
            }

            let visible = filter::apply(&base, &filter_args.criteria()?);
            print_records(&visible, &snapshot);
        }

        Commands::Save {
            output,
            filter: filter_args,
            ids,
        } => {
            let connection = connect(&config, system).await?;
            let snapshot = fetch_snapshot(&connection).await?;

            let mut selected = filter::apply(&snapshot.endpoint_services(), &filter_args.criteria()?);
            if !ids.is_empty() {
                selected.retain(|r| ids.contains(&r.service_id));
            }

            let orchestrator = BatchOrchestrator::new(
                connection.client.clone(),
                connection.session.clone(),
                config.max_concurrent_requests,
            );
            let file = orchestrator.save_selection(&selected, &output).await?;
            println!("Saved {} service(s) to {}", file.len(), output.display());
        }

        Commands::Restore { input, ids } => {
            let file = SelectionFile::load(&input).await?;
            let selected: Vec<ServiceId> = if ids.is_empty() {
                file.ids().cloned().collect()
            } else {
                ids
            };

            let connection = connect(&config, system).await?;
            let orchestrator = BatchOrchestrator::new(
                connection.client.clone(),
                connection.session.clone(),
                config.max_concurrent_requests,
            );
            let result = orchestrator
                .restore_selection(&file, &selected, abort_on_ctrl_c())
                .await;
            print_batch(&result);
        }

        Commands::Cancel { ids } => {
            let connection = connect(&config, system).await?;
            // The listing fills the revision cache that cancellation needs.
            let snapshot = fetch_snapshot(&connection).await?;
            for id in &ids {
                if let Some(record) = snapshot.get(id) {
                    if record.is_group() {
                        warn!("{} is a group service; cancelling it affects {} children", id, snapshot.children_of(id).len());
                    }
                }
            }

            let orchestrator = BatchOrchestrator::new(
                connection.client.clone(),
                connection.session.clone(),
                config.max_concurrent_requests,
            );
            let result = orchestrator.cancel_selection(&ids, abort_on_ctrl_c()).await;
            print_batch(&result);
        }

        Commands::Graph { service_id, json } => {
            let connection = connect(&config, system).await?;
            let snapshot = fetch_snapshot(&connection).await?;
            let record = snapshot
                .get(&service_id)
                .ok_or_else(|| anyhow!("Service {} not found on {}", service_id, connection.session.system))?;

            let labels: HashMap<String, String> = snapshot
                .records()
                .iter()
                .flat_map(|r| [&r.from, &r.to])
                .filter(|e| !e.id.is_empty())
                .map(|e| (e.id.clone(), e.label.clone()))
                .collect();
            let graph = path_graph::build_with_labels(&record.resource_allocation, &labels);

            if json {
                println!("{}", serde_json::to_string_pretty(&graph)?);
            } else {
                for (title, edges) in [("main", &graph.main_path), ("spare", &graph.spare_path)] {
                    println!("{} path ({} hops)", title, edges.len());
                    for edge in edges {
                        let label = |id: &str| graph.node(id).map(|n| n.label.clone()).unwrap_or_else(|| id.to_string());
                        println!("  {} -> {}", label(&edge.from_node_id), label(&edge.to_node_id));
                    }
                }
            }
        }
    }

    Ok(())
}

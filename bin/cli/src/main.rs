//! `loanshark`: inspect connector catalogs, check workflows and save them.

mod config;
mod db;
mod error;

use crate::config::CliConfig;
use crate::db::PgWorkflowRepository;
use crate::error::CliError;
use clap::{Parser, Subcommand};
use loanshark_automation::{RecordingOpener, SaveOrchestrator, SaveRequest};
use loanshark_chain::{JsonRpcWallet, WalletClient};
use loanshark_core::WorkflowKey;
use loanshark_integration::{ConnectorCatalog, OperationKind};
use loanshark_notification::HttpNotificationClient;
use loanshark_workflow::{
    InMemoryWorkflowRepository, StepCoordinator, Workflow, WorkflowRepository, WorkflowStore,
};
use rootcause::Report;
use rootcause::prelude::ResultExt;
use sqlx::postgres::PgPoolOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "loanshark", version, about = "Build and save loanshark automations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List connectors and their operations.
    Catalog {
        /// Catalog file; the built-in catalog when omitted.
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the editor flags of each step of a workflow.
    Status {
        /// Workflow JSON file.
        workflow: PathBuf,
        /// Catalog file; the built-in catalog when omitted.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Save a workflow, sync its notifications and register top-ups.
    Save {
        /// Workflow JSON file.
        workflow: PathBuf,
        /// Account saving the workflow (e.g. `eip155:1:0xabc...`).
        #[arg(long)]
        user: String,
        /// Key of the saved workflow being edited; creates a new one when omitted.
        #[arg(long)]
        key: Option<WorkflowKey>,
        /// Skip the on-chain top-up registration.
        #[arg(long)]
        skip_chain: bool,
        /// Catalog file; the built-in catalog when omitted.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Report<CliError>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Cli::parse().command {
        Command::Catalog { path } => list_catalog(path.as_deref()),
        Command::Status { workflow, catalog } => show_status(&workflow, catalog.as_deref()),
        Command::Save {
            workflow,
            user,
            key,
            skip_chain,
            catalog,
        } => save(&workflow, user, key, skip_chain, catalog.as_deref()).await,
    }
}

fn load_catalog(path: Option<&Path>) -> Result<ConnectorCatalog, Report<CliError>> {
    let catalog = match path {
        Some(path) => ConnectorCatalog::from_path(path),
        None => ConnectorCatalog::builtin(),
    };
    catalog.context(CliError::Catalog)
}

fn read_workflow(path: &Path) -> Result<Workflow, Report<CliError>> {
    let file_error = |details: String| CliError::WorkflowFile {
        path: path.to_path_buf(),
        details,
    };
    let json = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
    let workflow = serde_json::from_str(&json).map_err(|e| file_error(e.to_string()))?;
    Ok(workflow)
}

/// Loads a workflow and derives its editor flags from the catalog.
fn prepare_store(
    repository: Arc<dyn WorkflowRepository>,
    workflow: Workflow,
    catalog: &ConnectorCatalog,
) -> WorkflowStore {
    let coordinator = StepCoordinator::for_workflow(&workflow);
    let mut store = WorkflowStore::new(repository, workflow);
    coordinator.sync(&mut store, catalog);
    store
}

fn list_catalog(path: Option<&Path>) -> Result<(), Report<CliError>> {
    let catalog = load_catalog(path)?;
    for connector in catalog.iter() {
        let auth = if connector.requires_authentication() {
            " [auth]"
        } else {
            ""
        };
        println!("{} ({}){auth}", connector.key, connector.name);
        for kind in [OperationKind::Trigger, OperationKind::Action] {
            for operation in connector.operations(kind) {
                println!(
                    "  {:<7} {:<32} {}",
                    kind.to_string(),
                    operation.key,
                    operation.display.label
                );
            }
        }
    }
    Ok(())
}

fn show_status(path: &Path, catalog: Option<&Path>) -> Result<(), Report<CliError>> {
    let catalog = load_catalog(catalog)?;
    let workflow = read_workflow(path)?;
    let store = prepare_store(Arc::new(InMemoryWorkflowRepository::new()), workflow, &catalog);

    for (step_path, step) in store.workflow().steps() {
        let flags = store.step_flags(step_path);
        println!(
            "{:<11} {}/{}: selected={} authenticated={} configured={} tested={}",
            step_path.to_string(),
            step.connector,
            step.operation,
            flags.selected,
            flags.authenticated,
            flags.configured,
            flags.tested,
        );
    }
    println!("ready to save: {}", store.ready_to_save());
    Ok(())
}

async fn connect_repository(
    config: &CliConfig,
) -> Result<Arc<dyn WorkflowRepository>, Report<CliError>> {
    let Some(database_url) = &config.database_url else {
        warn!("DATABASE_URL not set, workflows are kept in memory");
        return Ok(Arc::new(InMemoryWorkflowRepository::new()));
    };
    let database = |e: &dyn std::fmt::Display| CliError::Database {
        details: e.to_string(),
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|e| database(&e))?;
    info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| database(&e))?;
    Ok(Arc::new(PgWorkflowRepository::new(pool)))
}

async fn save(
    path: &Path,
    user: String,
    route_key: Option<WorkflowKey>,
    skip_chain: bool,
    catalog: Option<&Path>,
) -> Result<(), Report<CliError>> {
    let config = CliConfig::from_env().map_err(|e| CliError::Config {
        details: e.to_string(),
    })?;
    info!("Loaded configuration");
    let catalog = load_catalog(catalog)?;
    let mut workflow = read_workflow(path)?;
    if let Some(key) = &route_key {
        workflow.key = Some(key.clone());
    }

    let repository = connect_repository(&config).await?;
    let mut store = prepare_store(repository, workflow, &catalog);

    let notifications = HttpNotificationClient::new(&config.notification).context(CliError::Client {
        backend: "notification",
    })?;
    let wallet = if skip_chain {
        None
    } else {
        Some(JsonRpcWallet::new(&config.chain).context(CliError::Client { backend: "wallet" })?)
    };
    let opener = RecordingOpener::new();
    let orchestrator = SaveOrchestrator::new(
        Arc::new(notifications),
        Arc::new(opener.clone()),
        config.telegram,
    );

    let outcome = orchestrator
        .save(
            &mut store,
            SaveRequest { route_key, user },
            wallet.as_ref().map(|wallet| wallet as &dyn WalletClient),
        )
        .await
        .context(CliError::Save)?;

    println!("key: {}", outcome.key);
    println!("state: {}", store.workflow().state);
    println!("notification: {:?}", outcome.notification);
    println!("pipeline: {}", outcome.pipeline);
    for link in opener.opened() {
        println!("open: {link}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use loanshark_workflow::{Step, StepPath};
    use std::io::Write;

    fn workflow() -> Workflow {
        Workflow::new(
            "eip155:1:0xabc",
            Step::trigger("aave", "changeInHealthFactor").with_input("healthFactorIsBelow", "1.2"),
        )
        .with_action(Step::action("telegram", "subscribe").with_input("username", "alice"))
    }

    #[test]
    fn reads_workflow_files() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{}", serde_json::to_string(&workflow()).expect("serialize")).expect("write");
        assert_eq!(read_workflow(file.path()).expect("read"), workflow());
    }

    #[test]
    fn unreadable_workflow_files_fail() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = read_workflow(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err.current_context(), CliError::WorkflowFile { .. }));

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{{\"trigger\": 1}}").expect("write");
        assert!(read_workflow(file.path()).is_err());
    }

    #[test]
    fn new_workflows_need_action_tests() {
        let catalog = ConnectorCatalog::builtin().expect("catalog");
        let store = prepare_store(Arc::new(InMemoryWorkflowRepository::new()), workflow(), &catalog);

        assert!(store.step_flags(StepPath::Trigger).is_complete());
        let action = store.step_flags(StepPath::Action(0));
        assert!(action.configured);
        assert!(!action.tested);
        assert!(!store.ready_to_save());
    }

    #[test]
    fn saved_workflows_skip_action_tests() {
        let catalog = ConnectorCatalog::builtin().expect("catalog");
        let mut saved = workflow();
        saved.key = Some("staging-saved".parse().expect("key"));
        let store = prepare_store(Arc::new(InMemoryWorkflowRepository::new()), saved, &catalog);

        assert!(store.ready_to_save());
    }
}

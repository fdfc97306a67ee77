//! # Record Relay CLI
//!
//! Operator command-line interface for the record relay pipeline.
//!
//! This module provides CLI commands for:
//! - Dispatching a batch of change-event records downstream
//! - Creating PENDING records the way the intake API does
//! - Inspecting stored delivery status
//! - Validating configuration

use clap::{Parser, Subcommand};
use record_relay_core::{
    create_record, decode, validate_request_body, BatchDispatcher, ChangeNotification,
    DispatchError, EventProcessor, FilesystemStatusStore, HttpDeliveryClient, RawEventRecord,
    StatusStore, StatusStoreError,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod config;

pub use crate::config::{load_configuration, ConfigError, RelayConfig};

// ============================================================================
// CLI Structure
// ============================================================================

/// Record Relay CLI - change-event delivery to a GraphQL service
#[derive(Parser)]
#[command(name = "record-relay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deliver newly created records to a GraphQL service and track their status")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "RECORD_RELAY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level; overrides the configured level
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Deliver a batch of raw event records
    Dispatch {
        /// JSON array of `{messageId?, body}` records; `-` reads stdin
        #[arg(short, long)]
        batch: String,
    },

    /// Create a PENDING record from an intake request
    Create {
        /// JSON `{id, name, body, timestamp}` request; `-` reads stdin
        #[arg(short, long)]
        request: String,

        /// Also print the INSERT record a change stream would emit
        #[arg(short, long)]
        emit: bool,
    },

    /// Show the stored record for an id
    Status {
        /// Record id
        id: String,
    },

    /// Validate configuration
    Config {
        /// Show resolved configuration
        #[arg(short, long)]
        show: bool,
    },
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Logging setup failed: {message}")]
    Logging { message: String },

    #[error("Dispatch rejected: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Status store error: {0}")]
    Store(#[from] StatusStoreError),

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Logging { .. } => 1,
            Self::Dispatch(_) => 2,
            Self::Store(_) => 3,
            Self::InvalidArgument { .. } => 4,
            Self::Io(_) => 5,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    run(Cli::parse()).await
}

/// Execute a parsed command line
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_configuration(cli.config.as_deref())?;

    initialize_logging(&cli, &config)?;

    execute(cli.command, &config).await
}

/// Execute one command against a resolved configuration
pub async fn execute(command: Commands, config: &RelayConfig) -> Result<(), CliError> {
    match command {
        Commands::Dispatch { batch } => execute_dispatch_command(&batch, config).await,
        Commands::Create { request, emit } => {
            execute_create_command(&request, emit, config).await
        }
        Commands::Status { id } => execute_status_command(&id, config).await,
        Commands::Config { show } => execute_config_command(show, config),
    }
}

/// Initialize logging
///
/// `RUST_LOG` wins over `--log-level`, which wins over `logging.level`.
fn initialize_logging(cli: &Cli, config: &RelayConfig) -> Result<(), CliError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
            EnvFilter::try_new(level).map_err(|e| CliError::InvalidArgument {
                arg: "log-level".to_string(),
                message: e.to_string(),
            })?
        }
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = if cli.json_logs || config.logging.json_format {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| CliError::Logging {
        message: e.to_string(),
    })
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn execute_dispatch_command(batch: &str, config: &RelayConfig) -> Result<(), CliError> {
    config.validate()?;

    let records = parse_batch(&read_input(batch).await?)?;
    info!(
        record_count = records.len(),
        table = %config.store.table_name,
        "Dispatching batch from CLI"
    );

    let delivery_client =
        HttpDeliveryClient::new(config.delivery.client_config()).map_err(|e| {
            ConfigError::Invalid {
                key: "delivery".to_string(),
                message: e.to_string(),
            }
        })?;
    let status_store = open_store(config).await?;

    let processor = EventProcessor::new(
        Arc::new(delivery_client),
        Arc::new(status_store),
        config.processing.brand.clone(),
    )
    .with_decode_failure_policy(config.processing.decode_failure_policy);
    let dispatcher = BatchDispatcher::new(Arc::new(processor));

    let summary = dispatcher
        .dispatch(
            records,
            &config.delivery.endpoint,
            &config.store.table_name,
        )
        .await?;

    print_json(&summary)
}

async fn execute_create_command(
    request: &str,
    emit: bool,
    config: &RelayConfig,
) -> Result<(), CliError> {
    let input = read_input(request).await?;
    let intake_request = validate_request_body(Some(&input))
        .map_err(|e| CliError::InvalidArgument {
            arg: "request".to_string(),
            message: e.to_string(),
        })?
        .ok_or_else(|| CliError::InvalidArgument {
            arg: "request".to_string(),
            message: "Invalid request body or missing required fields".to_string(),
        })?;

    let store = open_store(config).await?;
    let document = create_record(&store, &config.store.table_name, &intake_request).await?;

    let record = if emit {
        let notification = ChangeNotification::insert(&document);
        Some(RawEventRecord::from_notification(&notification).map_err(std::io::Error::from)?)
    } else {
        None
    };

    print_json(&CreateOutput {
        message: "Item inserted successfully",
        item: record_relay_core::encode(&document),
        record,
    })
}

async fn execute_status_command(id: &str, config: &RelayConfig) -> Result<(), CliError> {
    let store = open_store(config).await?;

    let stored = store
        .get(&config.store.table_name, id)
        .await?
        .ok_or_else(|| CliError::InvalidArgument {
            arg: "id".to_string(),
            message: format!(
                "no record '{}' in table '{}'",
                id, config.store.table_name
            ),
        })?;

    print_json(&StatusOutput {
        id,
        status: stored.status().map(|s| s.as_str()),
        document: decode(&stored),
        record: &stored,
    })
}

fn execute_config_command(show: bool, config: &RelayConfig) -> Result<(), CliError> {
    config.validate()?;
    info!("Configuration is valid");

    if show {
        print_json(config)?;
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

#[derive(Serialize)]
struct CreateOutput {
    message: &'static str,
    item: record_relay_core::StoredRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<RawEventRecord>,
}

#[derive(Serialize)]
struct StatusOutput<'a> {
    id: &'a str,
    status: Option<&'static str>,
    document: Option<record_relay_core::Document>,
    record: &'a record_relay_core::StoredRecord,
}

async fn open_store(config: &RelayConfig) -> Result<FilesystemStatusStore, CliError> {
    Ok(FilesystemStatusStore::new(config.store.data_dir.clone()).await?)
}

/// Read a file, or stdin when `source` is `-`
async fn read_input(source: &str) -> Result<String, CliError> {
    if source == "-" {
        let mut buffer = String::new();
        tokio::io::stdin().read_to_string(&mut buffer).await?;
        Ok(buffer)
    } else {
        Ok(tokio::fs::read_to_string(source).await?)
    }
}

/// Parse a JSON array of raw event records
pub fn parse_batch(input: &str) -> Result<Vec<RawEventRecord>, CliError> {
    serde_json::from_str(input).map_err(|e| CliError::InvalidArgument {
        arg: "batch".to_string(),
        message: format!("expected a JSON array of records: {}", e),
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{}", text);
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// crates/catalogue-cli/src/main.rs
// ============================================================================
// Module: Catalogue CLI Entry Point
// Description: Command dispatcher for the catalogue server and schema admin.
// Purpose: Start the server and manage stored schemas from the command line.
// Dependencies: clap, catalogue-config, catalogue-server, serde_json, tokio
// ============================================================================

//! ## Overview
//! The `catalogue` binary starts the HTTP server, validates configuration
//! files, and administers the JSON Schemas the validation stage reads.
//! Schema commands open the configured durable store directly through the
//! store adapter, so they share its reserved-character codec and upsert
//! semantics. Security posture: file inputs are untrusted and read with a
//! hard size limit.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use catalogue_config::CatalogueConfig;
use catalogue_config::StoreType;
use catalogue_core::Document;
use catalogue_server::CatalogueServer;
use catalogue_server::adapter::CatalogueStore;
use catalogue_server::server::build_catalogue_store;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a schema file accepted by `schema put`.
const MAX_SCHEMA_FILE_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "catalogue", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the catalogue HTTP server.
    Serve(ConfigArgs),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Schema administration against the configured store.
    Schema {
        /// Selected schema subcommand.
        #[command(subcommand)]
        command: SchemaCommand,
    },
}

/// Shared `--config` argument.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Path to `catalogue.toml` (falls back to `CATALOGUE_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a configuration file.
    Validate(ConfigArgs),
}

/// Schema subcommands.
#[derive(Subcommand, Debug)]
enum SchemaCommand {
    /// Store a schema document under an item-type id.
    Put(SchemaPutCommand),
    /// Print the schema stored under an id.
    Get(SchemaIdCommand),
    /// Remove the schema stored under an id.
    Remove(SchemaIdCommand),
}

/// Arguments for `schema put`.
#[derive(Args, Debug)]
struct SchemaPutCommand {
    /// Configuration selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Schema id, normally the item-type it validates.
    #[arg(long)]
    id: String,
    /// JSON Schema file.
    #[arg(long, value_name = "PATH")]
    file: PathBuf,
}

/// Arguments for `schema get` and `schema remove`.
#[derive(Args, Debug)]
struct SchemaIdCommand {
    /// Configuration selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Schema id.
    #[arg(long)]
    id: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying the message printed to stderr.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the selected command.
async fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Serve(args) => command_serve(&args).await,
        Commands::Config {
            command: ConfigCommand::Validate(args),
        } => command_config_validate(&args),
        Commands::Schema {
            command,
        } => command_schema(command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    let bind = config.server.bind.clone();
    let server = CatalogueServer::from_config(config)
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    write_stdout_line(&format!("catalogue listening on {bind}"))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Executes `config validate`.
fn command_config_validate(args: &ConfigArgs) -> CliResult<ExitCode> {
    let _config = load_config(args)?;
    write_stdout_line("config ok")?;
    Ok(ExitCode::SUCCESS)
}

/// Loads configuration using the standard resolution rules.
fn load_config(args: &ConfigArgs) -> CliResult<CatalogueConfig> {
    CatalogueConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("config load failed: {err}")))
}

// ============================================================================
// SECTION: Schema Commands
// ============================================================================

/// Dispatches schema subcommands.
fn command_schema(command: SchemaCommand) -> CliResult<ExitCode> {
    match command {
        SchemaCommand::Put(command) => command_schema_put(&command),
        SchemaCommand::Get(command) => command_schema_get(&command),
        SchemaCommand::Remove(command) => command_schema_remove(&command),
    }
}

/// Executes `schema put`.
fn command_schema_put(command: &SchemaPutCommand) -> CliResult<ExitCode> {
    let store = open_schema_store(&command.config)?;
    let schema = load_schema_file(&command.file, &command.id)?;
    store
        .write_schema(&schema)
        .map_err(|err| CliError::new(format!("schema write failed: {err}")))?;
    write_stdout_line(&format!("schema {} stored", command.id))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `schema get`.
fn command_schema_get(command: &SchemaIdCommand) -> CliResult<ExitCode> {
    let store = open_schema_store(&command.config)?;
    let schema = store
        .read_schema(&command.id)
        .map_err(|err| CliError::new(format!("schema read failed: {err}")))?
        .ok_or_else(|| CliError::new(format!("schema {} not found", command.id)))?;
    let rendered = serde_json::to_string_pretty(&Value::Object(schema))
        .map_err(|err| CliError::new(format!("schema render failed: {err}")))?;
    write_stdout_line(&rendered)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `schema remove`.
fn command_schema_remove(command: &SchemaIdCommand) -> CliResult<ExitCode> {
    let store = open_schema_store(&command.config)?;
    let removed = store
        .delete_schema(&command.id)
        .map_err(|err| CliError::new(format!("schema remove failed: {err}")))?;
    write_stdout_line(&format!("removed {removed} schema document(s)"))?;
    Ok(ExitCode::SUCCESS)
}

/// Opens the configured store for schema administration.
///
/// The in-memory store lives only inside a running server, so schema
/// commands require a durable backend.
fn open_schema_store(args: &ConfigArgs) -> CliResult<CatalogueStore> {
    let config = load_config(args)?;
    if config.store.store_type == StoreType::Memory {
        return Err(CliError::new("schema commands require a sqlite store"));
    }
    build_catalogue_store(&config.store)
        .map_err(|err| CliError::new(format!("store open failed: {err}")))
}

/// Reads a schema file and stamps `id` onto it.
fn load_schema_file(path: &Path, id: &str) -> CliResult<Document> {
    let bytes = read_bytes_with_limit(path, MAX_SCHEMA_FILE_BYTES).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "{} is {size} bytes; schema files are limited to {limit} bytes",
            path.display()
        )),
    })?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("schema file is not valid json: {err}")))?;
    let Value::Object(mut schema) = value else {
        return Err(CliError::new("schema file must contain a json object"));
    };
    schema.insert("id".to_string(), Value::String(id.to_string()));
    Ok(schema)
}

// ============================================================================
// SECTION: I/O Helpers
// ============================================================================

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "{message}");
    ExitCode::FAILURE
}

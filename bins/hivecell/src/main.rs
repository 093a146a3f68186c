use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand};
use hivecell_codec::{CodecError, FieldSchema};
use hivecell_engine::EngineError;
use hivecell_engine::catalog::StaticCatalog;
use hivecell_engine::config::HivecellConfig;
use hivecell_engine::json::{json_to_value, value_to_json};
use hivecell_engine::table::TableDescriptor;

#[derive(Parser)]
#[command(name = "hivecell", about = "Hive row format cell codec")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode a JSON value and print the cell bytes as base64.
    Encode {
        /// Hive type string, e.g. `map<string,bigint>`.
        #[arg(long = "type")]
        type_str: String,
        #[arg(long)]
        json: String,
        /// Nesting level; table columns are 1.
        #[arg(long, default_value_t = 1)]
        level: usize,
    },
    /// Decode base64 cell bytes and print the value as JSON.
    Decode {
        #[arg(long = "type")]
        type_str: String,
        #[arg(long)]
        base64: String,
        #[arg(long, default_value_t = 1)]
        level: usize,
    },
    /// List the tables declared in a configuration file.
    Tables {
        /// Path to TOML configuration file.
        #[arg(long, default_value = "hivecell.toml", env = "HIVECELL_CONFIG")]
        config: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid base64 input: {0}")]
    Base64(#[from] base64::DecodeError),
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        tracing::error!(error = %e, "command failed");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Encode { type_str, json, level } => {
            let field = FieldSchema::parse("value", &type_str)?;
            let json: serde_json::Value = serde_json::from_str(&json)?;
            let value = json_to_value(&field, &json)?;
            match hivecell_codec::encode(&field, None, &value, level)? {
                Some(bytes) => println!("{}", STANDARD.encode(bytes)),
                None => tracing::info!(field_type = %field.field_type, "value is null, no cell written"),
            }
        }
        Command::Decode { type_str, base64, level } => {
            let field = FieldSchema::parse("value", &type_str)?;
            let bytes = STANDARD.decode(base64.trim())?;
            let value = hivecell_codec::decode(&field, None, Some(bytes.as_slice()), level)?;
            println!("{}", value_to_json(&value));
        }
        Command::Tables { config } => {
            tracing::info!(config = %config, "loading configuration");
            let config = HivecellConfig::load(&config)?;
            let catalog = StaticCatalog::from_config(&config)?;
            for table in catalog.tables() {
                print_table(table)?;
            }
        }
    }
    Ok(())
}

fn print_table(table: &TableDescriptor) -> Result<(), CliError> {
    println!("{} (storage: {})", table.qualified_name(), table.storage_table_name());
    println!("  key fields: {}", table.key_fields().join(", "));

    print_column(table.key_column(), "row key");
    for (column, column_ref) in table.value_columns()? {
        print_column(column, &column_ref.to_string());
    }
    Ok(())
}

fn print_column(column: &FieldSchema, placement: &str) {
    match &column.comment {
        Some(comment) => println!("  {} {} -> {placement}  # {comment}", column.name, column.field_type),
        None => println!("  {} {} -> {placement}", column.name, column.field_type),
    }
}

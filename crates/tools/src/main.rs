//! Stockroom tool runner
//!
//! Lists the catalog tools or runs one against the configured API and prints
//! the resulting envelope.

use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;

use stockroom_observability::LogFormat;
use stockroom_tools::{table, ApiClient, ToolRegistry, ToolsConfig};

#[derive(Parser)]
#[command(name = "stockroom-tools")]
#[command(about = "Call catalog tools against a running Stockroom API")]
#[command(version)]
struct Cli {
    /// Log output format (json or pretty)
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered tools
    List,

    /// Run one tool
    Call {
        /// Tool name, e.g. "update_stock"
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,

        /// Print list results as a table instead of the raw envelope
        #[arg(long = "table")]
        as_table: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    stockroom_observability::init(cli.log_format);

    let config = ToolsConfig::from_env()?;
    let registry = ToolRegistry::new(ApiClient::new(&config)?);

    match cli.command {
        Commands::List => {
            for spec in registry.specs() {
                println!("{:<24} {}", spec.name, spec.description);
            }
        }
        Commands::Call { tool, args, as_table } => {
            let args: JsonValue = serde_json::from_str(&args)
                .map_err(|e| anyhow::anyhow!("tool arguments are not valid JSON: {e}"))?;
            let envelope = registry.call(&tool, args).await;

            match (&envelope.data, as_table) {
                (Some(data), true) if envelope.success => println!("{}", table::render(data)),
                _ => println!("{}", serde_json::to_string_pretty(&envelope)?),
            }
            if !envelope.success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

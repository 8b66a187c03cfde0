//! EasyMCP server — entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use easymcp_server::config::ServerConfig;
use easymcp_server::protocol::ProtocolHandler;
use easymcp_server::provider::BuiltinProvider;
use easymcp_server::tools::ToolRegistry;
use easymcp_server::transport::StdioTransport;

#[derive(Parser)]
#[command(
    name = "easymcp-server",
    about = "Model Context Protocol server with a bundled demo provider",
    version
)]
struct Cli {
    /// Path to a JSON server configuration file.
    /// Falls back to the EASYMCP_CONFIG env var.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdio (default).
    Serve,

    /// Print server identity, capabilities, and tools as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   easymcp-server completions bash > ~/.local/share/bash-completion/completions/easymcp-server
    ///   easymcp-server completions zsh > ~/.zfunc/_easymcp-server
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let config = ServerConfig::resolve(cli.config.as_deref())?;
            tracing::info!(
                "EasyMCP server (protocol {}, timeout {} ms)",
                config.protocol,
                config.timeout_ms
            );
            let handler = ProtocolHandler::new(
                config,
                Arc::new(BuiltinProvider::new()),
                Arc::new(StdioTransport::new()),
            );
            handler.start().await?;
        }

        Commands::Info => {
            let config = ServerConfig::resolve(cli.config.as_deref())?;
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "protocol_version": config.protocol,
                "capabilities": config.capabilities(),
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "easymcp-server", &mut std::io::stdout());
        }
    }

    Ok(())
}

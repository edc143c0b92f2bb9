//! AgenticWeChat MCP Server: entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use agentic_wechat::CacheStore;
use agentic_wechat_mcp::config::{client_config_from_env, resolve_cache_dir};
use agentic_wechat_mcp::protocol::ProtocolHandler;
use agentic_wechat_mcp::service::ServiceContext;
use agentic_wechat_mcp::tools::ToolRegistry;
use agentic_wechat_mcp::transport::StdioTransport;

#[derive(Parser)]
#[command(
    name = "agentic-wechat-mcp",
    about = "MCP server for AgenticWeChat: WeChat Official Account articles and public article search",
    version
)]
struct Cli {
    /// Cache directory (default: $WECHAT_CACHE_DIR or ~/.agentic-wechat/cache).
    #[arg(long)]
    cache_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve {
        /// Cache directory.
        #[arg(long)]
        cache_dir: Option<String>,
    },

    /// Print server capabilities and tools as JSON.
    Info,

    /// Delete expired entries from the cache directory.
    PruneCache {
        /// Cache directory.
        #[arg(long)]
        cache_dir: Option<String>,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   agentic-wechat-mcp completions bash > ~/.local/share/bash-completion/completions/agentic-wechat-mcp
    ///   agentic-wechat-mcp completions zsh > ~/.zfunc/_agentic-wechat-mcp
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

    match cli.command.unwrap_or(Commands::Serve { cache_dir: None }) {
        Commands::Serve { cache_dir } => {
            let dir = resolve_cache_dir(cache_dir.or(cli.cache_dir).as_deref());
            let services = ServiceContext::open(&dir, &client_config_from_env())?;
            let handler = ProtocolHandler::new(Arc::new(services));
            tracing::info!("AgenticWeChat MCP server");
            StdioTransport::new(handler).run().await?;
        }

        Commands::Info => {
            let capabilities = agentic_wechat_mcp::types::InitializeResult::default_result();
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::PruneCache { cache_dir } => {
            let dir = resolve_cache_dir(cache_dir.or(cli.cache_dir).as_deref());
            let cache = CacheStore::new(&dir)?;
            let removed = cache.clear_expired();
            println!("Removed {removed} expired entries from {}", dir.display());
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(
                shell,
                &mut cmd,
                "agentic-wechat-mcp",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

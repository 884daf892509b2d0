use std::path::PathBuf;

use clap::Parser;
use minigpt_config::{expand_tilde, ConfigManager};
use minigpt_observability::init_logging;
use minigpt_server::{run_server, AppState};

#[derive(Parser, Debug, Clone)]
#[command(name = "minigpt-server")]
#[command(about = "Proxy for an OpenAI-compatible chat completion API")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(long, env = "MINIGPT_CONFIG", default_value = "~/.minigpt/config.json")]
    config: String,

    /// Listen host (overrides config)
    #[arg(long, env = "MINIGPT_HOST")]
    host: Option<String>,

    /// Listen port (overrides config)
    #[arg(long, env = "MINIGPT_PORT")]
    port: Option<u16>,

    /// Upstream API base URL (overrides config)
    #[arg(long, env = "MINIGPT_UPSTREAM_URL")]
    upstream_url: Option<String>,

    /// Upstream bearer token (overrides config)
    #[arg(long, env = "MINIGPT_UPSTREAM_TOKEN", hide_env_values = true)]
    upstream_token: Option<String>,

    /// Log level (overrides config)
    #[arg(long, env = "MINIGPT_LOG")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = expand_tilde(&cli.config).unwrap_or_else(|| PathBuf::from(&cli.config));
    let mut config = ConfigManager::load(&config_path).await?.snapshot().await;

    // CLI flags win over the file for this run only
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(url) = cli.upstream_url {
        config.upstream.base_url = url;
    }
    if let Some(token) = cli.upstream_token {
        config.upstream.token = Some(token);
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level.parse()?;
    }
    ConfigManager::validate(&config)?;

    let _log_manager = init_logging(&config.logging)?;
    tracing::info!("Config loaded from {:?}", config_path);

    match config.upstream.bearer_token() {
        Ok(_) => tracing::info!("Forwarding to {}", config.upstream.chat_completions_url()),
        Err(e) => tracing::error!(
            "{}; every chat request will be answered with 500 until it is set",
            e
        ),
    }

    let state = AppState::new(config.upstream.clone())?;
    run_server(state, &config.server.host, config.server.port, config.server.cors).await
}

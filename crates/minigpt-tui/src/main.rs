use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use minigpt_config::{default_log_dir, expand_tilde, ConfigManager};
use minigpt_llm::CompletionClient;
use minigpt_observability::init_logging;
use minigpt_session::{ConversationStore, FileBackend, StorageBackend, StoreOptions};
use ratatui::{backend::CrosstermBackend, Terminal};

mod app;
mod controller;
mod ui;

use app::App;
use controller::Controller;

#[derive(Parser, Debug)]
#[command(name = "minigpt")]
#[command(about = "Terminal chat client for the minigpt proxy")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(long, env = "MINIGPT_CONFIG", default_value = "~/.minigpt/config.json")]
    config: String,

    /// Proxy base URL (overrides config)
    #[arg(long, env = "MINIGPT_SERVER_URL")]
    server_url: Option<String>,

    /// Directory holding saved conversations (overrides config)
    #[arg(long, env = "MINIGPT_DATA_DIR")]
    data_dir: Option<String>,

    /// Log level (overrides config)
    #[arg(long, env = "MINIGPT_LOG")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = expand_tilde(&cli.config).unwrap_or_else(|| PathBuf::from(&cli.config));
    let mut config = ConfigManager::load(&config_path).await?.snapshot().await;

    if let Some(url) = cli.server_url {
        config.client.server_url = url;
    }
    if let Some(dir) = cli.data_dir {
        config.client.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level.parse()?;
    }
    ConfigManager::validate(&config)?;

    // stdout belongs to the terminal UI
    if config.logging.dir.is_none() {
        config.logging.dir = default_log_dir().map(|dir| dir.to_string_lossy().into_owned());
    }
    let _log_manager = init_logging(&config.logging)?;

    let data_dir = expand_tilde(&config.client.data_dir)
        .ok_or_else(|| anyhow::anyhow!("cannot resolve data dir {}", config.client.data_dir))?;
    let store = ConversationStore::new(FileBackend::new(data_dir.clone())?, StoreOptions::default());
    let api = Arc::new(CompletionClient::new(config.client.server_url.clone()));

    let mut controller = Controller::new(store, api);
    controller.load();
    let mut app = App::new(controller, config.client.server_url.clone());
    tracing::info!(
        "Client started against {}, data in {:?}",
        config.client.server_url,
        data_dir
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let res = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        tracing::error!("Terminal loop failed: {}", err);
    }
    res.map_err(Into::into)
}

async fn run_app<T: ratatui::backend::Backend, B: StorageBackend>(
    terminal: &mut Terminal<T>,
    app: &mut App<B>,
) -> io::Result<()> {
    let mut last_tick = tokio::time::Instant::now();
    let tick_rate = tokio::time::Duration::from_millis(100);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| tokio::time::Duration::from_secs(0));

        // Polling blocks, so give spawned tasks a chance to run first
        tokio::task::yield_now().await;
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(key) {
                    return Ok(());
                }
            }
        }

        app.process_events();

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = tokio::time::Instant::now();
        }
    }
}

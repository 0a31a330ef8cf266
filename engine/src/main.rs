// Growhost host-registry bot
// Main entry point for the growhost binary

use std::sync::Arc;

use clap::Parser;
use growhost_engine::bot::TelegramBot;
use growhost_engine::cli::{Cli, Command, ConfigAction};
use growhost_engine::config::Config;
use growhost_engine::conversation::Controller;
use growhost_engine::service::HostService;
use growhost_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // CLI flag wins over config; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::info!("Growhost v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Start => run(config).await,

        Command::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigAction::Path => {
                println!("{}", Config::default_config_path()?.display());
                Ok(())
            }
        },
    }
}

/// Run the bot polling loop and, when enabled, the host file server.
async fn run(config: Config) -> anyhow::Result<()> {
    let token = Config::bot_token()?;

    let service = HostService::open(config.users_path(), config.hosts_dir()).await?;
    let controller = Arc::new(Controller::open(service, config.state_path()).await?);

    if config.server.enabled {
        let addr = config.server_addr()?;
        let hosts_dir = config.hosts_dir();

        tokio::spawn(async move {
            if let Err(e) = host_server::serve(addr, hosts_dir).await {
                tracing::error!("Host file server failed: {}", e);
            }
        });
    }

    let bot = TelegramBot::new(token, controller)
        .with_banner_url(config.telegram.banner_url.clone())
        .with_poll_timeout(config.telegram.poll_timeout_secs);

    bot.start_polling().await?;
    Ok(())
}

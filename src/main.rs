mod cli;

use clap::Parser;
use cli::{AddressCommands, Cli, Commands, DbCommands};
use forwarder_core::config::Config;
use forwarder_core::db::{self, ForwardingAddressStore};
use forwarder_core::services::CallbackNotifier;
use forwarder_core::{create_app, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli_args = Cli::parse();

    let config_info = Config::from_env()?;
    tracing::info!(
        profile = config_info.profile.as_str(),
        overrides = config_info.overrides.len(),
        "Configuration loaded"
    );

    match cli_args.command {
        Some(Commands::Serve) | None => serve(config_info.config).await,
        Some(Commands::Db(DbCommands::Migrate)) => {
            cli::handle_db_migrate(&config_info.config).await
        }
        Some(Commands::Config) => cli::handle_config_validate(&config_info),
        Some(Commands::Address(AddressCommands::Show { id })) => {
            cli::handle_address_show(&config_info.config, id).await
        }
        Some(Commands::Address(AddressCommands::Unconfirmed)) => {
            cli::handle_address_unconfirmed(&config_info.config).await
        }
        Some(Commands::Address(AddressCommands::CallbackUrl { id })) => {
            cli::handle_address_callback_url(&config_info.config, id).await
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::create_pool(&config).await?;

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let store = ForwardingAddressStore::new(pool);

    let notifier = CallbackNotifier::new(
        store.clone(),
        config.callback_poll_interval_secs,
        config.callback_timeout_secs,
    );
    tokio::spawn(notifier.start());

    let app_state = AppState {
        store,
        start_time: std::time::Instant::now(),
    };
    let app = create_app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use clap::{Parser, Subcommand};
use forwarder_core::callback::build_callback_url;
use forwarder_core::config::{Config, ConfigInfo};
use forwarder_core::db::{self, ForwardingAddressStore};
use forwarder_core::schemas::ForwardingAddressSchema;
use futures::TryStreamExt;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "forwarder-core")]
#[command(about = "Forwarder Core - Crypto Forwarding Address Service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server and callback notifier (default)
    Serve,

    /// Forwarding address inspection commands
    #[command(subcommand)]
    Address(AddressCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum AddressCommands {
    /// Show a forwarding address by ID
    Show {
        /// Forwarding address UUID
        #[arg(value_name = "ID")]
        id: Uuid,
    },

    /// List records awaiting client callback confirmation
    Unconfirmed,

    /// Print the callback URL that would be delivered for a record
    CallbackUrl {
        /// Forwarding address UUID
        #[arg(value_name = "ID")]
        id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    tracing::info!("Database migrations completed");
    println!("✓ Database migrations completed");

    Ok(())
}

pub fn handle_config_validate(info: &ConfigInfo) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Profile: {}", info.profile.as_str());
    println!("  Server Port: {}", info.config.server_port);
    println!("  Database URL: {}", info.config.database_url);
    println!(
        "  Callback Poll Interval: {}s",
        info.config.callback_poll_interval_secs
    );
    println!("  Callback Timeout: {}s", info.config.callback_timeout_secs);
    if !info.overrides.is_empty() {
        println!(
            "  Overridden from environment: {}",
            info.overrides.join(", ")
        );
    }

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

pub async fn handle_address_show(config: &Config, id: Uuid) -> anyhow::Result<()> {
    let pool = db::create_pool(config).await?;
    let store = ForwardingAddressStore::new(pool);

    match store.get_by_id(id).await? {
        Some(record) => {
            let schema = ForwardingAddressSchema::from(record);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        None => {
            tracing::warn!("Forwarding address {} not found", id);
            anyhow::bail!("Forwarding address {} not found", id)
        }
    }
}

pub async fn handle_address_unconfirmed(config: &Config) -> anyhow::Result<()> {
    let pool = db::create_pool(config).await?;
    let store = ForwardingAddressStore::new(pool);

    let records: Vec<_> = store.unconfirmed_by_client().try_collect().await?;

    if records.is_empty() {
        println!("No records awaiting client confirmation");
        return Ok(());
    }

    println!("{} record(s) awaiting client confirmation:", records.len());
    for record in records {
        println!(
            "  {} | {} | status {} | attempts {} | errors {}",
            record.id,
            record.input_address,
            record.status.as_str(),
            record.confirm_callback_attempt,
            record.callback_number_of_errors
        );
    }

    Ok(())
}

pub async fn handle_address_callback_url(config: &Config, id: Uuid) -> anyhow::Result<()> {
    let pool = db::create_pool(config).await?;
    let store = ForwardingAddressStore::new(pool);

    match store.get_by_id(id).await? {
        Some(record) => {
            let url = build_callback_url(&record)?;
            println!("{}", url);
            Ok(())
        }
        None => {
            tracing::warn!("Forwarding address {} not found", id);
            anyhow::bail!("Forwarding address {} not found", id)
        }
    }
}

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use idwallet_core::directory::{load_entities, HttpDirectory};
use idwallet_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use idwallet_core::metrics::init_metrics;
use idwallet_core::{SessionCoordinator, WalletConfig, WalletStores};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod offline;

use offline::{LogRestarter, OfflineEngine, PrintNavigator};

#[derive(Parser, Debug)]
#[command(name = "idwallet")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML); defaults plus IDWALLET_* variables otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect or write configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Fetch the issuer/verifier directory
    Entities,

    /// Onboarding progress
    #[command(subcommand)]
    Onboarding(OnboardingCommand),

    /// Stored notifications
    #[command(subcommand)]
    Notifications(NotificationCommand),

    /// PIN management
    #[command(subcommand)]
    Pin(PinCommand),

    /// Erase all wallet data
    Reset {
        /// Required; there is no undo
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write the default configuration to a file
    Init { path: PathBuf },
}

#[derive(Subcommand, Debug)]
enum OnboardingCommand {
    /// Current state and checklist flags
    Status,
}

#[derive(Subcommand, Debug)]
enum NotificationCommand {
    /// List notifications, newest first
    List,
    /// Mark a notification read
    Read { id: String },
    /// Delete a notification
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
enum PinCommand {
    /// Set the wallet PIN
    Set { pin: String },
    /// Check a PIN against the stored one
    Check { pin: String },
}

fn load_config(path: Option<&PathBuf>) -> Result<WalletConfig> {
    let config = match path {
        Some(path) => WalletConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => WalletConfig::from_env()?,
    };
    Ok(config)
}

fn passphrase(config: &WalletConfig) -> Result<SecretString> {
    config
        .storage
        .secure_passphrase
        .clone()
        .map(SecretString::new)
        .ok_or_else(|| anyhow!("no secure passphrase; set IDWALLET_SECURE_PASSPHRASE"))
}

/// Coordinator over the on-disk stores, initialized with an offline engine
async fn open_wallet(config: &WalletConfig) -> Result<Arc<SessionCoordinator>> {
    let stores = WalletStores::open(&config.storage, &passphrase(config)?).await?;
    let coordinator = SessionCoordinator::builder(
        Arc::new(OfflineEngine::new()),
        stores,
        Arc::new(LogRestarter),
    )
    .config(config.clone())
    .build()?;
    coordinator.initialize(Arc::new(PrintNavigator)).await?;
    Ok(coordinator)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;

    let mut log_config = LogConfig::from_settings(&config.logging)?;
    if let Some(level) = &args.log_level {
        log_config.level = level.parse::<LogLevel>().unwrap_or_else(|_| {
            eprintln!("Invalid log level '{}', using 'info'", level);
            LogLevel::Info
        });
    }
    init_logging_with_config(log_config.json_format(args.json_logs || config.logging.json_format))?;
    init_metrics();

    info!("idwallet CLI started");

    match args.command {
        Some(Command::Config(ConfigCommand::Show)) => {
            print_json(&config)?;
        }
        Some(Command::Config(ConfigCommand::Init { path })) => {
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            WalletConfig::default().save_to_file(&path)?;
            println!("wrote {}", path.display());
        }
        Some(Command::Entities) => {
            let directory = HttpDirectory::from_config(&config)?;
            let entities = load_entities(&directory, &config.directory.initial_entities).await;
            print_json(&entities)?;
        }
        Some(Command::Onboarding(OnboardingCommand::Status)) => {
            let wallet = open_wallet(&config).await?;
            let state = wallet.snapshot();
            println!("state: {}", state.state);
            println!("unread notifications: {}", wallet.notifications().unread_count());
            print_json(&wallet.onboarding_flags().await)?;
        }
        Some(Command::Notifications(command)) => {
            let wallet = open_wallet(&config).await?;
            match command {
                NotificationCommand::List => print_json(&wallet.notifications().list())?,
                NotificationCommand::Read { id } => {
                    // Invitation replays need a connected agent; only the read mark sticks
                    let record = wallet.read_notification(&id).await?;
                    println!("read {} ({})", record.id, record.kind.as_str());
                }
                NotificationCommand::Remove { id } => wallet.remove_notification(&id).await?,
            }
        }
        Some(Command::Pin(command)) => {
            let wallet = open_wallet(&config).await?;
            match command {
                PinCommand::Set { pin } => {
                    wallet.set_pin(&SecretString::new(pin)).await?;
                    println!("PIN set");
                }
                PinCommand::Check { pin } => {
                    let valid = wallet.validate_pin(&SecretString::new(pin)).await?;
                    println!("{}", if valid { "valid" } else { "invalid" });
                }
            }
        }
        Some(Command::Reset { yes }) => {
            if !yes {
                bail!("reset erases every wallet namespace; pass --yes to confirm");
            }
            open_wallet(&config).await?.reset().await;
            println!("wallet reset");
        }
        None => {
            info!("No command specified. Use --help for usage information.");
        }
    }

    info!("idwallet CLI finished");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_commands() {
        let args = Args::try_parse_from(["idwallet", "--json-logs", "notifications", "read", "n1"])
            .unwrap();
        assert!(args.json_logs);
        assert!(matches!(
            args.command,
            Some(Command::Notifications(NotificationCommand::Read { ref id })) if id == "n1"
        ));

        let args = Args::try_parse_from(["idwallet", "onboarding", "status"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Command::Onboarding(OnboardingCommand::Status))
        ));

        let args = Args::try_parse_from(["idwallet", "reset"]).unwrap();
        assert!(matches!(args.command, Some(Command::Reset { yes: false })));
    }

    #[test]
    fn test_passphrase_required() {
        let mut config = WalletConfig::default();
        config.storage.secure_passphrase = None;
        assert!(passphrase(&config).is_err());

        config.storage.secure_passphrase = Some("pass".to_string());
        assert!(passphrase(&config).is_ok());
    }

    #[test]
    fn test_print_json_renders_records() {
        assert!(print_json(&WalletConfig::default()).is_ok());
        assert!(print_json(&serde_json::json!({"id": "n1", "read": true})).is_ok());
    }
}

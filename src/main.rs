//! galerts main entry point
//!
//! This is the command-line interface for managing Google Alerts.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use galerts::config::{load_config_with_protocol, Config, ProtocolConfig};
use galerts::{Alert, AlertsError, AlertsManager, DeliveryChoice, Frequency, NewAlert, Volume};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// galerts: manage Google Alerts from the command line
///
/// The password is read from the GALERTS_PASSWORD environment variable.
#[derive(Parser, Debug)]
#[command(name = "galerts")]
#[command(version)]
#[command(about = "Manage Google Alerts from the command line", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Account to sign in as; defaults to [account] email in the config
    #[arg(short, long)]
    email: Option<String>,

    #[arg(long, env = "GALERTS_PASSWORD", hide_env_values = true)]
    password: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List alerts
    List,

    /// Create an alert
    Create {
        #[arg(long)]
        query: String,

        /// Result type label, e.g. News
        #[arg(long = "type", value_name = "TYPE")]
        result_type: String,

        /// Deliver by email instead of as a feed
        #[arg(long)]
        email_delivery: bool,

        /// as-it-happens, once-a-day or once-a-week (email delivery only)
        #[arg(long)]
        frequency: Option<Frequency>,

        /// only-best or all
        #[arg(long)]
        volume: Option<Volume>,
    },

    /// Edit the alert at a listing index
    Edit {
        index: usize,

        #[arg(long)]
        query: Option<String>,

        #[arg(long = "type", value_name = "TYPE")]
        result_type: Option<String>,

        /// email or feed
        #[arg(long)]
        delivery: Option<DeliveryChoice>,

        #[arg(long)]
        frequency: Option<Frequency>,

        #[arg(long)]
        volume: Option<Volume>,
    },

    /// Delete the alert at a listing index
    Delete { index: usize },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, protocol) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config_with_protocol(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => (Config::default(), ProtocolConfig::default()),
    };

    let account = match cli.email.clone().or_else(|| config.account.email.clone()) {
        Some(account) => account,
        None => bail!("No account given: pass --email or set [account] email in the config"),
    };

    let mut manager = AlertsManager::new(config.service.clone(), protocol)?;
    manager
        .sign_in(&account, &cli.password)
        .await
        .map_err(report)?;

    match cli.command {
        Command::List => handle_list(&manager).await,
        Command::Create {
            query,
            result_type,
            email_delivery,
            frequency,
            volume,
        } => {
            let delivery = if email_delivery {
                DeliveryChoice::Email
            } else {
                DeliveryChoice::Feed
            };
            let mut builder = NewAlert::builder(&query, &result_type).delivery(delivery);
            if let Some(frequency) = frequency {
                builder = builder.frequency(frequency);
            }
            if let Some(volume) = volume {
                builder = builder.volume(volume);
            }
            let request = builder.build(manager.protocol())?;

            manager.create(&request).await.map_err(report)?;
            println!("Alert created.");
            Ok(())
        }
        Command::Edit {
            index,
            query,
            result_type,
            delivery,
            frequency,
            volume,
        } => {
            let mut alert = select_alert(&manager, index).await?;
            if let Some(query) = query {
                alert.set_query(&query)?;
            }
            if let Some(result_type) = result_type {
                alert.set_result_type(&result_type)?;
            }
            if let Some(delivery) = delivery {
                alert.set_delivery(delivery);
            }
            if let Some(frequency) = frequency {
                alert.set_frequency(frequency)?;
            }
            if let Some(volume) = volume {
                alert.set_volume(volume)?;
            }

            manager.update(&alert).await.map_err(report)?;
            println!("Alert modified.");
            Ok(())
        }
        Command::Delete { index } => {
            let alert = select_alert(&manager, index).await?;
            let query = alert.query().to_string();
            manager.delete(alert).await.map_err(report)?;
            println!("Alert deleted: {}", query);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("galerts=info,warn"),
            1 => EnvFilter::new("galerts=debug,info"),
            2 => EnvFilter::new("galerts=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Logs the diagnostic payload of an unexpected response before failing
fn report(error: AlertsError) -> anyhow::Error {
    if let Some(response) = error.unexpected_response() {
        tracing::error!("Service answered {} for {}", response.status, response.url);
        tracing::debug!("Response body:\n{}", response.body_text());
    }
    error.into()
}

/// Handles the list command: prints the alerts as a table
async fn handle_list(manager: &AlertsManager) -> anyhow::Result<()> {
    let alerts = manager.list_alerts().await.map_err(report)?.into_alerts().map_err(report)?;
    if alerts.is_empty() {
        println!("No alerts.");
        return Ok(());
    }

    println!(
        "{:>3}  {:<20}  {:<13}  {:<13}  Deliver to",
        "#", "Query", "Type", "How often"
    );
    for (index, alert) in alerts.iter().enumerate() {
        println!(
            "{:>3}  {:<20}  {:<13}  {:<13}  {}",
            index + 1,
            truncate(alert.query(), 20),
            alert.result_type().label(),
            alert.frequency().as_str(),
            alert.delivery()
        );
    }

    Ok(())
}

/// Picks an alert by its 1-based position in a fresh listing
async fn select_alert(manager: &AlertsManager, index: usize) -> anyhow::Result<Alert> {
    let alerts = manager.list_alerts().await.map_err(report)?.into_alerts().map_err(report)?;
    let count = alerts.len();
    match index.checked_sub(1).and_then(|i| alerts.into_iter().nth(i)) {
        Some(alert) => Ok(alert),
        None => bail!("No alert at index {} ({} alerts listed)", index, count),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(width - 1).collect();
        short.push('…');
        short
    }
}

//! Portier - forward-authentication gateway for nginx `auth_request`
//!
//! Answers the proxy's `/check` subrequests from a session cookie and signs
//! users in against LDAP or Active Directory.

use clap::{Parser, Subcommand};
use portier_core::config::PortierConfig;
use portier_server::PortierServer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "portier")]
#[command(author = "Portier Team")]
#[command(version = portier_core::VERSION)]
#[command(about = "Forward-authentication gateway backed by LDAP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PORTIER_CONFIG")]
    config: Option<String>,

    /// Bind address
    #[arg(long)]
    bind: Option<String>,

    /// Port number
    #[arg(short, long)]
    port: Option<u16>,

    /// Path prefix of the gateway routes
    #[arg(long)]
    base_path: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway
    Server,

    /// Load and validate the configuration, then exit
    Validate,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Some(Commands::Version) = cli.command {
        println!("portier {}", portier_core::VERSION);
        return Ok(());
    }

    // File first, then PORTIER_* variables, then flags
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = PortierConfig::from_file(path)?;
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
        None => PortierConfig::from_env(),
    };

    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(base_path) = cli.base_path {
        config.server.base_path = base_path;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    init_logging(&config);

    config.validate()?;

    match cli.command {
        Some(Commands::Validate) => {
            info!(
                "Configuration is valid ({} environment)",
                config.environment.as_str()
            );
        }
        _ => {
            print_banner();
            run_server(config).await?;
        }
    }

    Ok(())
}

fn init_logging(config: &PortierConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .init();
    }
}

fn print_banner() {
    println!(
        r#"
    ____             __  _
   / __ \____  _____/ /_(_)__  _____
  / /_/ / __ \/ ___/ __/ / _ \/ ___/
 / ____/ /_/ / /  / /_/ /  __/ /
/_/    \____/_/   \__/_/\___/_/

   Forward-authentication gateway
   Version: {}
"#,
        portier_core::VERSION
    );
}

async fn run_server(config: PortierConfig) -> anyhow::Result<()> {
    info!("Starting Portier ({} environment)...", config.environment.as_str());
    info!("Directory: {}", config.ldap.server_url);
    info!("Search base: {}", config.ldap.search_base);
    if config.ldap.groups.is_empty() {
        info!("No group restriction configured");
    } else {
        info!("Allowed groups: {}", config.ldap.groups.join(", "));
    }

    let server = PortierServer::new(config);
    server.run().await?;

    Ok(())
}

//! Book fair server binary
//!
//! Command-line interface for the book fair backend:
//! - Serve the REST API
//! - Export cart orders or table ids as CSV
//! - Verify id density and repair tables left with gaps
//! - Bootstrap administrator accounts
//!
//! # Examples
//!
//! ```bash
//! # Start server
//! bookfair serve --bind 0.0.0.0 --port 5000
//!
//! # Export orders
//! bookfair export --output orders.csv
//!
//! # Check every table, then repair one
//! bookfair verify
//! bookfair repair speakers
//! ```

use clap::{Args, Parser, Subcommand};
use bookfair::config::AppConfig;
use bookfair::model::Role;
use bookfair::server::{start_server, AppState, ServerConfig};
use bookfair::{export, Catalog};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Book fair event backend
#[derive(Parser, Debug)]
#[command(name = "bookfair")]
#[command(version = bookfair::VERSION)]
#[command(about = "Book fair event backend", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "BOOKFAIR_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory path
    #[arg(long, global = true, env = "BOOKFAIR_DATA")]
    data_dir: Option<PathBuf>,

    /// Log directory path
    #[arg(long, global = true, env = "BOOKFAIR_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Export cart orders, or the ids of one table, as CSV
    Export(ExportArgs),

    /// Report id density for every compacting table
    Verify,

    /// Compact a table left with gaps by an interrupted delete
    Repair {
        /// One of speakers, events, banners, publishers, books, gallery,
        /// partners
        table: String,
    },

    /// Change the role of an account
    SetRole {
        /// Account email
        email: String,
        /// USER, ADMIN or SUPER_ADMIN
        role: Role,
    },

    /// Print the effective configuration
    Config,

    /// Show version
    Version,
}

/// Server arguments
#[derive(Args, Debug)]
struct ServeArgs {
    /// HTTP bind address
    #[arg(short, long, env = "BOOKFAIR_BIND")]
    bind: Option<String>,

    /// HTTP port
    #[arg(short, long, env = "BOOKFAIR_PORT")]
    port: Option<u16>,

    /// Disable authentication (development mode)
    #[arg(long)]
    dev_mode: bool,
}

/// Export arguments
#[derive(Args, Debug)]
struct ExportArgs {
    /// Export the ids of this table instead of cart orders
    #[arg(short, long)]
    table: Option<String>,

    /// Output file path (stdout if not given)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    setup_logging(&config, cli.no_color)?;

    match cli.command {
        Commands::Serve(args) => serve_command(config, args).await,
        Commands::Export(args) => export_command(&config, args).await,
        Commands::Verify => verify_command(&config).await,
        Commands::Repair { table } => repair_command(&config, &table).await,
        Commands::SetRole { email, role } => set_role_command(&config, &email, role).await,
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Version => {
            println!("bookfair {}", bookfair::VERSION);
            Ok(())
        }
    }
}

/// Setup logging with rolling files and console output
fn setup_logging(config: &AppConfig, no_color: bool) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "bookfair.log");

    let log_level = config
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(!no_color)
                .pretty(),
        )
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}

async fn open_catalog(config: &AppConfig) -> anyhow::Result<Catalog> {
    Ok(Catalog::open(&config.data_dir).await?)
}

/// Serve command - start the HTTP server
async fn serve_command(mut config: AppConfig, args: ServeArgs) -> anyhow::Result<()> {
    info!(version = %bookfair::VERSION, "Book fair backend starting");

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.server.dev_mode |= args.dev_mode;

    let catalog = Arc::new(open_catalog(&config).await?);
    let state = AppState::from_config(catalog, &config);
    start_server(ServerConfig::from(&config), state).await
}

/// Export command
async fn export_command(config: &AppConfig, args: ExportArgs) -> anyhow::Result<()> {
    let catalog = open_catalog(config).await?;
    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };

    match &args.table {
        Some(name) => {
            let table = catalog.table(name)?;
            export::write_ids(writer, table).await?;
        }
        None => {
            let orders = catalog.orders_with_publishers().await?;
            export::write_orders(writer, &orders)?;
            info!(count = orders.len(), "Orders exported");
        }
    }
    if let Some(path) = &args.output {
        println!("Exported to {}", path.display());
    }
    Ok(())
}

/// Verify command
async fn verify_command(config: &AppConfig) -> anyhow::Result<()> {
    let catalog = open_catalog(config).await?;
    let report = catalog.verify().await?;

    println!("{:<16} {:>6} {:>8}  status", "table", "rows", "max id");
    println!("───────────────────────────────────────────");
    for density in &report {
        let status = match (density.dense, density.needs_repair) {
            (true, false) => "ok",
            (true, true) => "flagged",
            (false, _) => "GAPS",
        };
        println!(
            "{:<16} {:>6} {:>8}  {}",
            density.table, density.rows, density.max_id, status
        );
    }

    let broken: Vec<&str> = report
        .iter()
        .filter(|d| !d.dense || d.needs_repair)
        .map(|d| d.table.as_str())
        .collect();
    if !broken.is_empty() {
        anyhow::bail!("Tables need repair: {}", broken.join(", "));
    }
    Ok(())
}

/// Repair command
async fn repair_command(config: &AppConfig, table: &str) -> anyhow::Result<()> {
    let catalog = open_catalog(config).await?;
    let renumbering = catalog.repair(table).await?;
    if renumbering.is_identity() {
        println!("'{}' was already dense", table);
    } else {
        for (from, to) in renumbering.moves() {
            println!("{}: {} -> {}", table, from, to);
        }
        println!("Repaired '{}'", table);
    }
    Ok(())
}

/// Set-role command
async fn set_role_command(config: &AppConfig, email: &str, role: Role) -> anyhow::Result<()> {
    let catalog = open_catalog(config).await?;
    let user = catalog
        .user_by_email(email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No account with email '{}'", email))?;
    let updated = catalog.set_role(user.id, role).await?;
    println!("{} is now {}", updated.email, updated.role);
    Ok(())
}

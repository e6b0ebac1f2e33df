//! ldes-client main entry point
//!
//! This is the command-line interface that streams the members of a Linked
//! Data Event Stream to stdout.

use anyhow::Context;
use clap::Parser;
use ldes_client::config::{load_config_with_hash, resolve_rdf_format, AuthConfig, Config};
use ldes_client::output::{print_statistics, MemberWriter};
use ldes_client::MemberSupplier;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ldes-client: follow a Linked Data Event Stream
///
/// Crawls every fragment of the stream, revisits mutable fragments as their
/// cache headers allow, and writes each member to stdout exactly once.
#[derive(Parser, Debug)]
#[command(name = "ldes-client")]
#[command(version)]
#[command(about = "Follow a Linked Data Event Stream", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// RDF format for emitted members
    #[arg(long, default_value = "n-triples")]
    output_format: String,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

    /// Stop after emitting this many members
    #[arg(long)]
    limit: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        print_dry_run(&config);
        return Ok(());
    }

    run(config, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout only carries members.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ldes_client=info,warn"),
            1 => EnvFilter::new("ldes_client=debug,info"),
            2 => EnvFilter::new("ldes_client=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn print_dry_run(config: &Config) {
    println!("=== ldes-client Dry Run ===\n");

    println!("Stream:");
    for url in &config.client.urls {
        println!("  - {}", url);
    }
    println!("  Source format: {}", config.client.source_format);
    println!("  Polling interval: {}s", config.client.polling_interval);
    if let Some(path) = &config.client.timestamp_path {
        println!("  Timestamp path: {}", path);
    }
    if config.client.use_latest_state {
        if let Some(path) = &config.client.version_of_path {
            println!("  Latest state only, versions via: {}", path);
        }
    }

    println!("\nAuthentication:");
    match &config.auth {
        AuthConfig::NoAuth => println!("  None"),
        AuthConfig::ApiKey { header, .. } => println!("  API key in header {}", header),
        AuthConfig::ClientCredentials {
            client_id,
            token_endpoint,
            ..
        } => println!("  Client credentials for {} at {}", client_id, token_endpoint),
    }

    println!("\nRetry:");
    if config.retry.enabled {
        println!(
            "  Up to {} attempts, {}ms apart",
            config.retry.max_attempts, config.retry.delay
        );
        if !config.retry.statuses_to_retry.is_empty() {
            println!("  Also retrying: {:?}", config.retry.statuses_to_retry);
        }
    } else {
        println!("  Disabled");
    }

    println!("\nPersistence:");
    println!("  Strategy: {:?}", config.persistence.strategy);
    println!("  Database: {}", config.persistence.database_path);
    println!("  Keep state: {}", config.persistence.keep_state);

    println!("\n✓ Configuration is valid");
}

async fn run(config: Config, cli: &Cli) -> anyhow::Result<()> {
    let format = resolve_rdf_format(&cli.output_format)?;
    let mut supplier = MemberSupplier::from_config(&config)?;

    let stop = supplier.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current fragment");
            stop.stop();
        }
    });

    let mut writer = MemberWriter::new(format, BufWriter::new(io::stdout()));
    let streamed = stream_members(&mut supplier, &mut writer, cli.limit).await;

    let stats = supplier.statistics();
    let closed = supplier.close();
    if !cli.quiet {
        print_statistics(&stats);
    }

    streamed?;
    closed?;
    writer.into_inner().flush()?;
    Ok(())
}

async fn stream_members<W: Write>(
    supplier: &mut MemberSupplier,
    writer: &mut MemberWriter<W>,
    limit: Option<u64>,
) -> anyhow::Result<()> {
    while limit.map_or(true, |limit| writer.written() < limit) {
        let Some(member) = supplier.get().await? else {
            return Ok(());
        };
        writer
            .write_member(&member)
            .with_context(|| format!("Failed to write member {}", member.id))?;
    }

    tracing::info!("Member limit reached");
    Ok(())
}

//! Jewellery storefront CLI - drive the cart from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! jewel-cli cart show
//!
//! # Add one unit of product 7, variant 3
//! jewel-cli cart add 7 --variant 3
//!
//! # Several actions against one session (the cart cookie lives for the
//! # lifetime of the process)
//! printf 'add 7\nadd 8 -q 2\nshow\ncheckout\n' | jewel-cli session
//! ```
//!
//! # Commands
//!
//! - `cart show|add|remove|update|clear|checkout` - One cart action
//! - `session` - Read cart actions from stdin, one per line

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use jewellery_storefront::config::StorefrontConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::cart::CartAction;

#[derive(Parser)]
#[command(name = "jewel-cli")]
#[command(author, version, about = "Jewellery storefront cart tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single cart action
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Run cart actions read from stdin against one session
    Session,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Warnings and errors become Sentry events, info and debug breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main(flavor = "current_thread")]
#[allow(clippy::print_stderr)]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    // Sentry first, so the tracing layer has a client to forward to
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "jewellery_storefront=info,jewellery_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let controller = commands::controller(&config)?;
    match cli.command {
        Commands::Cart { action } => commands::cart::execute(&controller, action).await?,
        Commands::Session => commands::session::run(&controller).await?,
    }
    Ok(())
}

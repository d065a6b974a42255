//! Drape CLI - terminal storefront client.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! drape products --category men --sort price-low
//! drape search "linen shirt"
//!
//! # Sign in and fill the cart
//! drape login --uid u1 --email ada@example.com --name Ada
//! drape cart add p1 --size M --color Red --quantity 2
//! drape cart show
//!
//! # Check out and follow the order
//! drape checkout --payment cod
//! drape orders list
//! drape orders cancel order_1700000000000_k3j9x0a2b
//! ```
//!
//! # Environment Variables
//!
//! See `drape_storefront::config` for the full list. `DRAPE_DATABASE_URL`
//! is required.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use drape_core::{OrderId, PaymentMethod};
use drape_storefront::catalog::ProductSort;
use drape_storefront::config::StorefrontConfig;
use drape_storefront::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "drape")]
#[command(author, version, about = "Drape storefront in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Only show this category
        #[arg(short, long, default_value = "all")]
        category: String,

        /// Sort order (`featured`, `price-low`, `price-high`, `rating`)
        #[arg(short, long, default_value = "featured")]
        sort: ProductSort,
    },
    /// Show one product
    Product {
        /// Product key
        id: String,
    },
    /// Search products
    Search {
        /// Search terms; omit to show the last search
        terms: Vec<String>,

        /// Sort order (`featured`, `price-low`, `price-high`, `rating`)
        #[arg(short, long, default_value = "featured")]
        sort: ProductSort,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the cart
    Checkout {
        /// Payment method (`cod` or `pay-now`)
        #[arg(short, long, default_value = "cod")]
        payment: PaymentMethod,

        /// Confirm that the pay-now payment was made
        #[arg(long)]
        paid: bool,
    },
    /// Track orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Manage the profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Sign in with an identity from the auth provider
    Login {
        /// Provider uid
        #[arg(short, long)]
        uid: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long, default_value = "")]
        name: String,
    },
    /// Sign out and empty the cart
    Logout,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the priced cart
    Show,
    /// Add a product, merging with a matching line
    Add {
        /// Product key
        product_id: String,

        #[arg(short, long)]
        size: String,

        #[arg(short, long)]
        color: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a line
    Remove {
        /// Product key
        product_id: String,

        #[arg(short, long)]
        size: String,

        #[arg(short, long)]
        color: String,
    },
    /// Change the quantity of a line
    SetQty {
        /// Product key
        product_id: String,

        #[arg(short, long)]
        size: String,

        #[arg(short, long)]
        color: String,

        /// New quantity, at least 1
        quantity: u32,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// List orders, newest first
    List,
    /// Print the order list on every change until interrupted
    Watch,
    /// Cancel a pending order
    Cancel {
        /// Order key
        order_id: String,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show the signed-in profile
    Show,
    /// Save the delivery address
    Address {
        #[arg(long)]
        name: String,

        #[arg(long)]
        mobile: String,

        #[arg(long, default_value = "")]
        backup_mobile: String,

        #[arg(long)]
        door: String,

        #[arg(long)]
        street: String,

        #[arg(long)]
        city: String,

        #[arg(long)]
        pincode: String,

        #[arg(long, default_value = "")]
        landmark: String,
    },
    /// Change display name and bio
    Edit {
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        bio: String,
    },
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

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "drape_storefront=info,drape_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        e.report();
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let state = AppState::from_config(config)?;

    match cli.command {
        Commands::Products { category, sort } => {
            commands::catalog::list(&state, &category, sort).await;
        }
        Commands::Product { id } => commands::catalog::show(&state, &id).await?,
        Commands::Search { terms, sort } => {
            commands::catalog::search(&state, &terms.join(" "), sort).await?;
        }
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&state).await?,
            CartAction::Add {
                product_id,
                size,
                color,
                quantity,
            } => commands::cart::add(&state, &product_id, &size, &color, quantity).await?,
            CartAction::Remove {
                product_id,
                size,
                color,
            } => commands::cart::remove(&state, &product_id, &size, &color)?,
            CartAction::SetQty {
                product_id,
                size,
                color,
                quantity,
            } => commands::cart::set_quantity(&state, &product_id, &size, &color, quantity)?,
        },
        Commands::Checkout { payment, paid } => {
            commands::checkout::run(&state, payment, paid).await?;
        }
        Commands::Orders { action } => match action {
            OrderAction::List => commands::orders::list(&state).await?,
            OrderAction::Watch => commands::orders::watch(&state).await?,
            OrderAction::Cancel { order_id } => {
                commands::orders::cancel(&state, &OrderId::new(order_id)).await?;
            }
        },
        Commands::Profile { action } => match action {
            ProfileAction::Show => commands::profile::show(&state).await?,
            ProfileAction::Address {
                name,
                mobile,
                backup_mobile,
                door,
                street,
                city,
                pincode,
                landmark,
            } => {
                let address = drape_core::Address {
                    name,
                    mobile_number: mobile,
                    backup_mobile_number: backup_mobile,
                    door_number: door,
                    street,
                    city,
                    pincode,
                    landmark,
                };
                commands::profile::save_address(&state, &address).await?;
            }
            ProfileAction::Edit { name, bio } => {
                commands::profile::edit(&state, &name, &bio).await?;
            }
        },
        Commands::Login { uid, email, name } => {
            commands::profile::login(&state, uid, &email, name).await?;
        }
        Commands::Logout => commands::profile::logout(&state)?,
    }
    Ok(())
}

//! `catalog-cli`: drive the catalog client from a terminal.
//!
//! Each invocation runs one operation against the configured remote and
//! prints how it settled. The session token persists between invocations in
//! the file named by `CATALOG_TOKEN_PATH`.
//!
//! ```bash
//! catalog-cli login emilys emilyspass
//! catalog-cli list --search mascara
//! catalog-cli add "Blue Pen" 2.5
//! catalog-cli update 3 --title "Red Pen"
//! catalog-cli delete 3
//! ```

use anyhow::Context;
use catalog_client::{
    ClientConfig, Credentials, Dispatcher, HttpEnvironment, Landing, Outcome, Price, ProductDraft,
    ProductId, ProductPatch,
};
use catalog_sync_runtime::metrics::MetricsRecorder;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "catalog-cli")]
#[command(about = "Session and product catalog client")]
struct Cli {
    /// Print Prometheus metrics for the run before exiting
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the session token
    Login {
        /// Account name
        username: String,
        /// Account password
        password: String,
    },
    /// Fetch the catalog and print it
    List {
        /// Only print products whose title contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Create a product
    Add {
        /// Product title
        title: String,
        /// Product price
        price: String,
    },
    /// Update a product's title and/or price
    Update {
        /// Product id
        id: u64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New price
        #[arg(long)]
        price: Option<String>,
    },
    /// Delete a product
    Delete {
        /// Product id
        id: u64,
    },
    /// Print where a client would start: login or catalog
    Landing,
}

fn parse_price(raw: String) -> Price {
    raw.trim()
        .parse::<f64>()
        .map_or(Price::Text(raw), Price::Amount)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,catalog_client=info,catalog_sync_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let recorder = if cli.metrics {
        Some(MetricsRecorder::install().context("installing metrics recorder")?)
    } else {
        None
    };

    let config = ClientConfig::from_env().context("reading configuration")?;
    let environment = HttpEnvironment::from_config(&config).context("building HTTP client")?;
    let dispatcher = Dispatcher::new(environment, &config);

    let _subscription = dispatcher.subscribe(|state| {
        tracing::debug!(
            authenticated = state.session.is_authenticated(),
            products = state.catalog.items.len(),
            loading = state.catalog.loading || state.session.loading,
            "Snapshot replaced"
        );
    });

    let succeeded = run(&dispatcher, cli.command).await?;

    dispatcher.shutdown().await.context("shutting down")?;

    if let Some(text) = recorder.as_ref().and_then(MetricsRecorder::render) {
        println!("{text}");
    }

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

/// Run one command; `Ok(false)` when the operation was rejected.
async fn run(
    dispatcher: &Dispatcher<
        catalog_client::providers::HttpCatalogService,
        catalog_client::providers::HttpAuthService,
        catalog_client::providers::LocalCredentialStore,
    >,
    command: Command,
) -> anyhow::Result<bool> {
    match command {
        Command::Login { username, password } => {
            match dispatcher.login(Credentials::new(username, password)).await? {
                Outcome::Fulfilled(user) => {
                    println!("Welcome, {}", user.display_name());
                    Ok(true)
                },
                Outcome::Rejected(error) => report(&error),
            }
        },
        Command::List { search } => match dispatcher.fetch_products().await? {
            Outcome::Fulfilled(_) => {
                let catalog = dispatcher.catalog();
                let products = match search.as_deref() {
                    Some(query) => catalog.search(query),
                    None => catalog.items.iter().collect(),
                };
                for product in products {
                    println!("{:>6}  {:<48}  {}", product.id.get(), product.title, product.price);
                }
                Ok(true)
            },
            Outcome::Rejected(error) => report(&error),
        },
        Command::Add { title, price } => {
            let draft = ProductDraft::new(title, parse_price(price));
            match dispatcher.add_product(draft).await? {
                Outcome::Fulfilled(product) => {
                    println!("Added {}: {}", product.id, product.title);
                    Ok(true)
                },
                Outcome::Rejected(error) => report(&error),
            }
        },
        Command::Update { id, title, price } => {
            let patch = ProductPatch {
                title,
                price: price.map(parse_price),
            };
            if patch.is_empty() {
                anyhow::bail!("nothing to update: pass --title and/or --price");
            }
            match dispatcher.update_product(ProductId::new(id), patch).await? {
                Outcome::Fulfilled(product) => {
                    println!("Updated {}: {} ({})", product.id, product.title, product.price);
                    Ok(true)
                },
                Outcome::Rejected(error) => report(&error),
            }
        },
        Command::Delete { id } => match dispatcher.delete_product(ProductId::new(id)).await? {
            Outcome::Fulfilled(id) => {
                println!("Deleted {id}");
                Ok(true)
            },
            Outcome::Rejected(error) => report(&error),
        },
        Command::Landing => {
            match dispatcher.landing().await {
                Landing::Login => println!("login"),
                Landing::Catalog => println!("catalog"),
            }
            Ok(true)
        },
    }
}

#[allow(clippy::unnecessary_wraps)]
fn report(error: &catalog_client::OperationFailed) -> anyhow::Result<bool> {
    eprintln!("Error: {error}");
    Ok(false)
}

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use order_workflow::application::engine::OrderWorkflow;
use order_workflow::application::notifier::Notifier;
use order_workflow::config::WorkflowConfig;
use order_workflow::domain::ports::{
    OrderStoreBox, PaymentGatewayBox, ProductCatalog, ProductCatalogBox,
};
use order_workflow::infrastructure::fake_gateway::FakeGateway;
use order_workflow::infrastructure::notification::LogChannel;
use order_workflow::interfaces::commands::CommandReader;
use order_workflow::interfaces::csv::catalog_reader::CatalogReader;
use order_workflow::interfaces::csv::order_writer::OrderWriter;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Commands file, one JSON object per line
    input: PathBuf,

    /// Product catalog CSV (id,name,sku,image_url)
    #[arg(long)]
    catalog: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Base URL of an HTTP payment processor. Without it a local fake is used.
    #[arg(long, env = "ORDERS_GATEWAY_URL")]
    gateway_url: Option<String>,

    #[arg(long, env = "ORDERS_GATEWAY_API_KEY", default_value = "", hide_env_values = true)]
    #[cfg_attr(not(feature = "gateway-http"), allow(dead_code))]
    gateway_api_key: String,

    #[arg(long, env = "ORDERS_GATEWAY_TIMEOUT_MS", default_value_t = 5000)]
    gateway_timeout_ms: u64,

    /// Authorizations allowed per order; 1 disables retries
    #[arg(long, env = "ORDERS_MAX_PAYMENT_ATTEMPTS", default_value_t = 1)]
    max_payment_attempts: u32,

    #[arg(long, env = "ORDERS_NOTIFICATION_CAPACITY", default_value_t = 256)]
    notification_capacity: usize,

    #[arg(long, env = "ORDERS_ORDER_PREFIX", default_value = "ORD")]
    order_prefix: String,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "ORDERS_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            gateway_timeout: Duration::from_millis(self.gateway_timeout_ms),
            max_payment_attempts: self.max_payment_attempts.max(1),
            notification_capacity: self.notification_capacity,
            order_number_prefix: self.order_prefix.clone(),
        }
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<&Path>) -> Result<(OrderStoreBox, ProductCatalogBox)> {
    use order_workflow::infrastructure::in_memory::{InMemoryOrderStore, InMemoryProductCatalog};
    use order_workflow::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => {
            let store = RocksDBStore::open(path)?;
            info!(path = %path.display(), "using RocksDB storage");
            let orders: OrderStoreBox = Box::new(store.clone());
            let catalog: ProductCatalogBox = Box::new(store);
            Ok((orders, catalog))
        }
        None => {
            let orders: OrderStoreBox = Box::new(InMemoryOrderStore::new());
            let catalog: ProductCatalogBox = Box::new(InMemoryProductCatalog::new());
            Ok((orders, catalog))
        }
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<&Path>) -> Result<(OrderStoreBox, ProductCatalogBox)> {
    use order_workflow::infrastructure::in_memory::{InMemoryOrderStore, InMemoryProductCatalog};

    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    let orders: OrderStoreBox = Box::new(InMemoryOrderStore::new());
    let catalog: ProductCatalogBox = Box::new(InMemoryProductCatalog::new());
    Ok((orders, catalog))
}

#[cfg(feature = "gateway-http")]
fn payment_gateway(cli: &Cli) -> PaymentGatewayBox {
    use order_workflow::infrastructure::http_gateway::HttpGateway;

    match &cli.gateway_url {
        Some(url) => {
            info!(%url, "using HTTP payment gateway");
            Box::new(HttpGateway::new(url.as_str(), cli.gateway_api_key.as_str()))
        }
        None => Box::new(FakeGateway::new()),
    }
}

#[cfg(not(feature = "gateway-http"))]
fn payment_gateway(cli: &Cli) -> PaymentGatewayBox {
    if cli.gateway_url.is_some() {
        eprintln!(
            "WARNING: Payment gateway requested via --gateway-url, but 'gateway-http' feature is not enabled. Falling back to the local fake gateway."
        );
    }
    Box::new(FakeGateway::new())
}

async fn load_catalog(path: &Path, catalog: &dyn ProductCatalog) -> Result<()> {
    let file = File::open(path).into_diagnostic()?;
    let mut loaded = 0usize;
    for product in CatalogReader::new(file).products() {
        match product {
            Ok(product) => {
                catalog.store(product).await?;
                loaded += 1;
            }
            Err(e) => warn!(error = %e, "skipping catalog record"),
        }
    }
    info!(loaded, "catalog loaded");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = cli.workflow_config();
    let (orders, catalog) = open_stores(cli.db_path.as_deref())?;
    load_catalog(&cli.catalog, &*catalog).await?;

    let (notifier, dispatcher) =
        Notifier::spawn(Box::new(LogChannel), config.notification_capacity);
    let workflow = OrderWorkflow::new(orders, catalog, payment_gateway(&cli), notifier, config);

    // Apply commands
    let file = File::open(&cli.input).into_diagnostic()?;
    for command in CommandReader::new(BufReader::new(file)).commands() {
        match command {
            Ok(command) => {
                let name = command.name();
                if let Err(e) = command.apply(&workflow).await {
                    warn!(command = name, kind = %e.kind(), error = %e, "command failed");
                }
            }
            Err(e) => warn!(error = %e, "skipping unreadable command"),
        }
    }

    // Collect final state, then let the dispatcher drain
    let orders = workflow.into_orders().await?;
    dispatcher.await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = OrderWriter::new(stdout.lock());
    writer.write_orders(&orders)?;

    Ok(())
}

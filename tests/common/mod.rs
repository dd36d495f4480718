#![allow(dead_code)]

use order_workflow::application::engine::OrderWorkflow;
use order_workflow::application::notifier::Notifier;
use order_workflow::config::WorkflowConfig;
use order_workflow::domain::checkout::{CheckoutLine, CheckoutRequest};
use order_workflow::domain::item::{ProductId, ProductSnapshot};
use order_workflow::domain::order::ShippingDetails;
use order_workflow::domain::ports::{ProductCatalog, ProductCatalogBox};
use order_workflow::infrastructure::fake_gateway::FakeGateway;
use order_workflow::infrastructure::in_memory::{InMemoryOrderStore, InMemoryProductCatalog};
use order_workflow::infrastructure::notification::RecordingChannel;
use rust_decimal::Decimal;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::task::JoinHandle;

/// A workflow over in-memory stores, with handles for inspecting its
/// collaborators.
pub struct Harness {
    pub workflow: OrderWorkflow,
    pub gateway: FakeGateway,
    pub channel: RecordingChannel,
    pub dispatcher: JoinHandle<()>,
}

pub fn product(id: u64) -> ProductSnapshot {
    ProductSnapshot {
        id: ProductId(id),
        name: format!("Product {id}"),
        sku: format!("SKU-{id:03}"),
        image_url: Some(format!("https://cdn.shop.test/{id}.png")),
    }
}

pub async fn seeded_catalog(products: u64) -> InMemoryProductCatalog {
    let catalog = InMemoryProductCatalog::new();
    for id in 1..=products {
        catalog.store(product(id)).await.unwrap();
    }
    catalog
}

pub async fn harness(gateway: FakeGateway, config: WorkflowConfig) -> Harness {
    let catalog = seeded_catalog(5).await;
    harness_with_catalog(gateway, config, Box::new(catalog))
}

pub fn harness_with_catalog(
    gateway: FakeGateway,
    config: WorkflowConfig,
    catalog: ProductCatalogBox,
) -> Harness {
    let channel = RecordingChannel::new();
    let (notifier, dispatcher) =
        Notifier::spawn(Box::new(channel.clone()), config.notification_capacity);
    let workflow = OrderWorkflow::new(
        Box::new(InMemoryOrderStore::new()),
        catalog,
        Box::new(gateway.clone()),
        notifier,
        config,
    );
    Harness {
        workflow,
        gateway,
        channel,
        dispatcher,
    }
}

pub fn shipping(method: &str) -> ShippingDetails {
    ShippingDetails {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: Some("+44 20 7946 0000".to_string()),
        address: "12 Analytical St".to_string(),
        city: "London".to_string(),
        postal_code: "N1 9GU".to_string(),
        country: "GB".to_string(),
        method: method.to_string(),
    }
}

/// A request for `(product_id, quantity, unit_price)` lines whose total is
/// exactly the sum of the lines.
pub fn checkout(lines: &[(u64, u32, Decimal)]) -> CheckoutRequest {
    let total: Decimal = lines
        .iter()
        .map(|(_, qty, price)| *price * Decimal::from(*qty))
        .sum();
    CheckoutRequest {
        items: lines
            .iter()
            .map(|(id, quantity, unit_price)| CheckoutLine {
                product_id: ProductId(*id),
                quantity: *quantity,
                unit_price: *unit_price,
                customizations: None,
                preview_image_url: None,
            })
            .collect(),
        total_amount: total,
        subtotal_amount: None,
        shipping_amount: None,
        tax_amount: None,
        discount_amount: None,
        payment_method: "card".to_string(),
        shipping: shipping("standard"),
        notes: None,
    }
}

pub fn write_lines(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

pub fn catalog_fixture() -> &'static Path {
    Path::new("tests/fixtures/catalog.csv")
}

pub fn checkout_line(user_id: u64, product_id: u64, quantity: u32, unit_price: &str, total: &str) -> String {
    format!(
        r#"{{"op":"checkout","user_id":{user_id},"request":{{"items":[{{"product_id":{product_id},"quantity":{quantity},"unit_price":"{unit_price}"}}],"total_amount":"{total}","payment_method":"card","shipping":{{"name":"Ada","email":"ada@example.com","address":"1 Loop Rd","city":"Lyon","postal_code":"69001","country":"FR","method":"standard"}}}}}}"#
    )
}

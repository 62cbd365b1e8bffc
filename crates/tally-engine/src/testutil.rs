//! Shared fixtures for engine tests: an in-memory database, a fixed
//! session, and seed helpers for the entities the primitives operate on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use tally_core::{
    Batch, Location, Product, PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus, ReorderRule,
    Sale, SaleItem, SaleStatus, Supplier,
};
use tally_db::repository::batch::generate_batch_id;
use tally_db::repository::location::{generate_location_id, generate_supplier_id};
use tally_db::repository::product::generate_product_id;
use tally_db::repository::purchase_order::{generate_order_id, generate_order_item_id};
use tally_db::repository::reorder::generate_rule_id;
use tally_db::repository::sale::{generate_sale_id, generate_sale_item_id};
use tally_db::{BatchRepository, Database, DbConfig, SaleRepository};

use crate::audit::ActivityWorkerHandle;
use crate::engine::StockEngine;
use crate::session::StaticSession;

pub(crate) const TENANT: &str = "tenant-1";
pub(crate) const OTHER_TENANT: &str = "tenant-2";
pub(crate) const USER: &str = "user-1";

/// Engine over a fresh in-memory database, authenticated as TENANT/USER.
pub(crate) async fn test_engine() -> (StockEngine, ActivityWorkerHandle) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    StockEngine::new(db, Arc::new(StaticSession::new(TENANT, USER)))
}

pub(crate) async fn seed_product(db: &Database, sku: &str, quantity: i64) -> Product {
    seed_product_for(db, TENANT, sku, quantity, None).await
}

pub(crate) async fn seed_product_for(
    db: &Database,
    tenant_id: &str,
    sku: &str,
    quantity: i64,
    low_stock_threshold: Option<i64>,
) -> Product {
    let now = Utc::now();
    let product = Product {
        id: generate_product_id(),
        tenant_id: tenant_id.to_string(),
        sku: sku.to_string(),
        barcode: None,
        name: format!("Product {sku}"),
        category: None,
        supplier_id: None,
        price_cents: 500,
        quantity,
        low_stock_threshold,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.products().insert(&product).await.unwrap();
    product
}

pub(crate) async fn seed_location(db: &Database, name: &str) -> Location {
    let location = Location {
        id: generate_location_id(),
        tenant_id: TENANT.to_string(),
        name: name.to_string(),
        created_at: Utc::now(),
    };
    db.locations().insert(&location).await.unwrap();
    location
}

pub(crate) async fn seed_supplier(db: &Database, name: &str) -> Supplier {
    let supplier = Supplier {
        id: generate_supplier_id(),
        tenant_id: TENANT.to_string(),
        name: name.to_string(),
        created_at: Utc::now(),
    };
    db.suppliers().insert(&supplier).await.unwrap();
    supplier
}

pub(crate) async fn seed_batch(db: &Database, product_id: &str, number: &str, quantity: i64) -> Batch {
    let now = Utc::now();
    let batch = Batch {
        id: generate_batch_id(),
        tenant_id: TENANT.to_string(),
        product_id: product_id.to_string(),
        batch_number: number.to_string(),
        quantity,
        cost_cents: Some(250),
        expiry_date: None,
        manufactured_date: None,
        purchase_order_id: None,
        created_at: now,
        updated_at: now,
    };
    let mut tx = db.begin().await.unwrap();
    BatchRepository::insert_tx(&mut tx, &batch).await.unwrap();
    tx.commit().await.unwrap();
    batch
}

/// Seeds an order with lines: (product_id, ordered, already_received).
pub(crate) async fn seed_order(
    db: &Database,
    supplier_id: &str,
    status: PurchaseOrderStatus,
    lines: &[(Option<String>, i64, i64)],
) -> (PurchaseOrder, Vec<PurchaseOrderItem>) {
    let now = Utc::now();
    let order = PurchaseOrder {
        id: generate_order_id(),
        tenant_id: TENANT.to_string(),
        supplier_id: supplier_id.to_string(),
        order_number: format!("PO-{}", &Uuid::new_v4().simple().to_string()[..8]),
        status,
        notes: None,
        ordered_at: None,
        received_at: None,
        created_at: now,
        updated_at: now,
    };

    let items: Vec<PurchaseOrderItem> = lines
        .iter()
        .enumerate()
        .map(|(i, (product_id, ordered, received))| PurchaseOrderItem {
            id: generate_order_item_id(),
            purchase_order_id: order.id.clone(),
            product_id: product_id.clone(),
            name: format!("Line {i}"),
            ordered_quantity: *ordered,
            received_quantity: *received,
            unit_cost_cents: Some(100),
        })
        .collect();

    db.purchase_orders().insert(&order, &items).await.unwrap();
    (order, items)
}

pub(crate) async fn seed_rule(db: &Database, product_id: &str, point: i64, quantity: i64) -> ReorderRule {
    let now = Utc::now();
    let rule = ReorderRule {
        id: generate_rule_id(),
        tenant_id: TENANT.to_string(),
        product_id: product_id.to_string(),
        reorder_point: point,
        reorder_quantity: quantity,
        preferred_supplier_id: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.reorder_rules().insert(&rule).await.unwrap();
    rule
}

/// Seeds a completed sale with one line, backdated to `completed_at`,
/// without touching stock counters (history seeding for forecasts).
pub(crate) async fn seed_completed_sale(
    db: &Database,
    product_id: &str,
    quantity: i64,
    completed_at: DateTime<Utc>,
) -> Sale {
    let sale = Sale {
        id: generate_sale_id(),
        tenant_id: TENANT.to_string(),
        receipt_number: format!("R-{}", &Uuid::new_v4().simple().to_string()[..8]),
        status: SaleStatus::Completed,
        subtotal_cents: quantity * 500,
        total_cents: quantity * 500,
        user_id: USER.to_string(),
        notes: None,
        created_at: completed_at,
        completed_at: Some(completed_at),
    };
    let item = SaleItem {
        id: generate_sale_item_id(),
        sale_id: sale.id.clone(),
        product_id: product_id.to_string(),
        name_snapshot: "History".to_string(),
        quantity,
        unit_price_cents: 500,
        line_total_cents: quantity * 500,
        created_at: completed_at,
    };

    let mut tx = db.begin().await.unwrap();
    SaleRepository::insert_sale_tx(&mut tx, &sale).await.unwrap();
    SaleRepository::insert_item_tx(&mut tx, &item).await.unwrap();
    tx.commit().await.unwrap();
    sale
}

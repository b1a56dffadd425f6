//! End-to-end replenishment scenarios against a real SQLite database.

use chrono::{DateTime, Duration, Utc};
use shelf_core::analytics::DataQuality;
use shelf_core::{Actor, CoreError, MovementDirection, OrderStatus, Product, StockMovement, Urgency, Vendor};
use shelf_db::{generate_id, Database, DbConfig, MovementRepository, NewProduct, ProductRepository};
use shelf_engine::{Engine, EngineConfig, EngineError, NewOrder};
use std::sync::Arc;

// =============================================================================
// Helpers
// =============================================================================

fn admin() -> Actor {
    Actor::admin("root")
}

fn manager() -> Actor {
    Actor::manager("alice")
}

fn acme() -> Actor {
    Actor::vendor("acme@example.com")
}

async fn engine() -> Engine {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    Engine::new(db, EngineConfig::default())
}

async fn vendor(engine: &Engine) -> Vendor {
    engine.add_vendor("Acme", "acme@example.com", &admin()).await.unwrap()
}

async fn product(engine: &Engine, sku: &str, stock: i64, new: NewProduct) -> Product {
    let product = engine.add_product(NewProduct { sku: sku.into(), ..new }, &admin()).await.unwrap();
    if stock > 0 {
        engine.record_in(&product.id, stock, Some("opening"), &admin()).await.unwrap();
    }
    engine.product(&product.id).await.unwrap()
}

/// Writes an OUT movement at a past instant through the same primitives the
/// ledger uses.
async fn backdated_out(db: &Database, product_id: &str, quantity: i64, at: DateTime<Utc>) {
    let mut tx = db.begin().await.unwrap();
    ProductRepository::try_adjust_quantity(&mut tx, product_id, -quantity, at)
        .await
        .unwrap();
    let movement = StockMovement {
        id: generate_id(),
        product_id: product_id.to_string(),
        direction: MovementDirection::Out,
        quantity,
        notes: None,
        actor: "history".into(),
        occurred_at: at,
    };
    MovementRepository::insert(&mut tx, &movement).await.unwrap();
    tx.commit().await.unwrap();
}

async fn assert_ledger_consistent(engine: &Engine, product_id: &str) -> i64 {
    let quantity = engine.product(product_id).await.unwrap().quantity;
    let net = engine.db().movements().net_quantity(product_id).await.unwrap();
    assert_eq!(quantity, net, "quantity must equal the signed movement sum");
    assert!(quantity >= 0);
    quantity
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn scenario_a_no_history_uses_defaults() {
    let engine = engine().await;
    let p = product(&engine, "SCN-A", 12, NewProduct::new("", "Flour").reorder(10, 20)).await;

    let prediction = engine.predict(&p.id).await.unwrap();

    assert_eq!(prediction.analytics.data_quality, DataQuality::Low);
    assert_eq!(prediction.analytics.average_daily_consumption, 1.0);
    // 12 units at the default rate of 1/day
    assert_eq!(prediction.days_until_stockout, 12);
    assert_eq!(prediction.urgency, Urgency::Medium);
    assert!(prediction.recommended_quantity >= 20);
}

#[tokio::test]
async fn scenario_b_steady_consumption_is_critical() {
    let engine = engine().await;
    let p = product(&engine, "SCN-B", 64, NewProduct::new("", "Rice").reorder(10, 20)).await;

    // 30 movements of 2 units spanning exactly 30 days
    let now = Utc::now();
    let days_ago: Vec<i64> = std::iter::once(30).chain((0..29).rev()).collect();
    for day in days_ago {
        backdated_out(engine.db(), &p.id, 2, now - Duration::days(day)).await;
    }
    assert_eq!(assert_ledger_consistent(&engine, &p.id).await, 4);

    let prediction = engine
        .restock()
        .predict_as_of(&p.id, now + Duration::minutes(1))
        .await
        .unwrap();

    let rate = prediction.analytics.average_daily_consumption;
    assert!((rate - 2.0).abs() < 1e-9, "rate was {rate}");
    assert_eq!(prediction.analytics.days_covered, 30);
    assert_eq!(prediction.days_until_stockout, 2);
    assert_eq!(prediction.urgency, Urgency::Critical);
    assert_eq!(prediction.analytics.transaction_count, 30);
}

#[tokio::test]
async fn scenario_c_stock_out_raises_one_pending_order() {
    let engine = engine().await;
    let v = vendor(&engine).await;
    let p = product(&engine, "SCN-C", 5, NewProduct::new("", "Sugar").reorder(10, 40).vendor(&v.id)).await;

    let outcome = engine.record_out(&p.id, 5, None, &manager()).await.unwrap();

    assert_eq!(outcome.product.quantity, 0);
    let signal = outcome.low_stock.expect("low-stock signal");
    assert_eq!(signal.new_quantity, 0);
    assert_eq!(signal.reorder_level, 10);

    let orders = engine.orders().list(None).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Pending);
    assert_eq!(orders[0].quantity, 40);
    assert_eq!(orders[0].product_id, p.id);
}

#[tokio::test]
async fn scenario_c_without_vendor_still_records_the_movement() {
    let engine = engine().await;
    let p = product(&engine, "SCN-C2", 5, NewProduct::new("", "Salt").reorder(10, 40)).await;

    let outcome = engine.record_out(&p.id, 5, None, &manager()).await.unwrap();

    assert!(outcome.low_stock.is_some());
    assert!(outcome.auto_orders.is_empty());
    assert_eq!(assert_ledger_consistent(&engine, &p.id).await, 0);
}

#[tokio::test]
async fn scenario_d_completion_receives_stock_exactly_once() {
    let engine = engine().await;
    let v = vendor(&engine).await;
    let p = product(&engine, "SCN-D", 7, NewProduct::new("", "Oil").vendor(&v.id)).await;

    let order = engine
        .create_order(
            NewOrder {
                product_id: p.id.clone(),
                quantity: 20,
                vendor_id: None,
                notes: None,
            },
            &manager(),
        )
        .await
        .unwrap();
    engine.approve_order(&order.id, &manager()).await.unwrap();
    engine.accept_order(&order.id, None, &acme()).await.unwrap();
    engine.dispatch_order(&order.id, Some("TRK-42"), &acme()).await.unwrap();

    let movements_before = engine.db().movements().count_for_product(&p.id).await.unwrap();
    let done = engine.complete_order(&order.id, &manager()).await.unwrap();

    assert_eq!(done.order.status, OrderStatus::Completed);
    assert_eq!(done.stock.product.quantity, 27);
    assert_eq!(done.stock.movement.direction, MovementDirection::In);
    assert_eq!(
        engine.db().movements().count_for_product(&p.id).await.unwrap(),
        movements_before + 1
    );

    let err = engine.complete_order(&order.id, &manager()).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::InvalidTransition { current: OrderStatus::Completed, .. })
    ));
    assert_eq!(assert_ledger_consistent(&engine, &p.id).await, 27);
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn ledger_invariant_holds_over_mixed_sequence() {
    let engine = engine().await;
    let p = product(&engine, "INV-1", 0, NewProduct::new("", "Beans")).await;

    // Deterministic pseudo-random walk, including rejected stock-outs
    let mut seed: u64 = 0x5eed;
    for _ in 0..60 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let quantity = (seed >> 33) as i64 % 9 + 1;
        let result = if (seed >> 17) % 3 == 0 {
            engine.record_in(&p.id, quantity, None, &manager()).await
        } else {
            engine.record_out(&p.id, quantity, None, &manager()).await
        };

        match result {
            Ok(_) | Err(EngineError::Core(CoreError::InsufficientStock { .. })) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
        assert_ledger_consistent(&engine, &p.id).await;
    }
}

#[tokio::test]
async fn round_trip_restores_quantity() {
    let engine = engine().await;
    let p = product(&engine, "RT-1", 13, NewProduct::new("", "Tea")).await;

    engine.record_in(&p.id, 50, None, &manager()).await.unwrap();
    engine.record_out(&p.id, 50, None, &manager()).await.unwrap();

    assert_eq!(engine.product(&p.id).await.unwrap().quantity, 13);
}

#[tokio::test]
async fn oversized_stock_out_changes_nothing() {
    let engine = engine().await;
    let p = product(&engine, "BND-1", 3, NewProduct::new("", "Jam")).await;

    let err = engine.record_out(&p.id, 4, None, &manager()).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::InsufficientStock { available: 3, requested: 4, .. })
    ));
    assert_eq!(assert_ledger_consistent(&engine, &p.id).await, 3);
}

#[tokio::test]
async fn terminal_orders_accept_no_events() {
    let engine = engine().await;
    let v = vendor(&engine).await;
    let p = product(&engine, "TRM-1", 0, NewProduct::new("", "Soap").vendor(&v.id)).await;
    let request = NewOrder {
        product_id: p.id.clone(),
        quantity: 5,
        vendor_id: None,
        notes: None,
    };

    let rejected = engine.create_order(request, &manager()).await.unwrap();
    engine.reject_order(&rejected.id, "duplicate", &manager()).await.unwrap();

    let results = [
        engine.approve_order(&rejected.id, &admin()).await.err(),
        engine.reject_order(&rejected.id, "again", &admin()).await.err(),
        engine.accept_order(&rejected.id, None, &acme()).await.err(),
        engine.dispatch_order(&rejected.id, None, &acme()).await.err(),
        engine.complete_order(&rejected.id, &admin()).await.err(),
    ];
    for err in results {
        assert!(matches!(
            err,
            Some(EngineError::Core(CoreError::InvalidTransition { current: OrderStatus::Rejected, .. }))
        ));
    }
}

// =============================================================================
// Concurrency (file-backed, multiple connections)
// =============================================================================

async fn file_engine(dir: &tempfile::TempDir) -> Engine {
    let db = Database::new(DbConfig::new(dir.path().join("shelf.db")).max_connections(5))
        .await
        .unwrap();
    Engine::new(db, EngineConfig::default())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_stock_outs_never_oversell() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(file_engine(&dir).await);
    let p = product(&engine, "CON-1", 10, NewProduct::new("", "Eggs").reorder(1, 5)).await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let engine = engine.clone();
        let id = p.id.clone();
        tasks.push(tokio::spawn(async move {
            engine.record_out(&id, 1, None, &Actor::manager("till")).await
        }));
    }

    let mut sold = 0;
    let mut refused = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => sold += 1,
            Err(EngineError::Core(CoreError::InsufficientStock { .. })) => refused += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(sold, 10);
    assert_eq!(refused, 10);
    assert_eq!(assert_ledger_consistent(&engine, &p.id).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_completions_apply_once() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(file_engine(&dir).await);
    let v = vendor(&engine).await;
    let p = product(&engine, "CON-2", 0, NewProduct::new("", "Milk").vendor(&v.id)).await;

    let order = engine
        .create_order(
            NewOrder {
                product_id: p.id.clone(),
                quantity: 20,
                vendor_id: None,
                notes: None,
            },
            &manager(),
        )
        .await
        .unwrap();
    engine.accept_order(&order.id, None, &acme()).await.unwrap();
    engine.dispatch_order(&order.id, None, &acme()).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..5 {
        let engine = engine.clone();
        let id = order.id.clone();
        tasks.push(tokio::spawn(async move { engine.complete_order(&id, &manager()).await }));
    }

    let mut completed = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => completed += 1,
            Err(EngineError::Core(CoreError::InvalidTransition { .. })) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(completed, 1);
    assert_eq!(assert_ledger_consistent(&engine, &p.id).await, 20);
}

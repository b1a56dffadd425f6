//! # Notifications
//!
//! The fire-and-forget `notify(audience, message, priority)` collaborator.
//!
//! [`Notifier::notify`] only queues into the notification outbox; delivery is
//! the [`OutboxDispatcher`](crate::outbox::OutboxDispatcher)'s job. Neither
//! step can fail the operation that produced the message.
//!
//! The message builders below decide who hears about what:
//!
//! | Event            | Audience                       | Priority |
//! |------------------|--------------------------------|----------|
//! | stock in / out   | managers                       | NORMAL   |
//! | low stock        | managers                       | HIGH     |
//! | order created    | admins, the vendor             | NORMAL   |
//! | approved         | the vendor                     | NORMAL   |
//! | accepted         | admins, creator                | NORMAL   |
//! | dispatched       | admins, creator                | NORMAL   |
//! | completed        | admins, the vendor             | NORMAL   |
//! | rejected         | admins (HIGH), the vendor      | mixed    |

use shelf_core::{
    Audience, LowStockSignal, MovementDirection, Notification, Product, PurchaseOrder, Role,
    StockMovement, SYSTEM_IDENTITY,
};
use shelf_db::{Database, NotificationOutboxRepository};
use tracing::warn;

/// Queues notifications into the outbox, swallowing failures.
#[derive(Debug, Clone)]
pub struct Notifier {
    outbox: NotificationOutboxRepository,
}

impl Notifier {
    pub fn new(db: &Database) -> Self {
        Notifier {
            outbox: db.outbox(),
        }
    }

    /// Queues one notification. Returns false (after logging) on failure.
    pub async fn notify(&self, notification: &Notification) -> bool {
        match self.outbox.enqueue(notification).await {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    audience = %notification.audience,
                    error = %e,
                    "Failed to queue notification"
                );
                false
            }
        }
    }
}

// =============================================================================
// Message Builders
// =============================================================================

fn managers() -> Audience {
    Audience::Role(Role::Manager)
}

fn admins() -> Audience {
    Audience::Role(Role::Admin)
}

fn vendor_of(order: &PurchaseOrder) -> Audience {
    Audience::Identity(order.vendor_contact.clone())
}

/// The creator, unless the order was generated automatically.
fn creator_of(order: &PurchaseOrder) -> Option<Audience> {
    (order.created_by != SYSTEM_IDENTITY).then(|| Audience::Identity(order.created_by.clone()))
}

pub(crate) fn stock_moved(product: &Product, movement: &StockMovement) -> Notification {
    let sign = match movement.direction {
        MovementDirection::In => '+',
        MovementDirection::Out => '-',
    };
    Notification::normal(
        managers(),
        format!(
            "Stock {}: {}{} {} ({}), now {} on hand",
            movement.direction, sign, movement.quantity, product.name, product.sku, product.quantity
        ),
    )
}

pub(crate) fn low_stock(product: &Product, signal: &LowStockSignal) -> Notification {
    Notification::high(
        managers(),
        format!(
            "Low stock: {} ({}) is at {}, reorder level {}",
            product.name, product.sku, signal.new_quantity, signal.reorder_level
        ),
    )
}

pub(crate) fn order_created(order: &PurchaseOrder) -> Vec<Notification> {
    let summary = format!(
        "New purchase order {}: {} x {}",
        order.order_number, order.quantity, order.product_name
    );
    vec![
        Notification::normal(admins(), format!("{} from {}", summary, order.vendor_contact)),
        Notification::normal(vendor_of(order), summary),
    ]
}

/// One message per vendor for a batch, instead of one per line.
pub(crate) fn orders_batched(orders: &[PurchaseOrder]) -> Vec<Notification> {
    let Some(first) = orders.first() else {
        return Vec::new();
    };
    let numbers: Vec<&str> = orders.iter().map(|o| o.order_number.as_str()).collect();
    let summary = format!("{} new purchase orders: {}", orders.len(), numbers.join(", "));
    vec![
        Notification::normal(admins(), format!("{} from {}", summary, first.vendor_contact)),
        Notification::normal(vendor_of(first), summary),
    ]
}

pub(crate) fn order_approved(order: &PurchaseOrder) -> Vec<Notification> {
    vec![Notification::normal(
        vendor_of(order),
        format!("Purchase order {} was approved and awaits your acceptance", order.order_number),
    )]
}

pub(crate) fn order_accepted(order: &PurchaseOrder) -> Vec<Notification> {
    let message = match order.delivery_date {
        Some(date) => format!(
            "Purchase order {} accepted by {}, delivery expected {}",
            order.order_number, order.vendor_contact, date
        ),
        None => format!("Purchase order {} accepted by {}", order.order_number, order.vendor_contact),
    };
    staff_and_creator(order, message)
}

pub(crate) fn order_dispatched(order: &PurchaseOrder) -> Vec<Notification> {
    let message = match order.dispatch_tracking.as_deref() {
        Some(tracking) => format!(
            "Purchase order {} dispatched (tracking {})",
            order.order_number, tracking
        ),
        None => format!("Purchase order {} dispatched", order.order_number),
    };
    staff_and_creator(order, message)
}

pub(crate) fn order_completed(order: &PurchaseOrder) -> Vec<Notification> {
    let message = format!(
        "Purchase order {} received: {} x {} added to stock",
        order.order_number, order.quantity, order.product_name
    );
    vec![
        Notification::normal(admins(), message.clone()),
        Notification::normal(vendor_of(order), message),
    ]
}

pub(crate) fn order_rejected(order: &PurchaseOrder, by: &str, reason: &str) -> Vec<Notification> {
    let message = format!(
        "Purchase order {} rejected by {}: {}",
        order.order_number, by, reason
    );
    let mut out = vec![Notification::high(admins(), message.clone())];
    if !by.eq_ignore_ascii_case(&order.vendor_contact) {
        out.push(Notification::normal(vendor_of(order), message));
    }
    out
}

fn staff_and_creator(order: &PurchaseOrder, message: String) -> Vec<Notification> {
    let mut out = vec![Notification::normal(admins(), message.clone())];
    if let Some(creator) = creator_of(order) {
        out.push(Notification::normal(creator, message));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shelf_core::{OrderStatus, Priority};
    use shelf_db::DbConfig;

    fn order(created_by: &str) -> PurchaseOrder {
        let now = Utc::now();
        PurchaseOrder {
            id: "o-1".into(),
            order_number: "PO-20240301-ABCDEF12".into(),
            vendor_id: "v-1".into(),
            vendor_contact: "acme@example.com".into(),
            product_id: "p-1".into(),
            product_name: "Widget".into(),
            quantity: 20,
            status: OrderStatus::Dispatched,
            created_by: created_by.into(),
            approved_by: None,
            delivery_date: None,
            dispatch_tracking: Some("TRK-1".into()),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_system_orders_do_not_notify_a_creator() {
        assert_eq!(order_dispatched(&order(SYSTEM_IDENTITY)).len(), 1);

        let by_alice = order_dispatched(&order("alice"));
        assert_eq!(by_alice.len(), 2);
        assert_eq!(by_alice[1].audience, Audience::Identity("alice".into()));
        assert!(by_alice[0].message.contains("TRK-1"));
    }

    #[test]
    fn test_rejection_by_vendor_goes_to_admins_only() {
        let o = order("alice");
        let by_vendor = order_rejected(&o, "ACME@example.com", "out of stock");
        assert_eq!(by_vendor.len(), 1);
        assert_eq!(by_vendor[0].priority, Priority::High);

        let by_staff = order_rejected(&o, "alice", "too expensive");
        assert_eq!(by_staff.len(), 2);
        assert_eq!(by_staff[1].audience, Audience::Identity("acme@example.com".into()));
    }

    #[tokio::test]
    async fn test_notify_queues_into_outbox() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let notifier = Notifier::new(&db);

        for n in order_created(&order("alice")) {
            assert!(notifier.notify(&n).await);
        }
        assert_eq!(db.outbox().count_pending().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_notify_failure_is_swallowed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let notifier = Notifier::new(&db);
        db.close().await;

        let n = Notification::normal(Audience::Role(Role::Admin), "hello");
        assert!(!notifier.notify(&n).await);
    }
}

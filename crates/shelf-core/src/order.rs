//! # Purchase-Order Rules
//!
//! The declarative transition table and the single authorization check that
//! every purchase-order event goes through.
//!
//! ## Transition Table
//! ```text
//! ┌──────────────────────────────┬──────────┬────────────────────┬────────────┐
//! │ From                         │ Event    │ Actor              │ To         │
//! ├──────────────────────────────┼──────────┼────────────────────┼────────────┤
//! │ PENDING                      │ approve  │ staff              │ APPROVED   │
//! │ PENDING, APPROVED, ACCEPTED  │ reject   │ staff or vendor*   │ REJECTED   │
//! │ PENDING, APPROVED            │ accept   │ vendor*            │ ACCEPTED   │
//! │ ACCEPTED                     │ dispatch │ vendor*            │ DISPATCHED │
//! │ DISPATCHED                   │ complete │ staff              │ COMPLETED  │
//! └──────────────────────────────┴──────────┴────────────────────┴────────────┘
//!   staff   = admin or manager
//!   vendor* = vendor whose identity equals the order's vendor contact
//! ```
//!
//! Under [`AcceptPolicy::Strict`] a vendor may only accept APPROVED orders.
//!
//! Authorization is evaluated before the source status, so a vendor probing
//! another vendor's order learns nothing about its state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{Actor, OrderStatus, PurchaseOrder, Role};

// =============================================================================
// Events & Rules
// =============================================================================

/// An explicit purchase-order lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEvent {
    Approve,
    Reject,
    Accept,
    Dispatch,
    Complete,
}

impl OrderEvent {
    pub const ALL: [OrderEvent; 5] = [
        OrderEvent::Approve,
        OrderEvent::Reject,
        OrderEvent::Accept,
        OrderEvent::Dispatch,
        OrderEvent::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEvent::Approve => "approve",
            OrderEvent::Reject => "reject",
            OrderEvent::Accept => "accept",
            OrderEvent::Dispatch => "dispatch",
            OrderEvent::Complete => "complete",
        }
    }
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who may trigger a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRule {
    /// Admin or manager.
    Staff,
    /// The vendor the order was placed with.
    AssignedVendor,
    /// Either of the above.
    StaffOrAssignedVendor,
}

/// Which statuses a vendor may accept from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptPolicy {
    /// PENDING or APPROVED.
    #[default]
    Permissive,
    /// APPROVED only.
    Strict,
}

impl FromStr for AcceptPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(AcceptPolicy::Permissive),
            "strict" => Ok(AcceptPolicy::Strict),
            _ => Err(ValidationError::NotAllowed {
                field: "accept_policy".to_string(),
                allowed: vec!["permissive".into(), "strict".into()],
            }),
        }
    }
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub event: OrderEvent,
    pub from: &'static [OrderStatus],
    pub to: OrderStatus,
    pub actor: ActorRule,
}

impl Transition {
    /// True when `status` is an allowed source for this transition.
    pub fn allows(&self, status: OrderStatus) -> bool {
        self.from.contains(&status)
    }
}

const APPROVE: Transition = Transition {
    event: OrderEvent::Approve,
    from: &[OrderStatus::Pending],
    to: OrderStatus::Approved,
    actor: ActorRule::Staff,
};

const REJECT: Transition = Transition {
    event: OrderEvent::Reject,
    from: &[OrderStatus::Pending, OrderStatus::Approved, OrderStatus::Accepted],
    to: OrderStatus::Rejected,
    actor: ActorRule::StaffOrAssignedVendor,
};

const ACCEPT_PERMISSIVE: Transition = Transition {
    event: OrderEvent::Accept,
    from: &[OrderStatus::Pending, OrderStatus::Approved],
    to: OrderStatus::Accepted,
    actor: ActorRule::AssignedVendor,
};

const ACCEPT_STRICT: Transition = Transition {
    from: &[OrderStatus::Approved],
    ..ACCEPT_PERMISSIVE
};

const DISPATCH: Transition = Transition {
    event: OrderEvent::Dispatch,
    from: &[OrderStatus::Accepted],
    to: OrderStatus::Dispatched,
    actor: ActorRule::AssignedVendor,
};

const COMPLETE: Transition = Transition {
    event: OrderEvent::Complete,
    from: &[OrderStatus::Dispatched],
    to: OrderStatus::Completed,
    actor: ActorRule::Staff,
};

/// Looks up the table row for `event` under `policy`.
pub fn transition_for(event: OrderEvent, policy: AcceptPolicy) -> Transition {
    match event {
        OrderEvent::Approve => APPROVE,
        OrderEvent::Reject => REJECT,
        OrderEvent::Accept => match policy {
            AcceptPolicy::Permissive => ACCEPT_PERMISSIVE,
            AcceptPolicy::Strict => ACCEPT_STRICT,
        },
        OrderEvent::Dispatch => DISPATCH,
        OrderEvent::Complete => COMPLETE,
    }
}

// =============================================================================
// Authorization
// =============================================================================

/// True when `actor` is the vendor `order` was placed with.
pub fn is_assigned_vendor(actor: &Actor, order: &PurchaseOrder) -> bool {
    actor.role == Role::Vendor && actor.identity.eq_ignore_ascii_case(&order.vendor_contact)
}

/// Checks an actor against a rule for a given order.
pub fn authorize(actor: &Actor, order: &PurchaseOrder, rule: ActorRule, event: &str) -> CoreResult<()> {
    let allowed = match rule {
        ActorRule::Staff => actor.role.is_staff(),
        ActorRule::AssignedVendor => is_assigned_vendor(actor, order),
        ActorRule::StaffOrAssignedVendor => actor.role.is_staff() || is_assigned_vendor(actor, order),
    };

    if allowed {
        return Ok(());
    }

    let reason = match (rule, actor.role) {
        (ActorRule::Staff, _) => format!("only an admin or manager may {} an order", event),
        (_, Role::Vendor) => format!(
            "vendor {} may only {} orders placed with them",
            actor.identity, event
        ),
        _ => format!("only the assigned vendor may {} order {}", event, order.order_number),
    };
    Err(CoreError::forbidden(reason))
}

/// Validates `event` on `order` for `actor` and returns the target status.
///
/// Fails with `Forbidden` first, then with `InvalidTransition`.
pub fn check_transition(
    order: &PurchaseOrder,
    event: OrderEvent,
    actor: &Actor,
    policy: AcceptPolicy,
) -> CoreResult<OrderStatus> {
    let transition = transition_for(event, policy);

    authorize(actor, order, transition.actor, event.as_str())?;

    if !transition.allows(order.status) {
        return Err(CoreError::InvalidTransition {
            order_id: order.id.clone(),
            current: order.status,
            event: event.to_string(),
        });
    }

    Ok(transition.to)
}

/// Only staff may create orders.
pub fn authorize_create(actor: &Actor) -> CoreResult<()> {
    if actor.role.is_staff() {
        Ok(())
    } else {
        Err(CoreError::forbidden("only an admin or manager may create orders"))
    }
}

/// Only admins may delete, and only PENDING or REJECTED orders.
pub fn check_delete(order: &PurchaseOrder, actor: &Actor) -> CoreResult<()> {
    if actor.role != Role::Admin {
        return Err(CoreError::forbidden("only an admin may delete orders"));
    }
    if !order.status.is_deletable() {
        return Err(CoreError::InvalidTransition {
            order_id: order.id.clone(),
            current: order.status,
            event: "delete".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Formatting
// =============================================================================

/// `PO-YYYYMMDD-XXXXXXXX`: creation date plus 8 hex digits of a UUID.
pub fn format_order_number(date: NaiveDate, id: Uuid) -> String {
    let simple = id.simple().to_string().to_ascii_uppercase();
    format!("PO-{}-{}", date.format("%Y%m%d"), &simple[..8])
}

/// Note appended to an order on rejection.
pub fn rejection_note(reason: &str) -> String {
    format!("Rejection reason: {}", reason.trim())
}

/// Notes on the IN movement written when an order completes.
pub fn completion_note(order_number: &str) -> String {
    format!("PO #{} received", order_number)
}

// =============================================================================
// Unit Tests
// =============================================================================

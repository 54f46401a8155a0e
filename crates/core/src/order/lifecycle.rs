//! Order status state machine.
//!
//! ```text
//! new ──► confirmed ──► preparing ──► shipping_in_progress ──► delivered ──► completed
//!  │          │             │                │        │             │
//!  │          └──── cancel ─┴────► cancelled │        │             │
//!  │                                ▲        │        └─► delivery_failed ─► return_requested ─► refunded
//!  └─► payment_overdue ── cancel ───┘        │
//!                                            └──── cancellation_requested ◄── (delivered)
//!                                                   ├─ approve ─► cancelled
//!                                                   └─ reject ──► status before the request
//! ```
//!
//! [`apply`] is pure: it checks the move against the current state and the
//! actor, and describes the new state, the timeline entry to append and the
//! side effects the caller must persist in the same transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ActorKind, OrderStatus, PaymentMethod, PaymentStatus};

/// A request to move an order through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    Confirm,
    StartPreparing,
    Ship,
    MarkDelivered,
    MarkDeliveryFailed,
    Cancel,
    RequestCancellation,
    ApproveCancellation,
    RejectCancellation,
    ConfirmReceipt,
    AutoComplete,
    MarkPaymentOverdue,
    RequestReturn,
    Refund,
    RecordPayment,
}

impl OrderAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::StartPreparing => "start_preparing",
            Self::Ship => "ship",
            Self::MarkDelivered => "mark_delivered",
            Self::MarkDeliveryFailed => "mark_delivery_failed",
            Self::Cancel => "cancel",
            Self::RequestCancellation => "request_cancellation",
            Self::ApproveCancellation => "approve_cancellation",
            Self::RejectCancellation => "reject_cancellation",
            Self::ConfirmReceipt => "confirm_receipt",
            Self::AutoComplete => "auto_complete",
            Self::MarkPaymentOverdue => "mark_payment_overdue",
            Self::RequestReturn => "request_return",
            Self::Refund => "refund",
            Self::RecordPayment => "record_payment",
        }
    }

    /// Whether `actor` may perform this action at all.
    #[must_use]
    pub const fn permits(self, actor: ActorKind) -> bool {
        use ActorKind::{Customer, Shop, System};
        match self {
            Self::Confirm
            | Self::StartPreparing
            | Self::Ship
            | Self::MarkDelivered
            | Self::MarkDeliveryFailed
            | Self::ApproveCancellation
            | Self::RejectCancellation
            | Self::Refund => matches!(actor, Shop),
            Self::Cancel => true,
            Self::RequestCancellation | Self::ConfirmReceipt => matches!(actor, Customer),
            Self::AutoComplete | Self::MarkPaymentOverdue => matches!(actor, System),
            Self::RequestReturn => matches!(actor, Customer | Shop),
            Self::RecordPayment => matches!(actor, Shop | System),
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::Confirm => "Order confirmed by the shop",
            Self::StartPreparing => "The shop is preparing the order",
            Self::Ship => "Order handed to the carrier",
            Self::MarkDelivered => "Order delivered",
            Self::MarkDeliveryFailed => "Delivery attempt failed",
            Self::Cancel => "Order cancelled",
            Self::RequestCancellation => "Cancellation requested, awaiting shop approval",
            Self::ApproveCancellation => "Cancellation approved by the shop",
            Self::RejectCancellation => "Cancellation request declined by the shop",
            Self::ConfirmReceipt => "Customer confirmed receipt",
            Self::AutoComplete => "Order completed automatically after delivery",
            Self::MarkPaymentOverdue => "Payment was not received in time",
            Self::RequestReturn => "Return requested",
            Self::Refund => "Order refunded",
            Self::RecordPayment => "Payment received",
        }
    }
}

impl std::fmt::Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_owned()))
            .map_err(|_| format!("invalid order action: {s}"))
    }
}

/// Who performed a transition, as recorded on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_type: ActorKind,
    pub user_name: String,
}

impl Actor {
    #[must_use]
    pub fn customer(name: impl Into<String>) -> Self {
        Self {
            user_type: ActorKind::Customer,
            user_name: name.into(),
        }
    }

    #[must_use]
    pub fn shop(name: impl Into<String>) -> Self {
        Self {
            user_type: ActorKind::Shop,
            user_name: name.into(),
        }
    }

    #[must_use]
    pub fn system() -> Self {
        Self {
            user_type: ActorKind::System,
            user_name: "system".to_owned(),
        }
    }
}

/// One immutable line of an order's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub status: OrderStatus,
    pub description: String,
    pub performed_by: Actor,
    pub timestamp: DateTime<Utc>,
}

impl TimelineEntry {
    /// The first entry of every order.
    #[must_use]
    pub fn placed(actor: Actor, now: DateTime<Utc>) -> Self {
        Self {
            status: OrderStatus::New,
            description: "Order placed".to_owned(),
            performed_by: actor,
            timestamp: now,
        }
    }
}

/// The lifecycle-relevant part of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderState {
    pub status: OrderStatus,
    /// Status to return to if a pending cancellation request is declined.
    pub resume_status: Option<OrderStatus>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
}

impl OrderState {
    /// State of a freshly placed order.
    #[must_use]
    pub const fn placed(payment_method: PaymentMethod) -> Self {
        Self {
            status: OrderStatus::New,
            resume_status: None,
            payment_method,
            payment_status: PaymentStatus::Pending,
        }
    }

    #[must_use]
    pub const fn can_cancel(&self) -> bool {
        self.status.can_cancel()
    }
}

/// Side effects the caller must persist alongside the new state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Effects {
    /// Return redeemed loyalty points to the customer.
    pub restore_points: bool,
    /// Credit loyalty points earned by the order.
    pub credit_loyalty: bool,
}

/// A validated transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub state: OrderState,
    pub entry: TimelineEntry,
    pub effects: Effects,
}

/// Why a transition was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot {action} an order that is {status}")]
    NotAllowed {
        action: OrderAction,
        status: OrderStatus,
    },
    #[error("{actor} is not permitted to {action}")]
    Forbidden {
        action: OrderAction,
        actor: ActorKind,
    },
}

/// Apply `action` to an order in `state`.
///
/// `note` is appended to the timeline description when given.
///
/// # Errors
///
/// Returns [`TransitionError::Forbidden`] if the actor may never perform the
/// action, and [`TransitionError::NotAllowed`] if the order's current state
/// does not allow it.
pub fn apply(
    state: &OrderState,
    action: OrderAction,
    actor: Actor,
    note: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    use OrderStatus as S;

    if !action.permits(actor.user_type) {
        return Err(TransitionError::Forbidden {
            action,
            actor: actor.user_type,
        });
    }
    let not_allowed = || TransitionError::NotAllowed {
        action,
        status: state.status,
    };

    let mut next = *state;
    let mut effects = Effects::default();

    match (action, state.status) {
        (OrderAction::Confirm, S::New) => next.status = S::Confirmed,
        (OrderAction::StartPreparing, S::Confirmed) => next.status = S::Preparing,
        (OrderAction::Ship, S::Preparing) => next.status = S::ShippingInProgress,
        (OrderAction::MarkDelivered, S::ShippingInProgress) => {
            next.status = S::Delivered;
            if state.payment_method == PaymentMethod::Cod {
                next.payment_status = PaymentStatus::Paid;
            }
        }
        (OrderAction::MarkDeliveryFailed, S::ShippingInProgress) => {
            next.status = S::DeliveryFailed;
        }
        (OrderAction::Cancel, S::New | S::Confirmed | S::Preparing | S::PaymentOverdue) => {
            cancel(&mut next, &mut effects);
        }
        (OrderAction::RequestCancellation, S::ShippingInProgress | S::Delivered) => {
            next.status = S::CancellationRequested;
            next.resume_status = Some(state.status);
        }
        (OrderAction::ApproveCancellation, S::CancellationRequested) => {
            cancel(&mut next, &mut effects);
        }
        (OrderAction::RejectCancellation, S::CancellationRequested) => {
            next.status = state.resume_status.ok_or_else(not_allowed)?;
            next.resume_status = None;
        }
        (OrderAction::ConfirmReceipt | OrderAction::AutoComplete, S::Delivered) => {
            next.status = S::Completed;
            effects.credit_loyalty = true;
        }
        (OrderAction::MarkPaymentOverdue, S::New)
            if state.payment_method.is_prepaid()
                && state.payment_status == PaymentStatus::Pending =>
        {
            next.status = S::PaymentOverdue;
        }
        (OrderAction::RequestReturn, S::DeliveryFailed) => next.status = S::ReturnRequested,
        (OrderAction::Refund, S::ReturnRequested) => {
            next.status = S::Refunded;
            effects.restore_points = true;
            if state.payment_status == PaymentStatus::Paid {
                next.payment_status = PaymentStatus::Refunded;
            }
        }
        (OrderAction::RecordPayment, status)
            if !status.is_terminal() && state.payment_status == PaymentStatus::Pending =>
        {
            next.payment_status = PaymentStatus::Paid;
            if status == S::PaymentOverdue {
                next.status = S::New;
            }
        }
        _ => return Err(not_allowed()),
    }

    let description = match note.map(str::trim).filter(|n| !n.is_empty()) {
        Some(note) => format!("{}: {note}", action.description()),
        None => action.description().to_owned(),
    };

    Ok(Transition {
        from: state.status,
        state: next,
        entry: TimelineEntry {
            status: next.status,
            description,
            performed_by: actor,
            timestamp: now,
        },
        effects,
    })
}

fn cancel(next: &mut OrderState, effects: &mut Effects) {
    next.status = OrderStatus::Cancelled;
    next.resume_status = None;
    effects.restore_points = true;
    if next.payment_status == PaymentStatus::Paid {
        next.payment_status = PaymentStatus::Refunded;
    }
}

/// The action a customer's "cancel" button maps to in `status`.
///
/// Early orders are cancelled outright; orders already with the carrier or
/// delivered need the shop to approve a cancellation request.
#[must_use]
pub const fn customer_cancel_action(status: OrderStatus) -> OrderAction {
    match status {
        OrderStatus::ShippingInProgress | OrderStatus::Delivered => {
            OrderAction::RequestCancellation
        }
        _ => OrderAction::Cancel,
    }
}

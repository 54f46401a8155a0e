//! Order lifecycle.
//!
//! - [`lifecycle`] - Status transitions, who may perform them, and their side effects

pub mod lifecycle;

pub use lifecycle::{
    Actor, Effects, OrderAction, OrderState, TimelineEntry, Transition, TransitionError, apply,
    customer_cancel_action,
};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::order::{self, Actor, OrderAction, OrderState};
    use crate::{OrderStatus, PaymentMethod};

    #[test]
    fn test_apply_from_module_root() {
        let now = Utc.with_ymd_and_hms(2026, 5, 2, 8, 0, 0).unwrap();
        let placed = OrderState::placed(PaymentMethod::Cod);

        let confirmed = order::apply(&placed, OrderAction::Confirm, Actor::shop("Mai"), None, now).unwrap();
        assert_eq!(confirmed.from, OrderStatus::New);
        assert_eq!(confirmed.state.status, OrderStatus::Confirmed);
        assert_eq!(confirmed.entry.timestamp, now);
    }
}

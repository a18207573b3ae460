//! Customer cancellation refund policy
//!
//! Pure computation of how much of an order's total comes back when
//! the customer cancels, based on timing relative to the scheduled
//! pickup and how far the order has progressed:
//!
//! | Situation | Refund |
//! |-----------|--------|
//! | items already picked up / in progress | 50% |
//! | ≥ 6 h before scheduled pickup | 100% |
//! | < 6 h before pickup | total − $10 fee (floor 0) |
//! | past pickup time, never picked up | 50% |
//!
//! Whether any money actually moves (refund vs releasing an
//! uncaptured authorization) is the lifecycle service's concern.

use shared::models::OrderStatus;

/// Flat fee for cancellations inside the cutoff
pub const LATE_CANCEL_FEE_CENTS: i64 = 1000;

/// Free-cancellation cutoff before the scheduled pickup
pub const FREE_CANCEL_CUTOFF_MS: i64 = 6 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationBasis {
    /// Items already collected; half comes back
    InProgress,
    /// Canceled with ≥ 6 h notice
    Early,
    /// Canceled inside the 6 h cutoff
    Late,
    /// Pickup time passed without a pickup
    MissedPickup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CancellationQuote {
    pub basis: CancellationBasis,
    pub refund_cents: i64,
    pub fee_cents: i64,
}

/// Refund quote for a customer cancellation at `now_ms`
pub fn cancellation_quote(
    status: OrderStatus,
    pickup_at_ms: i64,
    now_ms: i64,
    total_cents: i64,
) -> CancellationQuote {
    if status.is_in_progress() {
        return CancellationQuote {
            basis: CancellationBasis::InProgress,
            refund_cents: total_cents / 2,
            fee_cents: 0,
        };
    }

    if now_ms <= pickup_at_ms - FREE_CANCEL_CUTOFF_MS {
        CancellationQuote {
            basis: CancellationBasis::Early,
            refund_cents: total_cents,
            fee_cents: 0,
        }
    } else if now_ms < pickup_at_ms {
        CancellationQuote {
            basis: CancellationBasis::Late,
            refund_cents: (total_cents - LATE_CANCEL_FEE_CENTS).max(0),
            fee_cents: LATE_CANCEL_FEE_CENTS,
        }
    } else {
        CancellationQuote {
            basis: CancellationBasis::MissedPickup,
            refund_cents: total_cents / 2,
            fee_cents: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: i64 = 60 * 60 * 1000;
    const PICKUP: i64 = 100 * HOUR_MS;

    #[test]
    fn early_cancel_refunds_everything() {
        let q = cancellation_quote(OrderStatus::Scheduled, PICKUP, PICKUP - 7 * HOUR_MS, 5000);
        assert_eq!(q.basis, CancellationBasis::Early);
        assert_eq!(q.refund_cents, 5000);
        assert_eq!(q.fee_cents, 0);
    }

    #[test]
    fn exactly_at_cutoff_is_still_free() {
        let q = cancellation_quote(OrderStatus::Scheduled, PICKUP, PICKUP - 6 * HOUR_MS, 5000);
        assert_eq!(q.basis, CancellationBasis::Early);
    }

    #[test]
    fn inside_cutoff_charges_the_flat_fee() {
        let q = cancellation_quote(OrderStatus::Scheduled, PICKUP, PICKUP - 2 * HOUR_MS, 5000);
        assert_eq!(q.basis, CancellationBasis::Late);
        assert_eq!(q.refund_cents, 4000);
        assert_eq!(q.fee_cents, 1000);
    }

    #[test]
    fn late_fee_never_turns_negative() {
        let q = cancellation_quote(OrderStatus::Scheduled, PICKUP, PICKUP - HOUR_MS, 800);
        assert_eq!(q.refund_cents, 0);
    }

    #[test]
    fn past_pickup_without_collection_is_half() {
        let q = cancellation_quote(OrderStatus::Scheduled, PICKUP, PICKUP + HOUR_MS, 5000);
        assert_eq!(q.basis, CancellationBasis::MissedPickup);
        assert_eq!(q.refund_cents, 2500);
    }

    #[test]
    fn in_progress_is_half_regardless_of_timing() {
        for status in [
            OrderStatus::PickedUp,
            OrderStatus::Processing,
            OrderStatus::ReadyForDelivery,
            OrderStatus::EnRouteDelivery,
        ] {
            let q = cancellation_quote(status, PICKUP, PICKUP - 48 * HOUR_MS, 7000);
            assert_eq!(q.basis, CancellationBasis::InProgress, "{}", status);
            assert_eq!(q.refund_cents, 3500);
        }
    }

    #[test]
    fn en_route_pickup_follows_timing_rules() {
        // Driver dispatched but nothing collected yet
        let q = cancellation_quote(
            OrderStatus::EnRoutePickup,
            PICKUP,
            PICKUP - 3 * HOUR_MS,
            5000,
        );
        assert_eq!(q.basis, CancellationBasis::Late);
    }
}

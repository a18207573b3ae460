//! Order status state machine
//!
//! The complete transition table for the order lifecycle. Every edge
//! carries its trigger, whether it needs a measured weight, and which
//! notification channels fire on it. Any pair not listed here is an
//! invalid transition.
//!
//! Validation is an O(1) adjacency lookup; the table itself stays the
//! single source of truth.

use std::collections::HashMap;
use std::sync::LazyLock;

use shared::models::{NotificationChannel, OrderStatus};

/// What caused a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    PaymentConfirmed,
    DriverDispatched,
    ItemsCollected,
    ArrivedAtFacility,
    CleaningCompleted,
    OutForDelivery,
    ItemsDelivered,
    PaymentFinalized,
    CustomerCancellation,
    PickupMissed,
    DamageReported,
}

/// One edge of the transition table
#[derive(Debug)]
pub struct Edge {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub trigger: Trigger,
    /// The transition must carry a measured weight
    pub requires_weight: bool,
    /// Customer notifications fired on this edge (best-effort)
    pub notify: &'static [NotificationChannel],
}

use NotificationChannel::{Email, Sms};
use OrderStatus::*;

/// The complete edge set. `CanceledByOps` has no edge and is
/// reachable only through the logged admin bypass.
pub static TRANSITIONS: &[Edge] = &[
    Edge { from: Draft, to: Scheduled, trigger: Trigger::PaymentConfirmed, requires_weight: false, notify: &[Email, Sms] },
    Edge { from: Scheduled, to: EnRoutePickup, trigger: Trigger::DriverDispatched, requires_weight: false, notify: &[Sms] },
    Edge { from: EnRoutePickup, to: PickedUp, trigger: Trigger::ItemsCollected, requires_weight: true, notify: &[] },
    Edge { from: PickedUp, to: Processing, trigger: Trigger::ArrivedAtFacility, requires_weight: false, notify: &[] },
    Edge { from: Processing, to: ReadyForDelivery, trigger: Trigger::CleaningCompleted, requires_weight: false, notify: &[] },
    Edge { from: ReadyForDelivery, to: EnRouteDelivery, trigger: Trigger::OutForDelivery, requires_weight: false, notify: &[Sms] },
    Edge { from: EnRouteDelivery, to: Delivered, trigger: Trigger::ItemsDelivered, requires_weight: false, notify: &[Email] },
    Edge { from: Delivered, to: Completed, trigger: Trigger::PaymentFinalized, requires_weight: false, notify: &[] },
    Edge { from: Scheduled, to: CanceledByCustomer, trigger: Trigger::CustomerCancellation, requires_weight: false, notify: &[] },
    Edge { from: Scheduled, to: NoShow, trigger: Trigger::PickupMissed, requires_weight: false, notify: &[] },
    Edge { from: Processing, to: IssueFlagged, trigger: Trigger::DamageReported, requires_weight: false, notify: &[] },
];

/// from-state → outgoing edges
static ADJACENCY: LazyLock<HashMap<OrderStatus, Vec<&'static Edge>>> = LazyLock::new(|| {
    let mut map: HashMap<OrderStatus, Vec<&'static Edge>> = HashMap::new();
    for edge in TRANSITIONS {
        map.entry(edge.from).or_default().push(edge);
    }
    map
});

/// True iff `(from, to)` is an edge of the table
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    edge(from, to).is_some()
}

/// The edge for `(from, to)`, if any
pub fn edge(from: OrderStatus, to: OrderStatus) -> Option<&'static Edge> {
    ADJACENCY
        .get(&from)
        .and_then(|edges| edges.iter().find(|e| e.to == to).copied())
}

/// All outgoing edges from `from`; used to report allowed next
/// states on rejection
pub fn valid_transitions(from: OrderStatus) -> &'static [&'static Edge] {
    ADJACENCY.get(&from).map(Vec::as_slice).unwrap_or(&[])
}

/// Allowed next states from `from`, as wire strings
pub fn valid_targets(from: OrderStatus) -> Vec<String> {
    valid_transitions(from)
        .iter()
        .map(|e| e.to.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_fully_connected() {
        let path = [
            Draft,
            Scheduled,
            EnRoutePickup,
            PickedUp,
            Processing,
            ReadyForDelivery,
            EnRouteDelivery,
            Delivered,
            Completed,
        ];
        for pair in path.windows(2) {
            assert!(
                can_transition(pair[0], pair[1]),
                "{} → {} should be valid",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn adjacency_matches_table_exactly() {
        // can_transition(s, t) iff (s, t) is in TRANSITIONS
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let in_table = TRANSITIONS.iter().any(|e| e.from == from && e.to == to);
                assert_eq!(
                    can_transition(from, to),
                    in_table,
                    "{} → {} disagrees with table",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn valid_transitions_only_contains_table_edges() {
        for from in OrderStatus::ALL {
            for edge in valid_transitions(from) {
                assert_eq!(edge.from, from);
                assert!(TRANSITIONS.iter().any(|e| std::ptr::eq(*edge, e)));
            }
        }
    }

    #[test]
    fn skipping_a_stage_is_invalid() {
        assert!(!can_transition(Processing, Delivered));
        assert!(!can_transition(Scheduled, PickedUp));
        assert!(!can_transition(Draft, Completed));
    }

    #[test]
    fn no_edges_leave_terminal_states() {
        for status in [Completed, CanceledByCustomer, CanceledByOps, NoShow] {
            assert!(valid_transitions(status).is_empty(), "{} has edges", status);
        }
    }

    #[test]
    fn canceled_by_ops_is_not_reachable_via_table() {
        assert!(!TRANSITIONS.iter().any(|e| e.to == CanceledByOps));
    }

    #[test]
    fn pickup_requires_weight() {
        let e = edge(EnRoutePickup, PickedUp).unwrap();
        assert!(e.requires_weight);
        assert_eq!(e.trigger, Trigger::ItemsCollected);
        // The only edge that does
        assert_eq!(TRANSITIONS.iter().filter(|e| e.requires_weight).count(), 1);
    }

    #[test]
    fn notification_hooks_match_design() {
        assert_eq!(edge(Draft, Scheduled).unwrap().notify, &[Email, Sms]);
        assert_eq!(edge(Scheduled, EnRoutePickup).unwrap().notify, &[Sms]);
        assert_eq!(edge(ReadyForDelivery, EnRouteDelivery).unwrap().notify, &[Sms]);
        assert_eq!(edge(EnRouteDelivery, Delivered).unwrap().notify, &[Email]);
        assert!(edge(PickedUp, Processing).unwrap().notify.is_empty());
    }

    #[test]
    fn rejection_reports_valid_targets() {
        let targets = valid_targets(Processing);
        assert_eq!(targets, vec!["ready_for_delivery", "issue_flagged"]);
    }
}

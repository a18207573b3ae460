//! Pricing engine
//!
//! Pure, stateless price computation for per-pound and bag orders.
//! All money is integer cents; the weight × rate product goes through
//! `Decimal` and is rounded half-up to whole cents. No `f64`
//! arithmetic ever touches an amount.
//!
//! Authorization rules (bag pricing is members-only) are enforced by
//! the lifecycle service, not here.

use rust_decimal::prelude::*;
use shared::models::BagSize;

/// Non-member rate
pub const STANDARD_RATE_CENTS_PER_LB: i64 = 225;
/// Member rate
pub const MEMBER_RATE_CENTS_PER_LB: i64 = 175;
/// Floor for per-pound orders
pub const MINIMUM_ORDER_CENTS: i64 = 3500;
/// Fee per started overweight increment
pub const OVERWEIGHT_FEE_CENTS: i64 = 500;
/// Overweight billing increment
pub const OVERWEIGHT_INCREMENT_LB: i64 = 5;

/// Maximum weight accepted from any caller; anything above is a
/// data-entry error
pub const MAX_WEIGHT_LB: f64 = 500.0;

/// Flat price per bag size
pub fn bag_price_cents(bag: BagSize) -> i64 {
    match bag {
        BagSize::Small => 3500,
        BagSize::Medium => 5500,
        BagSize::Large => 8500,
    }
}

/// Included weight per bag size
pub fn bag_weight_limit_lb(bag: BagSize) -> i64 {
    match bag {
        BagSize::Small => 20,
        BagSize::Medium => 35,
        BagSize::Large => 50,
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PricingError {
    #[error("weight must be a positive number of pounds, got {0}")]
    InvalidWeight(f64),

    #[error("weight exceeds maximum allowed ({MAX_WEIGHT_LB} lb), got {0}")]
    WeightTooLarge(f64),
}

impl From<PricingError> for shared::AppError {
    fn from(e: PricingError) -> Self {
        shared::AppError::Validation(e.to_string())
    }
}

/// Per-pound price breakdown
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PerPoundQuote {
    pub rate_cents_per_lb: i64,
    pub subtotal_cents: i64,
    pub total_cents: i64,
    /// True when the minimum-order floor raised the total
    pub minimum_applied: bool,
    /// What the member rate saved vs the standard rate (0 for
    /// non-members)
    pub savings_cents: i64,
}

/// Overweight check result for a bag order
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct OverweightQuote {
    pub overweight: bool,
    pub overage_lb: f64,
    pub fee_cents: i64,
}

impl OverweightQuote {
    fn within_limit() -> Self {
        Self {
            overweight: false,
            overage_lb: 0.0,
            fee_cents: 0,
        }
    }
}

/// Bag price breakdown (base + overweight fee)
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BagQuote {
    pub base_cents: i64,
    pub overweight: OverweightQuote,
    pub total_cents: i64,
}

/// Validate a weight and convert it for exact arithmetic
fn require_weight(weight_lb: f64) -> Result<Decimal, PricingError> {
    if !weight_lb.is_finite() || weight_lb <= 0.0 {
        return Err(PricingError::InvalidWeight(weight_lb));
    }
    if weight_lb > MAX_WEIGHT_LB {
        return Err(PricingError::WeightTooLarge(weight_lb));
    }
    Decimal::from_f64(weight_lb).ok_or(PricingError::InvalidWeight(weight_lb))
}

/// Validate a weight without pricing anything
pub fn validate_weight(weight_lb: f64) -> Result<(), PricingError> {
    require_weight(weight_lb).map(|_| ())
}

/// Round to whole cents, half away from zero
fn to_cents(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or_default()
}

/// Price a per-pound order
///
/// `subtotal = round(weight × rate)`, `total = max(subtotal, minimum)`.
pub fn per_pound_quote(weight_lb: f64, is_member: bool) -> Result<PerPoundQuote, PricingError> {
    let weight = require_weight(weight_lb)?;

    let rate = if is_member {
        MEMBER_RATE_CENTS_PER_LB
    } else {
        STANDARD_RATE_CENTS_PER_LB
    };

    let subtotal_cents = to_cents(weight * Decimal::from(rate));
    let total_cents = subtotal_cents.max(MINIMUM_ORDER_CENTS);

    let savings_cents = if is_member {
        to_cents(weight * Decimal::from(STANDARD_RATE_CENTS_PER_LB - MEMBER_RATE_CENTS_PER_LB))
    } else {
        0
    };

    Ok(PerPoundQuote {
        rate_cents_per_lb: rate,
        subtotal_cents,
        total_cents,
        minimum_applied: total_cents > subtotal_cents,
        savings_cents,
    })
}

/// Overweight fee for a bag measured at `actual_weight_lb`
///
/// No fee at or under the bag's limit; past it, 500¢ per started
/// 5 lb increment of overage.
pub fn overweight_fee(bag: BagSize, actual_weight_lb: f64) -> Result<OverweightQuote, PricingError> {
    let weight = require_weight(actual_weight_lb)?;
    let limit = Decimal::from(bag_weight_limit_lb(bag));

    if weight <= limit {
        return Ok(OverweightQuote::within_limit());
    }

    let overage = weight - limit;
    let increments = (overage / Decimal::from(OVERWEIGHT_INCREMENT_LB)).ceil();
    let fee_cents = to_cents(increments * Decimal::from(OVERWEIGHT_FEE_CENTS));

    Ok(OverweightQuote {
        overweight: true,
        overage_lb: overage.to_f64().unwrap_or_default(),
        fee_cents,
    })
}

/// Full bag price: base + overweight fee once a weight is known
pub fn bag_total(bag: BagSize, actual_weight_lb: Option<f64>) -> Result<BagQuote, PricingError> {
    let base_cents = bag_price_cents(bag);
    let overweight = match actual_weight_lb {
        Some(w) => overweight_fee(bag, w)?,
        None => OverweightQuote::within_limit(),
    };
    let total_cents = base_cents + overweight.fee_cents;
    Ok(BagQuote {
        base_cents,
        overweight,
        total_cents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== per_pound_quote ==========

    #[test]
    fn non_member_15lb_hits_minimum_floor() {
        // 15 × 225 = 3375 < 3500 → floor applies
        let q = per_pound_quote(15.0, false).unwrap();
        assert_eq!(q.rate_cents_per_lb, 225);
        assert_eq!(q.subtotal_cents, 3375);
        assert_eq!(q.total_cents, 3500);
        assert!(q.minimum_applied);
        assert_eq!(q.savings_cents, 0);
    }

    #[test]
    fn member_30lb_above_minimum() {
        let q = per_pound_quote(30.0, true).unwrap();
        assert_eq!(q.rate_cents_per_lb, 175);
        assert_eq!(q.subtotal_cents, 5250);
        assert_eq!(q.total_cents, 5250);
        assert!(!q.minimum_applied);
        assert_eq!(q.savings_cents, 1500); // 30 × (225 − 175)
    }

    #[test]
    fn fractional_weight_rounds_half_up() {
        // 10.5 × 225 = 2362.5 → 2363
        let q = per_pound_quote(10.5, false).unwrap();
        assert_eq!(q.subtotal_cents, 2363);
        assert_eq!(q.total_cents, 3500);
    }

    #[test]
    fn minimum_floor_holds_below_threshold() {
        for w in [0.5, 1.0, 5.0, 10.0, 15.0] {
            let q = per_pound_quote(w, false).unwrap();
            assert_eq!(q.total_cents, 3500, "weight {}", w);
            assert!(q.minimum_applied, "weight {}", w);
        }
    }

    #[test]
    fn member_total_strictly_below_standard() {
        for w in [1.0, 15.0, 15.6, 20.0, 30.0, 44.4, 100.0] {
            let member = per_pound_quote(w, true).unwrap();
            let standard = per_pound_quote(w, false).unwrap();
            assert!(
                member.total_cents <= standard.total_cents,
                "weight {}: member {} > standard {}",
                w,
                member.total_cents,
                standard.total_cents
            );
        }
        // Above both floors the member total is strictly lower
        let member = per_pound_quote(30.0, true).unwrap();
        let standard = per_pound_quote(30.0, false).unwrap();
        assert!(member.total_cents < standard.total_cents);
    }

    #[test]
    fn total_is_monotone_in_weight() {
        for is_member in [false, true] {
            let weights = [0.5, 1.0, 5.0, 15.0, 15.5, 16.0, 20.0, 35.0, 100.0, 400.0];
            let mut prev = 0;
            for w in weights {
                let total = per_pound_quote(w, is_member).unwrap().total_cents;
                assert!(total >= prev, "weight {} (member={})", w, is_member);
                prev = total;
            }
        }
    }

    #[test]
    fn rejects_invalid_weights() {
        for w in [0.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(
                matches!(per_pound_quote(w, false), Err(PricingError::InvalidWeight(_))),
                "weight {} should be rejected",
                w
            );
        }
        assert!(matches!(
            per_pound_quote(MAX_WEIGHT_LB + 1.0, false),
            Err(PricingError::WeightTooLarge(_))
        ));
    }

    // ========== overweight_fee ==========

    #[test]
    fn at_limit_is_not_overweight() {
        let q = overweight_fee(BagSize::Small, 20.0).unwrap();
        assert!(!q.overweight);
        assert_eq!(q.overage_lb, 0.0);
        assert_eq!(q.fee_cents, 0);
    }

    #[test]
    fn one_pound_over_bills_one_increment() {
        let q = overweight_fee(BagSize::Small, 21.0).unwrap();
        assert!(q.overweight);
        assert_eq!(q.overage_lb, 1.0);
        assert_eq!(q.fee_cents, 500);
    }

    #[test]
    fn exactly_one_full_increment() {
        // overage 5 → ceil(5/5) = 1 increment
        let q = overweight_fee(BagSize::Small, 25.0).unwrap();
        assert_eq!(q.overage_lb, 5.0);
        assert_eq!(q.fee_cents, 500);
    }

    #[test]
    fn six_pounds_over_bills_two_increments() {
        // overage 6 → ceil(6/5) = 2 increments
        let q = overweight_fee(BagSize::Small, 26.0).unwrap();
        assert_eq!(q.overage_lb, 6.0);
        assert_eq!(q.fee_cents, 1000);
    }

    #[test]
    fn fractional_overage_still_starts_an_increment() {
        let q = overweight_fee(BagSize::Medium, 35.2).unwrap();
        assert!(q.overweight);
        assert_eq!(q.fee_cents, 500);
    }

    #[test]
    fn limits_per_bag_size() {
        assert!(!overweight_fee(BagSize::Medium, 35.0).unwrap().overweight);
        assert!(overweight_fee(BagSize::Medium, 36.0).unwrap().overweight);
        assert!(!overweight_fee(BagSize::Large, 50.0).unwrap().overweight);
        assert!(overweight_fee(BagSize::Large, 51.0).unwrap().overweight);
    }

    #[test]
    fn overweight_rejects_invalid_weights() {
        assert!(overweight_fee(BagSize::Small, f64::NAN).is_err());
        assert!(overweight_fee(BagSize::Small, -3.0).is_err());
    }

    // ========== bag_total ==========

    #[test]
    fn bag_total_without_weight_is_base_price() {
        let q = bag_total(BagSize::Medium, None).unwrap();
        assert_eq!(q.base_cents, 5500);
        assert!(!q.overweight.overweight);
        assert_eq!(q.total_cents, 5500);
    }

    #[test]
    fn small_bag_at_27lb_adds_two_increments() {
        // overage 7 → ceil(7/5) = 2 → 1000¢ fee
        let q = bag_total(BagSize::Small, Some(27.0)).unwrap();
        assert_eq!(q.base_cents, 3500);
        assert_eq!(q.overweight.overage_lb, 7.0);
        assert_eq!(q.overweight.fee_cents, 1000);
        assert_eq!(q.total_cents, 4500);
    }

    #[test]
    fn bag_prices() {
        assert_eq!(bag_price_cents(BagSize::Small), 3500);
        assert_eq!(bag_price_cents(BagSize::Medium), 5500);
        assert_eq!(bag_price_cents(BagSize::Large), 8500);
    }
}

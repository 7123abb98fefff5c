use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::valuation::SettlementEstimate;

const EQUAL_THIRD: Decimal = Decimal::from_parts(33, 0, 0, false, 0);

/// Sorted settlement range plus bar-segment widths as percentages of `high`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRangeDisplay {
    pub low: Decimal,
    pub mid: Decimal,
    pub high: Decimal,
    pub low_pct: Decimal,
    pub likely_pct: Decimal,
    pub high_pct: Decimal,
}

pub fn synthesize_range(estimate: SettlementEstimate) -> SettlementRangeDisplay {
    let SettlementEstimate { low, likely, high } = estimate;
    let sorted_low = low.min(likely).min(high);
    let sorted_high = low.max(likely).max(high);
    // median of three; the sorted triple keeps the original sum
    let sorted_mid = low.min(likely).max(low.max(likely).min(high));

    if sorted_high <= Decimal::ZERO {
        return SettlementRangeDisplay {
            low: sorted_low,
            mid: sorted_mid,
            high: sorted_high,
            low_pct: EQUAL_THIRD,
            likely_pct: EQUAL_THIRD,
            high_pct: EQUAL_THIRD,
        };
    }

    SettlementRangeDisplay {
        low: sorted_low,
        mid: sorted_mid,
        high: sorted_high,
        low_pct: percent_of(sorted_low, sorted_high),
        likely_pct: percent_of(sorted_mid.saturating_sub(sorted_low), sorted_high),
        high_pct: percent_of(sorted_high.saturating_sub(sorted_mid), sorted_high),
    }
}

/// Marker position for the policy limit on the same bar, in `0..=100`.
pub fn policy_limit_position(policy_limit: Option<Decimal>, high: Decimal) -> Decimal {
    match policy_limit {
        Some(limit) if limit > Decimal::ZERO && high > Decimal::ZERO => percent_of(limit, high),
        _ => Decimal::ZERO,
    }
}

/// `part` as a percentage of a positive `whole`, clamped to `0..=100`.
/// A quotient too large to represent saturates at the matching bound.
fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    match part.checked_div(whole).and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED)) {
        Some(percent) => percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED),
        None if part.is_sign_negative() => Decimal::ZERO,
        None => Decimal::ONE_HUNDRED,
    }
}

use rust_decimal::Decimal;
use serde::Serialize;

use caseworth_core::domain::valuation::SettlementEstimate;
use caseworth_core::valuation::{policy_limit_position, synthesize_range, SettlementRangeDisplay};

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct RangeReport {
    range: SettlementRangeDisplay,
    policy_limit_position: Decimal,
}

pub fn run(
    low: Decimal,
    likely: Decimal,
    high: Decimal,
    policy_limit: Option<Decimal>,
) -> CommandResult {
    let range = synthesize_range(SettlementEstimate { low, likely, high });
    let report = RangeReport {
        range,
        policy_limit_position: policy_limit_position(policy_limit, range.high),
    };

    CommandResult::success_with_data(
        "range",
        format!("settlement range {} / {} / {}", range.low, range.mid, range.high),
        &report,
    )
}

//! Boundary normalization for untrusted valuation inputs.
//!
//! Malformed numbers (non-numeric text, NaN, infinities, `null`, missing keys)
//! become zero here so the calculator stays total. The one exception is the
//! policy limit: an absent or blank limit means "no limit" and stays `None`,
//! while any present value, including `0`, becomes a cap. Every figure is
//! also held at or below [`MAX_AMOUNT`].

use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::valuation::{CaseValuationInput, LiabilityAssessment};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Largest figure accepted from untrusted input: one quadrillion.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Valuation input exactly as it arrives from a form, file, or request body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawValuationInput {
    #[serde(default, alias = "injuryType")]
    pub injury_type: Option<String>,
    #[serde(default, alias = "injuryDescription")]
    pub injury_description: Option<String>,
    #[serde(default, alias = "medicalExpenses")]
    pub medical_expenses: Option<Value>,
    #[serde(default, alias = "lostWages")]
    pub lost_wages: Option<Value>,
    #[serde(default, alias = "futureMedical")]
    pub future_medical: Option<Value>,
    #[serde(default, alias = "customMultiplier")]
    pub custom_multiplier: Option<Value>,
    #[serde(default, alias = "liabilityAssessment")]
    pub liability_assessment: Option<String>,
    #[serde(default, alias = "comparativeNegligence", alias = "comparativeNegligencePercent")]
    pub comparative_negligence_pct: Option<Value>,
    #[serde(default, alias = "policyLimit")]
    pub policy_limit: Option<Value>,
}

impl RawValuationInput {
    pub fn normalize(&self) -> CaseValuationInput {
        CaseValuationInput {
            injury_type: self.injury_type.as_deref().unwrap_or_default().trim().to_string(),
            injury_description: self
                .injury_description
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            medical_expenses: coerce_amount(self.medical_expenses.as_ref()),
            lost_wages: coerce_amount(self.lost_wages.as_ref()),
            future_medical: coerce_amount(self.future_medical.as_ref()),
            custom_multiplier: coerce_optional(self.custom_multiplier.as_ref()),
            liability_assessment: self
                .liability_assessment
                .as_deref()
                .and_then(|value| value.parse().ok())
                .unwrap_or(LiabilityAssessment::Clear),
            comparative_negligence_pct: coerce_percent(self.comparative_negligence_pct.as_ref()),
            policy_limit: coerce_optional(self.policy_limit.as_ref())
                .map(|limit| limit.max(Decimal::ZERO)),
        }
    }
}

/// Non-negative amount; anything unreadable or negative is zero.
pub fn coerce_amount(value: Option<&Value>) -> Decimal {
    parse_value(value).unwrap_or(Decimal::ZERO).clamp(Decimal::ZERO, MAX_AMOUNT)
}

/// Percentage clamped into `0..=100`.
pub fn coerce_percent(value: Option<&Value>) -> Decimal {
    parse_value(value).unwrap_or(Decimal::ZERO).clamp(Decimal::ZERO, HUNDRED)
}

/// `None` for absent, `null`, or blank input; otherwise the parsed number,
/// with malformed text coerced to zero and oversized values capped.
pub fn coerce_optional(value: Option<&Value>) -> Option<Decimal> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.trim().is_empty() => None,
        Some(other) => Some(parse_value(Some(other)).unwrap_or(Decimal::ZERO).min(MAX_AMOUNT)),
    }
}

pub fn coerce_f64(value: f64) -> Decimal {
    if value.is_finite() {
        Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    }
}

fn parse_value(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                return Some(Decimal::from(integer));
            }
            Decimal::from_str(&number.to_string())
                .ok()
                .or_else(|| number.as_f64().map(coerce_f64))
        }
        Value::String(text) => parse_text(text),
        _ => None,
    }
}

fn parse_text(text: &str) -> Option<Decimal> {
    let cleaned: String =
        text.trim().chars().filter(|ch| !matches!(ch, '$' | ',' | '_' | ' ')).collect();
    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned)
        .ok()
        .or_else(|| Decimal::from_scientific(&cleaned).ok())
        .or_else(|| cleaned.parse::<f64>().ok().filter(|value| value.is_finite()).map(coerce_f64))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{
        coerce_amount, coerce_f64, coerce_optional, coerce_percent, RawValuationInput, MAX_AMOUNT,
    };
    use crate::domain::valuation::LiabilityAssessment;

    #[test]
    fn malformed_amounts_coerce_to_zero() {
        assert_eq!(coerce_amount(None), Decimal::ZERO);
        assert_eq!(coerce_amount(Some(&json!(null))), Decimal::ZERO);
        assert_eq!(coerce_amount(Some(&json!("not a number"))), Decimal::ZERO);
        assert_eq!(coerce_amount(Some(&json!("NaN"))), Decimal::ZERO);
        assert_eq!(coerce_amount(Some(&json!(true))), Decimal::ZERO);
        assert_eq!(coerce_amount(Some(&json!(-250))), Decimal::ZERO);
        assert_eq!(coerce_f64(f64::NAN), Decimal::ZERO);
        assert_eq!(coerce_f64(f64::INFINITY), Decimal::ZERO);
    }

    #[test]
    fn formatted_amounts_are_accepted() {
        assert_eq!(coerce_amount(Some(&json!("$12,500.50"))), Decimal::new(12_500_50, 2));
        assert_eq!(coerce_amount(Some(&json!(10000))), Decimal::new(10_000, 0));
        assert_eq!(coerce_amount(Some(&json!(2.5))), Decimal::new(25, 1));
    }

    #[test]
    fn oversized_figures_are_capped() {
        assert_eq!(MAX_AMOUNT, Decimal::new(1_000_000_000_000_000, 0));
        assert_eq!(coerce_amount(Some(&json!("20000000000000000000000000000"))), MAX_AMOUNT);
        assert_eq!(coerce_optional(Some(&json!("9e27"))), Some(MAX_AMOUNT));
        assert_eq!(coerce_optional(Some(&json!(-5))), Some(Decimal::new(-5, 0)));
    }

    #[test]
    fn percent_is_clamped_to_range() {
        assert_eq!(coerce_percent(Some(&json!(150))), Decimal::ONE_HUNDRED);
        assert_eq!(coerce_percent(Some(&json!(-10))), Decimal::ZERO);
        assert_eq!(coerce_percent(Some(&json!("20"))), Decimal::new(20, 0));
    }

    #[test]
    fn policy_limit_keeps_zero_distinct_from_absent() {
        assert_eq!(coerce_optional(None), None);
        assert_eq!(coerce_optional(Some(&json!(null))), None);
        assert_eq!(coerce_optional(Some(&json!("  "))), None);
        assert_eq!(coerce_optional(Some(&json!(0))), Some(Decimal::ZERO));
        assert_eq!(coerce_optional(Some(&json!("0"))), Some(Decimal::ZERO));
    }

    #[test]
    fn raw_input_accepts_camel_case_payloads() {
        let raw: RawValuationInput = serde_json::from_value(json!({
            "injuryType": "fracture",
            "medicalExpenses": "10000",
            "lostWages": 5000,
            "futureMedical": null,
            "liabilityAssessment": "comparative",
            "comparativeNegligence": 20,
            "policyLimit": 0
        }))
        .expect("raw input should deserialize");

        let input = raw.normalize();
        assert_eq!(input.injury_type, "fracture");
        assert_eq!(input.medical_expenses, Decimal::new(10_000, 0));
        assert_eq!(input.lost_wages, Decimal::new(5_000, 0));
        assert_eq!(input.future_medical, Decimal::ZERO);
        assert_eq!(input.liability_assessment, LiabilityAssessment::Comparative);
        assert_eq!(input.comparative_negligence_pct, Decimal::new(20, 0));
        assert_eq!(input.policy_limit, Some(Decimal::ZERO));
        assert_eq!(input.custom_multiplier, None);
    }
}

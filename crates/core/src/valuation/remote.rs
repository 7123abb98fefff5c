//! Wire contract for the remote AI valuation service.
//!
//! The service sees the same inputs as the local formula. A successful,
//! well-formed response replaces the local figures; everything else is a
//! [`RemoteServiceError`] and the caller keeps the local result.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::valuation::{
    CaseValuation, CaseValuationInput, LiabilityAssessment, RemoteInsights, SettlementEstimate,
    ValuationSource,
};
use crate::errors::RemoteServiceError;

const MAX_CASE_STRENGTH: Decimal = Decimal::TEN;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteValuationRequest {
    pub injury_type: String,
    pub injury_description: Option<String>,
    pub liability_assessment: LiabilityAssessment,
    #[serde(with = "rust_decimal::serde::float")]
    pub comparative_negligence: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub medical_expenses: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub lost_wages: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub future_medical: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub policy_limit: Option<Decimal>,
}

impl RemoteValuationRequest {
    pub fn from_input(input: &CaseValuationInput) -> Self {
        Self {
            injury_type: input.injury_type.clone(),
            injury_description: input.injury_description.clone(),
            liability_assessment: input.liability_assessment,
            comparative_negligence: input.comparative_negligence_pct,
            medical_expenses: input.medical_expenses,
            lost_wages: input.lost_wages,
            future_medical: input.future_medical,
            policy_limit: input.policy_limit,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteValuationResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub calculation: Option<RemoteCalculation>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteCalculation {
    pub economic_damages: Option<Decimal>,
    pub non_economic_damages: Option<Decimal>,
    pub total_case_value: Option<Decimal>,
    pub recommended_multiplier: Option<Decimal>,
    pub realistic_recovery: Option<Decimal>,
    pub settlement_range_low: Option<Decimal>,
    pub settlement_range_high: Option<Decimal>,
    pub case_strength: Option<Decimal>,
    pub key_factors: Vec<String>,
    pub multiplier_reasoning: Option<String>,
    pub recommendations: Option<Value>,
    pub medical_to_limit_ratio: Option<Decimal>,
    pub is_underinsured: Option<bool>,
}

#[async_trait]
pub trait RemoteValuationService: Send + Sync {
    async fn evaluate(
        &self,
        request: &RemoteValuationRequest,
    ) -> Result<RemoteValuationResponse, RemoteServiceError>;
}

impl RemoteValuationResponse {
    /// Unwraps a successful response into a valuation for `input`.
    pub fn into_valuation(
        self,
        input: &CaseValuationInput,
    ) -> Result<CaseValuation, RemoteServiceError> {
        if !self.success {
            return Err(RemoteServiceError::Rejected(
                self.error.unwrap_or_else(|| "service reported success=false".to_string()),
            ));
        }

        self.calculation
            .ok_or_else(|| {
                RemoteServiceError::InvalidPayload("successful response without calculation".into())
            })?
            .into_valuation(input)
    }
}

impl RemoteCalculation {
    pub fn into_valuation(
        self,
        input: &CaseValuationInput,
    ) -> Result<CaseValuation, RemoteServiceError> {
        let total_case_value = require("totalCaseValue", self.total_case_value)?;
        let realistic_recovery = require("realisticRecovery", self.realistic_recovery)?;
        let economic_damages = match self.economic_damages {
            Some(amount) => amount,
            None => input
                .medical_expenses
                .checked_add(input.lost_wages)
                .and_then(|sum| sum.checked_add(input.future_medical))
                .ok_or_else(|| overflow("economicDamages"))?,
        };
        let non_economic_damages = match self.non_economic_damages {
            Some(amount) => amount,
            None => total_case_value
                .checked_sub(economic_damages)
                .ok_or_else(|| overflow("nonEconomicDamages"))?,
        };

        for (field, value) in [
            ("economicDamages", Some(economic_damages)),
            ("nonEconomicDamages", Some(non_economic_damages)),
            ("totalCaseValue", Some(total_case_value)),
            ("realisticRecovery", Some(realistic_recovery)),
            ("recommendedMultiplier", self.recommended_multiplier),
            ("settlementRangeLow", self.settlement_range_low),
            ("settlementRangeHigh", self.settlement_range_high),
        ] {
            if value.is_some_and(|amount| amount < Decimal::ZERO) {
                return Err(RemoteServiceError::Rejected(format!("{field} must be >= 0")));
            }
        }

        if let Some(strength) = self.case_strength {
            if strength < Decimal::ZERO || strength > MAX_CASE_STRENGTH {
                return Err(RemoteServiceError::Rejected(format!(
                    "caseStrength {strength} outside 0..=10"
                )));
            }
        }

        if realistic_recovery > total_case_value {
            return Err(RemoteServiceError::Rejected(
                "realisticRecovery exceeds totalCaseValue".to_string(),
            ));
        }

        if let Some(limit) = input.policy_limit {
            if realistic_recovery > limit {
                return Err(RemoteServiceError::Rejected(format!(
                    "realisticRecovery exceeds policy limit {limit}"
                )));
            }
        }

        let multiplier = match self.recommended_multiplier {
            Some(multiplier) if multiplier > Decimal::ZERO => multiplier,
            _ if economic_damages > Decimal::ZERO => non_economic_damages
                .checked_div(economic_damages)
                .ok_or_else(|| overflow("implied multiplier"))?,
            _ => crate::valuation::calculator::select_multiplier(input),
        };

        let negligence =
            input.comparative_negligence_pct.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
        let adjusted_case_value = total_case_value
            .checked_mul(Decimal::ONE - negligence / Decimal::ONE_HUNDRED)
            .ok_or_else(|| overflow("adjusted case value"))?;

        let settlement_range = match (self.settlement_range_low, self.settlement_range_high) {
            (Some(low), Some(high)) => {
                Some(SettlementEstimate { low, likely: realistic_recovery, high })
            }
            _ => None,
        };

        Ok(CaseValuation {
            case_id: None,
            source: ValuationSource::Remote,
            multiplier,
            economic_damages,
            non_economic_damages,
            total_case_value,
            adjusted_case_value,
            realistic_recovery,
            settlement_range,
            insights: Some(RemoteInsights {
                case_strength: self.case_strength,
                key_factors: self.key_factors,
                multiplier_reasoning: self.multiplier_reasoning,
                recommendations: self.recommendations.and_then(render_recommendations),
                medical_to_limit_ratio: self.medical_to_limit_ratio,
                is_underinsured: self.is_underinsured,
            }),
            computed_at: Utc::now(),
        })
    }
}

fn require(field: &str, value: Option<Decimal>) -> Result<Decimal, RemoteServiceError> {
    value.ok_or_else(|| RemoteServiceError::InvalidPayload(format!("missing {field}")))
}

fn overflow(field: &str) -> RemoteServiceError {
    RemoteServiceError::Rejected(format!("{field} overflows"))
}

fn render_recommendations(value: Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text),
        Value::Array(items) => {
            let lines: Vec<String> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect();
            (!lines.is_empty()).then(|| lines.join("\n"))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{RemoteValuationRequest, RemoteValuationResponse};
    use crate::domain::valuation::{CaseValuationInput, LiabilityAssessment, ValuationSource};
    use crate::errors::RemoteServiceError;

    fn dec(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    fn input(policy_limit: Option<Decimal>) -> CaseValuationInput {
        CaseValuationInput {
            injury_type: "fracture".to_string(),
            injury_description: Some("left wrist".to_string()),
            medical_expenses: dec(10_000),
            lost_wages: dec(5_000),
            future_medical: Decimal::ZERO,
            custom_multiplier: None,
            liability_assessment: LiabilityAssessment::Comparative,
            comparative_negligence_pct: dec(20),
            policy_limit,
        }
    }

    fn success_payload() -> serde_json::Value {
        json!({
            "success": true,
            "calculation": {
                "economicDamages": 15000,
                "nonEconomicDamages": 45000,
                "totalCaseValue": 60000,
                "recommendedMultiplier": 3,
                "realisticRecovery": 20000,
                "settlementRangeLow": 35000,
                "settlementRangeHigh": 55000,
                "caseStrength": 7,
                "keyFactors": ["clear imaging", "prior injury"],
                "multiplierReasoning": "documented fracture with surgery",
                "recommendations": ["request wage records", "obtain surgeon narrative"],
                "medicalToLimitRatio": 0.4,
                "isUnderinsured": false
            }
        })
    }

    #[test]
    fn request_serializes_numbers_and_null_limit() {
        let value = serde_json::to_value(RemoteValuationRequest::from_input(&input(None)))
            .expect("serialize request");

        assert_eq!(value["injuryType"], "fracture");
        assert_eq!(value["liabilityAssessment"], "COMPARATIVE");
        assert_eq!(value["medicalExpenses"], json!(10000.0));
        assert_eq!(value["comparativeNegligence"], json!(20.0));
        assert!(value["policyLimit"].is_null());
    }

    #[test]
    fn request_keeps_zero_policy_limit() {
        let value = serde_json::to_value(RemoteValuationRequest::from_input(&input(Some(
            Decimal::ZERO,
        ))))
        .expect("serialize request");
        assert_eq!(value["policyLimit"], json!(0.0));
    }

    #[test]
    fn successful_payload_replaces_figures_and_keeps_insights() {
        let response: RemoteValuationResponse =
            serde_json::from_value(success_payload()).expect("decode response");
        let valuation = response.into_valuation(&input(None)).expect("valid payload");

        assert_eq!(valuation.source, ValuationSource::Remote);
        assert_eq!(valuation.total_case_value, dec(60_000));
        assert_eq!(valuation.realistic_recovery, dec(20_000));
        assert_eq!(valuation.adjusted_case_value, dec(48_000));
        assert_eq!(valuation.multiplier, dec(3));

        let range = valuation.settlement_range.expect("range present");
        assert_eq!((range.low, range.likely, range.high), (dec(35_000), dec(20_000), dec(55_000)));

        let insights = valuation.insights.expect("insights present");
        assert_eq!(insights.case_strength, Some(dec(7)));
        assert_eq!(insights.key_factors, vec!["clear imaging", "prior injury"]);
        assert_eq!(
            insights.recommendations.as_deref(),
            Some("request wage records\nobtain surgeon narrative")
        );
        assert_eq!(insights.is_underinsured, Some(false));
    }

    #[test]
    fn success_false_is_rejected() {
        let response: RemoteValuationResponse =
            serde_json::from_value(json!({ "success": false, "error": "model overloaded" }))
                .expect("decode response");

        assert_eq!(
            response.into_valuation(&input(None)),
            Err(RemoteServiceError::Rejected("model overloaded".to_string()))
        );
    }

    #[test]
    fn missing_totals_are_invalid_payloads() {
        let response: RemoteValuationResponse = serde_json::from_value(json!({
            "success": true,
            "calculation": { "economicDamages": 1 }
        }))
        .expect("decode response");

        assert!(matches!(
            response.into_valuation(&input(None)),
            Err(RemoteServiceError::InvalidPayload(_))
        ));
    }

    #[test]
    fn recovery_above_policy_limit_is_rejected() {
        let response: RemoteValuationResponse =
            serde_json::from_value(success_payload()).expect("decode response");

        let result = response.into_valuation(&input(Some(Decimal::ZERO)));
        assert!(matches!(
            result,
            Err(RemoteServiceError::Rejected(ref reason)) if reason.contains("policy limit")
        ));
    }

    #[test]
    fn implied_multiplier_overflow_is_rejected() {
        let response: RemoteValuationResponse = serde_json::from_value(json!({
            "success": true,
            "calculation": {
                "economicDamages": 1e-19,
                "nonEconomicDamages": 1e20,
                "totalCaseValue": 1e20,
                "realisticRecovery": 1
            }
        }))
        .expect("decode response");

        assert_eq!(
            response.into_valuation(&CaseValuationInput::default()),
            Err(RemoteServiceError::Rejected("implied multiplier overflows".to_string()))
        );
    }

    #[test]
    fn derived_economic_total_overflow_is_rejected() {
        let response: RemoteValuationResponse = serde_json::from_value(json!({
            "success": true,
            "calculation": { "totalCaseValue": 10, "realisticRecovery": 1 }
        }))
        .expect("decode response");
        let input = CaseValuationInput {
            medical_expenses: Decimal::MAX,
            lost_wages: Decimal::MAX,
            ..CaseValuationInput::default()
        };

        assert_eq!(
            response.into_valuation(&input),
            Err(RemoteServiceError::Rejected("economicDamages overflows".to_string()))
        );
    }

    #[test]
    fn out_of_range_case_strength_is_rejected() {
        let mut payload = success_payload();
        payload["calculation"]["caseStrength"] = json!(11);
        let response: RemoteValuationResponse =
            serde_json::from_value(payload).expect("decode response");

        assert!(matches!(
            response.into_valuation(&input(None)),
            Err(RemoteServiceError::Rejected(_))
        ));
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::case::CaseId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiabilityAssessment {
    #[default]
    Clear,
    Comparative,
    Disputed,
}

impl LiabilityAssessment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "CLEAR",
            Self::Comparative => "COMPARATIVE",
            Self::Disputed => "DISPUTED",
        }
    }
}

impl std::str::FromStr for LiabilityAssessment {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CLEAR" => Ok(Self::Clear),
            "COMPARATIVE" => Ok(Self::Comparative),
            "DISPUTED" => Ok(Self::Disputed),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown liability assessment `{other}` (expected CLEAR|COMPARATIVE|DISPUTED)"
            ))),
        }
    }
}

/// Argument record for one valuation run.
///
/// Amounts are already normalized: non-negative, negligence within `0..=100`.
/// Use [`crate::valuation::coerce::RawValuationInput`] to build one from
/// untrusted values. `policy_limit: Some(0)` caps recovery at zero and is not
/// the same thing as `None` (no limit).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseValuationInput {
    pub injury_type: String,
    pub injury_description: Option<String>,
    pub medical_expenses: Decimal,
    pub lost_wages: Decimal,
    pub future_medical: Decimal,
    pub custom_multiplier: Option<Decimal>,
    pub liability_assessment: LiabilityAssessment,
    pub comparative_negligence_pct: Decimal,
    pub policy_limit: Option<Decimal>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationSource {
    Local,
    Remote,
}

/// Three-point settlement estimate as delivered; values may be out of order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementEstimate {
    pub low: Decimal,
    pub likely: Decimal,
    pub high: Decimal,
}

/// Qualitative output only the remote service produces.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteInsights {
    pub case_strength: Option<Decimal>,
    pub key_factors: Vec<String>,
    pub multiplier_reasoning: Option<String>,
    pub recommendations: Option<String>,
    pub medical_to_limit_ratio: Option<Decimal>,
    pub is_underinsured: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseValuation {
    pub case_id: Option<CaseId>,
    pub source: ValuationSource,
    pub multiplier: Decimal,
    pub economic_damages: Decimal,
    pub non_economic_damages: Decimal,
    pub total_case_value: Decimal,
    pub adjusted_case_value: Decimal,
    pub realistic_recovery: Decimal,
    pub settlement_range: Option<SettlementEstimate>,
    pub insights: Option<RemoteInsights>,
    pub computed_at: DateTime<Utc>,
}

impl CaseValuation {
    pub fn for_case(mut self, case_id: CaseId) -> Self {
        self.case_id = Some(case_id);
        self
    }

    /// Compares the financial figures only, ignoring timestamps and case binding.
    pub fn same_figures(&self, other: &Self) -> bool {
        self.source == other.source
            && self.multiplier == other.multiplier
            && self.economic_damages == other.economic_damages
            && self.non_economic_damages == other.non_economic_damages
            && self.total_case_value == other.total_case_value
            && self.adjusted_case_value == other.adjusted_case_value
            && self.realistic_recovery == other.realistic_recovery
            && self.settlement_range == other.settlement_range
            && self.insights == other.insights
    }
}

/// Per-case aggregate snapshot kept by the persistence collaborator so a
/// settlement analysis can be shown again without recomputation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DamageCalculation {
    pub case_id: CaseId,
    pub economic_total: Decimal,
    pub non_economic_total: Decimal,
    pub grand_total: Decimal,
    pub settlement_analysis: Option<CaseValuation>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettlementHistoryEntry {
    pub case_id: CaseId,
    pub valuation: CaseValuation,
    pub recorded_at: DateTime<Utc>,
}

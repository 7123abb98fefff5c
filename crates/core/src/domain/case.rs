use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaseId(pub String);

impl std::fmt::Display for CaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Case-level fields the valuation form is pre-filled from.
///
/// None of these are authoritative valuation inputs; they only seed an empty
/// form when a case is first opened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: CaseId,
    pub title: String,
    pub injury_type: Option<String>,
    pub default_multiplier: Option<Decimal>,
    pub policy_limit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MedicalRecordId(pub String);

/// One billed entry from the medical-records subsystem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MedicalRecordEntry {
    pub id: MedicalRecordId,
    pub case_id: CaseId,
    pub provider: String,
    pub billed_amount: Option<Decimal>,
}

pub fn billed_total(records: &[MedicalRecordEntry]) -> Decimal {
    records
        .iter()
        .filter_map(|record| record.billed_amount)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

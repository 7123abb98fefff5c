use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::case::CaseId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DamageElementId(pub String);

impl DamageElementId {
    pub fn generate() -> Self {
        Self(format!("DMG-{}", uuid::Uuid::new_v4().simple()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DamageElementType {
    PastMedical,
    FutureMedical,
    LostWages,
    FutureLostWages,
    EarningCapacity,
    HouseholdServices,
    Mileage,
    PainSuffering,
    EmotionalDistress,
    LossConsortium,
    LossEnjoyment,
    PropertyDamage,
    OutOfPocket,
    Other,
}

impl DamageElementType {
    pub const ALL: [Self; 14] = [
        Self::PastMedical,
        Self::FutureMedical,
        Self::LostWages,
        Self::FutureLostWages,
        Self::EarningCapacity,
        Self::HouseholdServices,
        Self::Mileage,
        Self::PainSuffering,
        Self::EmotionalDistress,
        Self::LossConsortium,
        Self::LossEnjoyment,
        Self::PropertyDamage,
        Self::OutOfPocket,
        Self::Other,
    ];

    pub const ECONOMIC: [Self; 6] = [
        Self::PastMedical,
        Self::FutureMedical,
        Self::LostWages,
        Self::FutureLostWages,
        Self::PropertyDamage,
        Self::OutOfPocket,
    ];

    pub const NON_ECONOMIC: [Self; 4] =
        [Self::PainSuffering, Self::EmotionalDistress, Self::LossConsortium, Self::LossEnjoyment];

    /// Categories that get their own display group; everything else lands in "other".
    pub const MAIN: [Self; 4] =
        [Self::PastMedical, Self::LostWages, Self::FutureMedical, Self::PainSuffering];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PastMedical => "PAST_MEDICAL",
            Self::FutureMedical => "FUTURE_MEDICAL",
            Self::LostWages => "LOST_WAGES",
            Self::FutureLostWages => "FUTURE_LOST_WAGES",
            Self::EarningCapacity => "EARNING_CAPACITY",
            Self::HouseholdServices => "HOUSEHOLD_SERVICES",
            Self::Mileage => "MILEAGE",
            Self::PainSuffering => "PAIN_SUFFERING",
            Self::EmotionalDistress => "EMOTIONAL_DISTRESS",
            Self::LossConsortium => "LOSS_CONSORTIUM",
            Self::LossEnjoyment => "LOSS_ENJOYMENT",
            Self::PropertyDamage => "PROPERTY_DAMAGE",
            Self::OutOfPocket => "OUT_OF_POCKET",
            Self::Other => "OTHER",
        }
    }

    pub fn is_economic(&self) -> bool {
        Self::ECONOMIC.contains(self)
    }

    pub fn is_non_economic(&self) -> bool {
        Self::NON_ECONOMIC.contains(self)
    }

    pub fn is_main(&self) -> bool {
        Self::MAIN.contains(self)
    }
}

impl std::str::FromStr for DamageElementType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Self::ALL.into_iter().find(|kind| kind.as_str() == normalized).ok_or_else(|| {
            DomainError::InvariantViolation(format!("unknown damage element type `{value}`"))
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    High,
    #[default]
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl std::str::FromStr for ConfidenceLevel {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            other => {
                Err(DomainError::InvariantViolation(format!("unknown confidence level `{other}`")))
            }
        }
    }
}

/// One line-item of claimed damages, owned by exactly one case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DamageElement {
    pub id: DamageElementId,
    pub case_id: CaseId,
    pub element_type: DamageElementType,
    pub description: String,
    pub base_amount: Option<Decimal>,
    pub calculated_amount: Option<Decimal>,
    pub confidence_level: ConfidenceLevel,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DamageElement {
    pub fn from_draft(id: DamageElementId, case_id: CaseId, draft: DamageElementDraft) -> Self {
        let now = Utc::now();
        Self {
            id,
            case_id,
            element_type: draft.element_type,
            description: draft.description,
            base_amount: draft.base_amount,
            calculated_amount: draft.calculated_amount,
            confidence_level: draft.confidence_level,
            notes: draft.notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// `calculated_amount` wins over `base_amount`; an element with neither counts as zero.
    pub fn effective_amount(&self) -> Decimal {
        self.calculated_amount.or(self.base_amount).unwrap_or(Decimal::ZERO)
    }

    pub fn apply_draft(&mut self, draft: DamageElementDraft) {
        self.element_type = draft.element_type;
        self.description = draft.description;
        self.base_amount = draft.base_amount;
        self.calculated_amount = draft.calculated_amount;
        self.confidence_level = draft.confidence_level;
        self.notes = draft.notes;
        self.updated_at = Utc::now();
    }
}

/// User-editable fields of a damage element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DamageElementDraft {
    pub element_type: DamageElementType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub base_amount: Option<Decimal>,
    #[serde(default)]
    pub calculated_amount: Option<Decimal>,
    #[serde(default)]
    pub confidence_level: ConfidenceLevel,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DamageElementDraft {
    pub fn new(element_type: DamageElementType, base_amount: Decimal) -> Self {
        Self {
            element_type,
            description: String::new(),
            base_amount: Some(base_amount),
            calculated_amount: None,
            confidence_level: ConfidenceLevel::default(),
            notes: None,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let negative = [self.base_amount, self.calculated_amount]
            .into_iter()
            .flatten()
            .any(|amount| amount < Decimal::ZERO);
        if negative {
            return Err(DomainError::InvariantViolation(
                "damage element amounts must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

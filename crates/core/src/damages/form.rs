use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::case::CaseRecord;
use crate::domain::valuation::CaseValuationInput;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    MedicalExpenses,
    LostWages,
    FutureMedical,
}

impl FormField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MedicalExpenses => "medical_expenses",
            Self::LostWages => "lost_wages",
            Self::FutureMedical => "future_medical",
        }
    }
}

/// Valuation form state for the active case. Nothing recomputes on change;
/// callers ask for a valuation explicitly after editing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationForm {
    values: CaseValuationInput,
}

impl ValuationForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_input(values: CaseValuationInput) -> Self {
        Self { values }
    }

    /// Seeds empty fields from the case record. Lost wages and medical figures
    /// are never taken from the case; only reconciliation fills those.
    pub fn prefill_from_case(&mut self, case: &CaseRecord) {
        if self.values.injury_type.is_empty() {
            if let Some(injury_type) = &case.injury_type {
                self.values.injury_type = injury_type.clone();
            }
        }
        if self.values.custom_multiplier.is_none() {
            self.values.custom_multiplier = case.default_multiplier;
        }
        if self.values.policy_limit.is_none() {
            self.values.policy_limit = case.policy_limit;
        }
    }

    pub fn field(&self, field: FormField) -> Decimal {
        match field {
            FormField::MedicalExpenses => self.values.medical_expenses,
            FormField::LostWages => self.values.lost_wages,
            FormField::FutureMedical => self.values.future_medical,
        }
    }

    pub fn set_field(&mut self, field: FormField, value: Decimal) {
        let value = value.max(Decimal::ZERO);
        match field {
            FormField::MedicalExpenses => self.values.medical_expenses = value,
            FormField::LostWages => self.values.lost_wages = value,
            FormField::FutureMedical => self.values.future_medical = value,
        }
    }

    pub fn values(&self) -> &CaseValuationInput {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut CaseValuationInput {
        &mut self.values
    }

    pub fn to_input(&self) -> CaseValuationInput {
        self.values.clone()
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::damages::aggregate::DamageAggregator;
use crate::damages::form::{FormField, ValuationForm};
use crate::domain::case::{billed_total, MedicalRecordEntry};
use crate::domain::damage::{DamageElement, DamageElementType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicalSource {
    MedicalRecords,
    DamageElements,
    None,
}

/// Authoritative economic figures for one case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledFigures {
    pub medical_expenses: Decimal,
    pub lost_wages: Decimal,
    pub future_medical: Decimal,
    pub medical_source: MedicalSource,
}

pub struct ReconciliationEngine;

impl ReconciliationEngine {
    /// Medical expenses take the larger of the billed medical-record total and
    /// the `PAST_MEDICAL` element total; the two overlap, so they are never
    /// summed. Lost wages and future medical come only from damage elements.
    pub fn reconcile(
        medical_records: &[MedicalRecordEntry],
        elements: &[DamageElement],
    ) -> ReconciledFigures {
        let aggregator = DamageAggregator::new(elements);
        let from_records = billed_total(medical_records).max(Decimal::ZERO);
        let from_elements = aggregator.category_total(DamageElementType::PastMedical);

        let medical_source = if from_records > Decimal::ZERO && from_records >= from_elements {
            MedicalSource::MedicalRecords
        } else if from_elements > Decimal::ZERO {
            MedicalSource::DamageElements
        } else {
            MedicalSource::None
        };

        ReconciledFigures {
            medical_expenses: from_records.max(from_elements),
            lost_wages: aggregator.category_total(DamageElementType::LostWages),
            future_medical: aggregator.category_total(DamageElementType::FutureMedical),
            medical_source,
        }
    }
}

impl ReconciledFigures {
    /// Writes figures into the form. A figure of zero carries no new evidence
    /// and never clears what is already there. Returns the fields written.
    pub fn apply_to(&self, form: &mut ValuationForm) -> Vec<FormField> {
        let mut written = Vec::new();
        for (field, value) in [
            (FormField::MedicalExpenses, self.medical_expenses),
            (FormField::LostWages, self.lost_wages),
            (FormField::FutureMedical, self.future_medical),
        ] {
            if value > Decimal::ZERO {
                form.set_field(field, value);
                written.push(field);
            }
        }
        written
    }
}

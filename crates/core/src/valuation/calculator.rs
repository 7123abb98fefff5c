use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::valuation::{CaseValuation, CaseValuationInput, ValuationSource};
use crate::errors::ValidationError;

pub const DEFAULT_MULTIPLIER: Decimal = Decimal::from_parts(20, 0, 0, false, 1);

/// Injury-severity multipliers, ordered from least to most severe.
pub const MULTIPLIER_TABLE: [(&str, Decimal); 12] = [
    ("soft_tissue", Decimal::from_parts(15, 0, 0, false, 1)),
    ("whiplash", Decimal::from_parts(20, 0, 0, false, 1)),
    ("sprain_strain", Decimal::from_parts(20, 0, 0, false, 1)),
    ("fracture", Decimal::from_parts(25, 0, 0, false, 1)),
    ("concussion", Decimal::from_parts(30, 0, 0, false, 1)),
    ("herniated_disc", Decimal::from_parts(30, 0, 0, false, 1)),
    ("burn", Decimal::from_parts(35, 0, 0, false, 1)),
    ("surgery", Decimal::from_parts(35, 0, 0, false, 1)),
    ("traumatic_brain_injury", Decimal::from_parts(40, 0, 0, false, 1)),
    ("spinal_cord", Decimal::from_parts(45, 0, 0, false, 1)),
    ("amputation", Decimal::from_parts(45, 0, 0, false, 1)),
    ("wrongful_death", Decimal::from_parts(50, 0, 0, false, 1)),
];

pub fn normalize_injury_type(injury_type: &str) -> String {
    injury_type
        .trim()
        .to_ascii_lowercase()
        .split(|ch: char| ch.is_whitespace() || ch == '-' || ch == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

pub fn table_multiplier(injury_type: &str) -> Option<Decimal> {
    let key = normalize_injury_type(injury_type);
    MULTIPLIER_TABLE.iter().find(|(name, _)| *name == key).map(|(_, multiplier)| *multiplier)
}

/// Custom override when positive, else the injury table, else the default.
pub fn select_multiplier(input: &CaseValuationInput) -> Decimal {
    input
        .custom_multiplier
        .filter(|multiplier| *multiplier > Decimal::ZERO)
        .or_else(|| table_multiplier(&input.injury_type))
        .unwrap_or(DEFAULT_MULTIPLIER)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TracedValuation {
    pub valuation: CaseValuation,
    pub steps: Vec<ValuationTraceStep>,
}

pub trait ValuationEngine: Send + Sync {
    fn value(&self, input: &CaseValuationInput) -> CaseValuation;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicValuationEngine;

impl ValuationEngine for DeterministicValuationEngine {
    fn value(&self, input: &CaseValuationInput) -> CaseValuation {
        compute_local(input)
    }
}

pub fn compute_local(input: &CaseValuationInput) -> CaseValuation {
    compute_local_with_trace(input).valuation
}

/// Never panics: sums and products saturate at `Decimal::MAX`.
pub fn compute_local_with_trace(input: &CaseValuationInput) -> TracedValuation {
    let multiplier = select_multiplier(input);
    let economic_damages = input
        .medical_expenses
        .saturating_add(input.lost_wages)
        .saturating_add(input.future_medical);
    let non_economic_damages = economic_damages.saturating_mul(multiplier);
    let total_case_value = economic_damages.saturating_add(non_economic_damages);
    let negligence = input.comparative_negligence_pct.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    let adjusted_case_value =
        total_case_value.saturating_mul(Decimal::ONE - negligence / Decimal::ONE_HUNDRED);
    let realistic_recovery = match input.policy_limit {
        Some(limit) => adjusted_case_value.min(limit),
        None => adjusted_case_value,
    };

    let steps = vec![
        step("multiplier", multiplier_detail(input, multiplier), multiplier),
        step("economic", "medical_expenses + lost_wages + future_medical", economic_damages),
        step("non_economic", "economic * multiplier", non_economic_damages),
        step("total", "economic + non_economic", total_case_value),
        step(
            "adjusted",
            format!("total * (1 - {negligence}/100) comparative negligence"),
            adjusted_case_value,
        ),
        step(
            "realistic_recovery",
            match input.policy_limit {
                Some(limit) => format!("min(adjusted, policy_limit {limit})"),
                None => "adjusted (no policy limit)".to_string(),
            },
            realistic_recovery,
        ),
    ];

    TracedValuation {
        valuation: CaseValuation {
            case_id: None,
            source: ValuationSource::Local,
            multiplier,
            economic_damages,
            non_economic_damages,
            total_case_value,
            adjusted_case_value,
            realistic_recovery,
            settlement_range: None,
            insights: None,
            computed_at: Utc::now(),
        },
        steps,
    }
}

/// Guard run before any valuation: refuses an all-zero computation.
pub struct ValuationPrecondition;

impl ValuationPrecondition {
    pub fn check(
        input: &CaseValuationInput,
        damage_economic_total: Decimal,
    ) -> Result<(), ValidationError> {
        let has_figure = [
            input.medical_expenses,
            input.lost_wages,
            input.future_medical,
            damage_economic_total,
        ]
        .iter()
        .any(|amount| *amount > Decimal::ZERO);

        if has_figure {
            return Ok(());
        }

        Err(ValidationError {
            missing_fields: vec!["medical_expenses", "lost_wages", "future_medical"],
        })
    }
}

fn multiplier_detail(input: &CaseValuationInput, multiplier: Decimal) -> String {
    match input.custom_multiplier {
        Some(custom) if custom > Decimal::ZERO => format!("custom multiplier {custom}"),
        _ => match table_multiplier(&input.injury_type) {
            Some(_) => format!("injury type `{}` -> {multiplier}", input.injury_type),
            None => format!("default multiplier {multiplier}"),
        },
    }
}

fn step(stage: &str, detail: impl Into<String>, amount: Decimal) -> ValuationTraceStep {
    ValuationTraceStep { stage: stage.to_string(), detail: detail.into(), amount }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::damage::{DamageElement, DamageElementType};

/// Display bucket for grouped damage listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryGroupKey {
    PastMedical,
    LostWages,
    FutureMedical,
    PainSuffering,
    Other,
}

impl CategoryGroupKey {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PastMedical => "Past medical",
            Self::LostWages => "Lost wages",
            Self::FutureMedical => "Future medical",
            Self::PainSuffering => "Pain and suffering",
            Self::Other => "Other damages",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub key: CategoryGroupKey,
    pub elements: Vec<DamageElement>,
    pub total: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageSummary {
    pub economic_total: Decimal,
    pub non_economic_total: Decimal,
    pub grand_total: Decimal,
    pub element_count: usize,
}

/// Read-only view that categorizes and sums a case's damage elements.
#[derive(Clone, Copy, Debug)]
pub struct DamageAggregator<'a> {
    elements: &'a [DamageElement],
}

impl<'a> DamageAggregator<'a> {
    pub fn new(elements: &'a [DamageElement]) -> Self {
        Self { elements }
    }

    pub fn by_category(&self, element_type: DamageElementType) -> Vec<&'a DamageElement> {
        self.elements.iter().filter(|element| element.element_type == element_type).collect()
    }

    pub fn category_total(&self, element_type: DamageElementType) -> Decimal {
        self.sum_where(|kind| kind == element_type)
    }

    pub fn economic_total(&self) -> Decimal {
        self.sum_where(|kind| kind.is_economic())
    }

    pub fn non_economic_total(&self) -> Decimal {
        self.sum_where(|kind| kind.is_non_economic())
    }

    pub fn grand_total(&self) -> Decimal {
        self.economic_total().saturating_add(self.non_economic_total())
    }

    /// Catch-all display bucket. Not a financial rule: types such as
    /// `FUTURE_LOST_WAGES` show up here and still count toward `economic_total`.
    pub fn other_elements(&self) -> Vec<&'a DamageElement> {
        self.elements.iter().filter(|element| !element.element_type.is_main()).collect()
    }

    pub fn grouped(&self) -> Vec<CategoryGroup> {
        let main = [
            (CategoryGroupKey::PastMedical, DamageElementType::PastMedical),
            (CategoryGroupKey::LostWages, DamageElementType::LostWages),
            (CategoryGroupKey::FutureMedical, DamageElementType::FutureMedical),
            (CategoryGroupKey::PainSuffering, DamageElementType::PainSuffering),
        ];

        let mut groups: Vec<CategoryGroup> = main
            .into_iter()
            .map(|(key, element_type)| CategoryGroup {
                key,
                elements: self.by_category(element_type).into_iter().cloned().collect(),
                total: self.category_total(element_type),
            })
            .collect();

        let other = self.other_elements();
        groups.push(CategoryGroup {
            key: CategoryGroupKey::Other,
            total: saturating_sum(other.iter().map(|element| element.effective_amount())),
            elements: other.into_iter().cloned().collect(),
        });

        groups
    }

    pub fn summary(&self) -> DamageSummary {
        let economic_total = self.economic_total();
        let non_economic_total = self.non_economic_total();
        DamageSummary {
            economic_total,
            non_economic_total,
            grand_total: economic_total.saturating_add(non_economic_total),
            element_count: self.elements.len(),
        }
    }

    fn sum_where(&self, predicate: impl Fn(DamageElementType) -> bool) -> Decimal {
        saturating_sum(
            self.elements
                .iter()
                .filter(|element| predicate(element.element_type))
                .map(DamageElement::effective_amount),
        )
    }
}

fn saturating_sum(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    amounts.into_iter().fold(Decimal::ZERO, Decimal::saturating_add)
}

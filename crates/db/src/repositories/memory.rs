use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::RwLock;

use caseworth_core::domain::case::{billed_total, CaseId, CaseRecord, MedicalRecordEntry};
use caseworth_core::domain::damage::{
    DamageElement, DamageElementDraft, DamageElementId, DamageElementType,
};
use caseworth_core::domain::valuation::{DamageCalculation, SettlementHistoryEntry};

use super::damage_element::synced_medical_draft;
use super::{
    CaseRecordRepository, DamageCalculationRepository, DamageElementRepository,
    MedicalRecordRepository, RepositoryError, SettlementHistoryRepository,
    SYNCED_MEDICAL_DESCRIPTION,
};

/// Backing maps shared by the in-memory repositories so cascading deletes and
/// medical sync see the same data, as the SQL tables do.
#[derive(Default)]
pub struct MemoryTables {
    cases: RwLock<HashMap<String, CaseRecord>>,
    medical_records: RwLock<Vec<MedicalRecordEntry>>,
    elements: RwLock<Vec<DamageElement>>,
    calculations: RwLock<HashMap<String, DamageCalculation>>,
    history: RwLock<Vec<SettlementHistoryEntry>>,
}

impl MemoryTables {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCaseRecordRepository {
    tables: Arc<MemoryTables>,
}

impl InMemoryCaseRecordRepository {
    pub fn new(tables: Arc<MemoryTables>) -> Self {
        Self { tables }
    }
}

#[async_trait::async_trait]
impl CaseRecordRepository for InMemoryCaseRecordRepository {
    async fn find_by_id(&self, id: &CaseId) -> Result<Option<CaseRecord>, RepositoryError> {
        let cases = self.tables.cases.read().await;
        Ok(cases.get(&id.0).cloned())
    }

    async fn save(&self, case: CaseRecord) -> Result<(), RepositoryError> {
        let mut cases = self.tables.cases.write().await;
        cases.insert(case.id.0.clone(), case);
        Ok(())
    }

    async fn delete(&self, id: &CaseId) -> Result<bool, RepositoryError> {
        let removed = self.tables.cases.write().await.remove(&id.0).is_some();
        if removed {
            self.tables.medical_records.write().await.retain(|record| record.case_id != *id);
            self.tables.elements.write().await.retain(|element| element.case_id != *id);
            self.tables.calculations.write().await.remove(&id.0);
            self.tables.history.write().await.retain(|entry| entry.case_id != *id);
        }
        Ok(removed)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryMedicalRecordRepository {
    tables: Arc<MemoryTables>,
}

impl InMemoryMedicalRecordRepository {
    pub fn new(tables: Arc<MemoryTables>) -> Self {
        Self { tables }
    }
}

#[async_trait::async_trait]
impl MedicalRecordRepository for InMemoryMedicalRecordRepository {
    async fn list_by_case(
        &self,
        case_id: &CaseId,
    ) -> Result<Vec<MedicalRecordEntry>, RepositoryError> {
        let records = self.tables.medical_records.read().await;
        Ok(records.iter().filter(|record| record.case_id == *case_id).cloned().collect())
    }

    async fn add(&self, entry: MedicalRecordEntry) -> Result<(), RepositoryError> {
        let mut records = self.tables.medical_records.write().await;
        match records.iter_mut().find(|record| record.id == entry.id) {
            Some(existing) => *existing = entry,
            None => records.push(entry),
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryDamageElementRepository {
    tables: Arc<MemoryTables>,
}

impl InMemoryDamageElementRepository {
    pub fn new(tables: Arc<MemoryTables>) -> Self {
        Self { tables }
    }
}

#[async_trait::async_trait]
impl DamageElementRepository for InMemoryDamageElementRepository {
    async fn list_by_case(&self, case_id: &CaseId) -> Result<Vec<DamageElement>, RepositoryError> {
        let elements = self.tables.elements.read().await;
        Ok(elements.iter().filter(|element| element.case_id == *case_id).cloned().collect())
    }

    async fn find_by_id(
        &self,
        id: &DamageElementId,
    ) -> Result<Option<DamageElement>, RepositoryError> {
        let elements = self.tables.elements.read().await;
        Ok(elements.iter().find(|element| element.id == *id).cloned())
    }

    async fn create(
        &self,
        case_id: &CaseId,
        draft: DamageElementDraft,
    ) -> Result<DamageElement, RepositoryError> {
        if !self.tables.cases.read().await.contains_key(&case_id.0) {
            return Err(RepositoryError::not_found("case", case_id.0.clone()));
        }
        let element =
            DamageElement::from_draft(DamageElementId::generate(), case_id.clone(), draft);
        self.tables.elements.write().await.push(element.clone());
        Ok(element)
    }

    async fn update(
        &self,
        id: &DamageElementId,
        draft: DamageElementDraft,
    ) -> Result<DamageElement, RepositoryError> {
        let mut elements = self.tables.elements.write().await;
        let element = elements
            .iter_mut()
            .find(|element| element.id == *id)
            .ok_or_else(|| RepositoryError::not_found("damage element", id.0.clone()))?;
        element.apply_draft(draft);
        Ok(element.clone())
    }

    async fn delete(&self, id: &DamageElementId) -> Result<(), RepositoryError> {
        let mut elements = self.tables.elements.write().await;
        let before = elements.len();
        elements.retain(|element| element.id != *id);
        if elements.len() == before {
            return Err(RepositoryError::not_found("damage element", id.0.clone()));
        }
        Ok(())
    }

    async fn sync_medical_expenses(
        &self,
        case_id: &CaseId,
    ) -> Result<Option<DamageElement>, RepositoryError> {
        let (total, record_count) = {
            let records = self.tables.medical_records.read().await;
            let for_case: Vec<MedicalRecordEntry> =
                records.iter().filter(|record| record.case_id == *case_id).cloned().collect();
            (billed_total(&for_case), for_case.len())
        };

        let mut elements = self.tables.elements.write().await;
        let draft = synced_medical_draft(total, record_count);
        let existing = elements.iter_mut().find(|element| {
            element.case_id == *case_id
                && element.element_type == DamageElementType::PastMedical
                && element.description == SYNCED_MEDICAL_DESCRIPTION
        });

        match existing {
            Some(element) => {
                element.apply_draft(draft);
                Ok(Some(element.clone()))
            }
            None if total > Decimal::ZERO => {
                let element =
                    DamageElement::from_draft(DamageElementId::generate(), case_id.clone(), draft);
                elements.push(element.clone());
                Ok(Some(element))
            }
            None => Ok(None),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryDamageCalculationRepository {
    tables: Arc<MemoryTables>,
}

impl InMemoryDamageCalculationRepository {
    pub fn new(tables: Arc<MemoryTables>) -> Self {
        Self { tables }
    }
}

#[async_trait::async_trait]
impl DamageCalculationRepository for InMemoryDamageCalculationRepository {
    async fn fetch(&self, case_id: &CaseId) -> Result<Option<DamageCalculation>, RepositoryError> {
        let calculations = self.tables.calculations.read().await;
        Ok(calculations.get(&case_id.0).cloned())
    }

    async fn save(&self, calculation: DamageCalculation) -> Result<(), RepositoryError> {
        let mut calculations = self.tables.calculations.write().await;
        calculations.insert(calculation.case_id.0.clone(), calculation);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemorySettlementHistoryRepository {
    tables: Arc<MemoryTables>,
}

impl InMemorySettlementHistoryRepository {
    pub fn new(tables: Arc<MemoryTables>) -> Self {
        Self { tables }
    }
}

#[async_trait::async_trait]
impl SettlementHistoryRepository for InMemorySettlementHistoryRepository {
    async fn append(&self, entry: SettlementHistoryEntry) -> Result<(), RepositoryError> {
        self.tables.history.write().await.push(entry);
        Ok(())
    }

    async fn list_by_case(
        &self,
        case_id: &CaseId,
    ) -> Result<Vec<SettlementHistoryEntry>, RepositoryError> {
        let history = self.tables.history.read().await;
        Ok(history.iter().filter(|entry| entry.case_id == *case_id).cloned().collect())
    }
}

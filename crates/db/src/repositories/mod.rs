use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use caseworth_core::domain::case::{CaseId, CaseRecord, MedicalRecordEntry};
use caseworth_core::domain::damage::{DamageElement, DamageElementDraft, DamageElementId};
use caseworth_core::domain::valuation::{DamageCalculation, SettlementHistoryEntry};

pub mod calculation;
pub mod case;
pub mod damage_element;
pub mod memory;

pub use calculation::{SqlDamageCalculationRepository, SqlSettlementHistoryRepository};
pub use case::{SqlCaseRecordRepository, SqlMedicalRecordRepository};
pub use damage_element::SqlDamageElementRepository;
pub use memory::{
    InMemoryCaseRecordRepository, InMemoryDamageCalculationRepository,
    InMemoryDamageElementRepository, InMemoryMedicalRecordRepository,
    InMemorySettlementHistoryRepository, MemoryTables,
};

/// Description carried by the `PAST_MEDICAL` element that mirrors the billed
/// medical-record total. Sync updates this element in place.
pub const SYNCED_MEDICAL_DESCRIPTION: &str = "Medical bills (synced from medical records)";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }
}

#[async_trait]
pub trait CaseRecordRepository: Send + Sync {
    async fn find_by_id(&self, id: &CaseId) -> Result<Option<CaseRecord>, RepositoryError>;
    async fn save(&self, case: CaseRecord) -> Result<(), RepositoryError>;
    /// Removes the case and everything that hangs off it. Returns whether a
    /// case was removed.
    async fn delete(&self, id: &CaseId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait MedicalRecordRepository: Send + Sync {
    async fn list_by_case(
        &self,
        case_id: &CaseId,
    ) -> Result<Vec<MedicalRecordEntry>, RepositoryError>;
    async fn add(&self, entry: MedicalRecordEntry) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait DamageElementRepository: Send + Sync {
    async fn list_by_case(&self, case_id: &CaseId) -> Result<Vec<DamageElement>, RepositoryError>;
    async fn find_by_id(
        &self,
        id: &DamageElementId,
    ) -> Result<Option<DamageElement>, RepositoryError>;
    async fn create(
        &self,
        case_id: &CaseId,
        draft: DamageElementDraft,
    ) -> Result<DamageElement, RepositoryError>;
    async fn update(
        &self,
        id: &DamageElementId,
        draft: DamageElementDraft,
    ) -> Result<DamageElement, RepositoryError>;
    async fn delete(&self, id: &DamageElementId) -> Result<(), RepositoryError>;
    /// Recomputes the synced `PAST_MEDICAL` element from billed medical
    /// records. Returns `None` when there is nothing billed and no synced
    /// element exists yet.
    async fn sync_medical_expenses(
        &self,
        case_id: &CaseId,
    ) -> Result<Option<DamageElement>, RepositoryError>;
}

#[async_trait]
pub trait DamageCalculationRepository: Send + Sync {
    async fn fetch(&self, case_id: &CaseId) -> Result<Option<DamageCalculation>, RepositoryError>;
    async fn save(&self, calculation: DamageCalculation) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SettlementHistoryRepository: Send + Sync {
    async fn append(&self, entry: SettlementHistoryEntry) -> Result<(), RepositoryError>;
    /// Oldest first.
    async fn list_by_case(
        &self,
        case_id: &CaseId,
    ) -> Result<Vec<SettlementHistoryEntry>, RepositoryError>;
}

pub(crate) fn decode_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

pub(crate) fn parse_decimal(column: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value)
        .map_err(|error| RepositoryError::Decode(format!("invalid decimal in `{column}`: {error}")))
}

pub(crate) fn parse_optional_decimal(
    column: &str,
    value: Option<String>,
) -> Result<Option<Decimal>, RepositoryError> {
    value.as_deref().map(|raw| parse_decimal(column, raw)).transpose()
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc)).map_err(|error| {
        RepositoryError::Decode(format!("invalid timestamp in `{column}`: {error}"))
    })
}

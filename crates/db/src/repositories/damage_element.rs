use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Row, Sqlite};

use caseworth_core::domain::case::CaseId;
use caseworth_core::domain::damage::{
    ConfidenceLevel, DamageElement, DamageElementDraft, DamageElementId, DamageElementType,
};

use super::{
    decode_error, parse_optional_decimal, parse_timestamp, DamageElementRepository,
    RepositoryError, SYNCED_MEDICAL_DESCRIPTION,
};
use crate::DbPool;

const ELEMENT_COLUMNS: &str = "id, case_id, element_type, description, base_amount,
    calculated_amount, confidence_level, notes, created_at, updated_at";

pub struct SqlDamageElementRepository {
    pool: DbPool,
}

impl SqlDamageElementRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_element(row: &sqlx::sqlite::SqliteRow) -> Result<DamageElement, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let case_id: String = row.try_get("case_id").map_err(decode_error)?;
    let element_type: String = row.try_get("element_type").map_err(decode_error)?;
    let description: String = row.try_get("description").map_err(decode_error)?;
    let base_amount: Option<String> = row.try_get("base_amount").map_err(decode_error)?;
    let calculated_amount: Option<String> =
        row.try_get("calculated_amount").map_err(decode_error)?;
    let confidence_level: String = row.try_get("confidence_level").map_err(decode_error)?;
    let notes: Option<String> = row.try_get("notes").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;

    Ok(DamageElement {
        id: DamageElementId(id),
        case_id: CaseId(case_id),
        element_type: DamageElementType::from_str(&element_type).map_err(decode_error)?,
        description,
        base_amount: parse_optional_decimal("base_amount", base_amount)?,
        calculated_amount: parse_optional_decimal("calculated_amount", calculated_amount)?,
        confidence_level: ConfidenceLevel::from_str(&confidence_level).map_err(decode_error)?,
        notes,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

fn insert_element(element: &DamageElement) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    sqlx::query(
        "INSERT INTO damage_element (id, case_id, element_type, description, base_amount,
                                     calculated_amount, confidence_level, notes, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&element.id.0)
    .bind(&element.case_id.0)
    .bind(element.element_type.as_str())
    .bind(&element.description)
    .bind(element.base_amount.map(|value| value.to_string()))
    .bind(element.calculated_amount.map(|value| value.to_string()))
    .bind(element.confidence_level.as_str())
    .bind(&element.notes)
    .bind(element.created_at.to_rfc3339())
    .bind(element.updated_at.to_rfc3339())
}

fn update_element(element: &DamageElement) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    sqlx::query(
        "UPDATE damage_element SET
             element_type = ?,
             description = ?,
             base_amount = ?,
             calculated_amount = ?,
             confidence_level = ?,
             notes = ?,
             updated_at = ?
         WHERE id = ?",
    )
    .bind(element.element_type.as_str())
    .bind(&element.description)
    .bind(element.base_amount.map(|value| value.to_string()))
    .bind(element.calculated_amount.map(|value| value.to_string()))
    .bind(element.confidence_level.as_str())
    .bind(&element.notes)
    .bind(element.updated_at.to_rfc3339())
    .bind(&element.id.0)
}

pub(crate) fn synced_medical_draft(total: Decimal, record_count: usize) -> DamageElementDraft {
    DamageElementDraft {
        element_type: DamageElementType::PastMedical,
        description: SYNCED_MEDICAL_DESCRIPTION.to_string(),
        base_amount: Some(total),
        calculated_amount: None,
        confidence_level: ConfidenceLevel::High,
        notes: Some(format!("{record_count} medical record(s)")),
    }
}

#[async_trait::async_trait]
impl DamageElementRepository for SqlDamageElementRepository {
    async fn list_by_case(&self, case_id: &CaseId) -> Result<Vec<DamageElement>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {ELEMENT_COLUMNS} FROM damage_element
             WHERE case_id = ? ORDER BY created_at ASC, id ASC"
        ))
        .bind(&case_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_element).collect::<Result<Vec<_>, _>>()
    }

    async fn find_by_id(
        &self,
        id: &DamageElementId,
    ) -> Result<Option<DamageElement>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ELEMENT_COLUMNS} FROM damage_element WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_element).transpose()
    }

    async fn create(
        &self,
        case_id: &CaseId,
        draft: DamageElementDraft,
    ) -> Result<DamageElement, RepositoryError> {
        let element =
            DamageElement::from_draft(DamageElementId::generate(), case_id.clone(), draft);
        insert_element(&element).execute(&self.pool).await?;
        Ok(element)
    }

    async fn update(
        &self,
        id: &DamageElementId,
        draft: DamageElementDraft,
    ) -> Result<DamageElement, RepositoryError> {
        let mut element = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("damage element", id.0.clone()))?;
        element.apply_draft(draft);
        update_element(&element).execute(&self.pool).await?;
        Ok(element)
    }

    async fn delete(&self, id: &DamageElementId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM damage_element WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("damage element", id.0.clone()));
        }
        Ok(())
    }

    async fn sync_medical_expenses(
        &self,
        case_id: &CaseId,
    ) -> Result<Option<DamageElement>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let billed_rows: Vec<Option<String>> =
            sqlx::query_scalar("SELECT billed_amount FROM medical_record WHERE case_id = ?")
                .bind(&case_id.0)
                .fetch_all(&mut *tx)
                .await?;
        let record_count = billed_rows.len();
        let mut total = Decimal::ZERO;
        for billed in billed_rows {
            if let Some(amount) = parse_optional_decimal("billed_amount", billed)? {
                total += amount;
            }
        }

        let existing = sqlx::query(&format!(
            "SELECT {ELEMENT_COLUMNS} FROM damage_element
             WHERE case_id = ? AND element_type = 'PAST_MEDICAL' AND description = ?
             ORDER BY created_at ASC LIMIT 1"
        ))
        .bind(&case_id.0)
        .bind(SYNCED_MEDICAL_DESCRIPTION)
        .fetch_optional(&mut *tx)
        .await?;
        let existing = existing.as_ref().map(row_to_element).transpose()?;

        let draft = synced_medical_draft(total, record_count);
        let synced = match existing {
            Some(mut element) => {
                element.apply_draft(draft);
                update_element(&element).execute(&mut *tx).await?;
                Some(element)
            }
            None if total > Decimal::ZERO => {
                let element =
                    DamageElement::from_draft(DamageElementId::generate(), case_id.clone(), draft);
                insert_element(&element).execute(&mut *tx).await?;
                Some(element)
            }
            None => None,
        };

        tx.commit().await?;
        Ok(synced)
    }
}

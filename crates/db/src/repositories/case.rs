use chrono::Utc;
use sqlx::Row;

use caseworth_core::domain::case::{CaseId, CaseRecord, MedicalRecordEntry, MedicalRecordId};

use super::{
    decode_error, parse_optional_decimal, parse_timestamp, CaseRecordRepository,
    MedicalRecordRepository, RepositoryError,
};
use crate::DbPool;

pub struct SqlCaseRecordRepository {
    pool: DbPool,
}

impl SqlCaseRecordRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_case(row: &sqlx::sqlite::SqliteRow) -> Result<CaseRecord, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let title: String = row.try_get("title").map_err(decode_error)?;
    let injury_type: Option<String> = row.try_get("injury_type").map_err(decode_error)?;
    let default_multiplier: Option<String> =
        row.try_get("default_multiplier").map_err(decode_error)?;
    let policy_limit: Option<String> = row.try_get("policy_limit").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;

    Ok(CaseRecord {
        id: CaseId(id),
        title,
        injury_type,
        default_multiplier: parse_optional_decimal("default_multiplier", default_multiplier)?,
        policy_limit: parse_optional_decimal("policy_limit", policy_limit)?,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[async_trait::async_trait]
impl CaseRecordRepository for SqlCaseRecordRepository {
    async fn find_by_id(&self, id: &CaseId) -> Result<Option<CaseRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, title, injury_type, default_multiplier, policy_limit, created_at
             FROM case_record WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_case).transpose()
    }

    async fn save(&self, case: CaseRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO case_record (id, title, injury_type, default_multiplier, policy_limit, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 injury_type = excluded.injury_type,
                 default_multiplier = excluded.default_multiplier,
                 policy_limit = excluded.policy_limit",
        )
        .bind(&case.id.0)
        .bind(&case.title)
        .bind(&case.injury_type)
        .bind(case.default_multiplier.map(|value| value.to_string()))
        .bind(case.policy_limit.map(|value| value.to_string()))
        .bind(case.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &CaseId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM case_record WHERE id = ?")
                .bind(&id.0)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct SqlMedicalRecordRepository {
    pool: DbPool,
}

impl SqlMedicalRecordRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn row_to_medical_record(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<MedicalRecordEntry, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let case_id: String = row.try_get("case_id").map_err(decode_error)?;
    let provider: String = row.try_get("provider").map_err(decode_error)?;
    let billed_amount: Option<String> = row.try_get("billed_amount").map_err(decode_error)?;

    Ok(MedicalRecordEntry {
        id: MedicalRecordId(id),
        case_id: CaseId(case_id),
        provider,
        billed_amount: parse_optional_decimal("billed_amount", billed_amount)?,
    })
}

#[async_trait::async_trait]
impl MedicalRecordRepository for SqlMedicalRecordRepository {
    async fn list_by_case(
        &self,
        case_id: &CaseId,
    ) -> Result<Vec<MedicalRecordEntry>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, case_id, provider, billed_amount
             FROM medical_record WHERE case_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(&case_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_medical_record).collect::<Result<Vec<_>, _>>()
    }

    async fn add(&self, entry: MedicalRecordEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO medical_record (id, case_id, provider, billed_amount, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 provider = excluded.provider,
                 billed_amount = excluded.billed_amount",
        )
        .bind(&entry.id.0)
        .bind(&entry.case_id.0)
        .bind(&entry.provider)
        .bind(entry.billed_amount.map(|value| value.to_string()))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

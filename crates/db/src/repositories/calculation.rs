use sqlx::Row;

use caseworth_core::domain::case::CaseId;
use caseworth_core::domain::valuation::{
    CaseValuation, DamageCalculation, SettlementHistoryEntry,
};

use super::{
    decode_error, parse_decimal, parse_timestamp, DamageCalculationRepository, RepositoryError,
    SettlementHistoryRepository,
};
use crate::DbPool;

pub struct SqlDamageCalculationRepository {
    pool: DbPool,
}

impl SqlDamageCalculationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_calculation(row: &sqlx::sqlite::SqliteRow) -> Result<DamageCalculation, RepositoryError> {
    let case_id: String = row.try_get("case_id").map_err(decode_error)?;
    let economic_total: String = row.try_get("economic_total").map_err(decode_error)?;
    let non_economic_total: String = row.try_get("non_economic_total").map_err(decode_error)?;
    let grand_total: String = row.try_get("grand_total").map_err(decode_error)?;
    let settlement_analysis_json: Option<String> =
        row.try_get("settlement_analysis_json").map_err(decode_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;

    let settlement_analysis = settlement_analysis_json
        .map(|json| {
            serde_json::from_str::<CaseValuation>(&json).map_err(|error| {
                RepositoryError::Decode(format!(
                    "failed to decode settlement_analysis_json: {error}"
                ))
            })
        })
        .transpose()?;

    Ok(DamageCalculation {
        case_id: CaseId(case_id),
        economic_total: parse_decimal("economic_total", &economic_total)?,
        non_economic_total: parse_decimal("non_economic_total", &non_economic_total)?,
        grand_total: parse_decimal("grand_total", &grand_total)?,
        settlement_analysis,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

#[async_trait::async_trait]
impl DamageCalculationRepository for SqlDamageCalculationRepository {
    async fn fetch(&self, case_id: &CaseId) -> Result<Option<DamageCalculation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT case_id, economic_total, non_economic_total, grand_total,
                    settlement_analysis_json, updated_at
             FROM damage_calculation WHERE case_id = ?",
        )
        .bind(&case_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_calculation).transpose()
    }

    async fn save(&self, calculation: DamageCalculation) -> Result<(), RepositoryError> {
        let settlement_analysis_json = calculation
            .settlement_analysis
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|error| {
                RepositoryError::Decode(format!("failed to encode settlement analysis: {error}"))
            })?;

        sqlx::query(
            "INSERT INTO damage_calculation (case_id, economic_total, non_economic_total,
                                             grand_total, settlement_analysis_json, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(case_id) DO UPDATE SET
                 economic_total = excluded.economic_total,
                 non_economic_total = excluded.non_economic_total,
                 grand_total = excluded.grand_total,
                 settlement_analysis_json = excluded.settlement_analysis_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&calculation.case_id.0)
        .bind(calculation.economic_total.to_string())
        .bind(calculation.non_economic_total.to_string())
        .bind(calculation.grand_total.to_string())
        .bind(settlement_analysis_json)
        .bind(calculation.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

pub struct SqlSettlementHistoryRepository {
    pool: DbPool,
}

impl SqlSettlementHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SettlementHistoryRepository for SqlSettlementHistoryRepository {
    async fn append(&self, entry: SettlementHistoryEntry) -> Result<(), RepositoryError> {
        let valuation_json = serde_json::to_string(&entry.valuation).map_err(|error| {
            RepositoryError::Decode(format!("failed to encode valuation: {error}"))
        })?;

        sqlx::query(
            "INSERT INTO settlement_history (case_id, valuation_json, recorded_at)
             VALUES (?, ?, ?)",
        )
        .bind(&entry.case_id.0)
        .bind(valuation_json)
        .bind(entry.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_by_case(
        &self,
        case_id: &CaseId,
    ) -> Result<Vec<SettlementHistoryEntry>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT case_id, valuation_json, recorded_at
             FROM settlement_history WHERE case_id = ? ORDER BY id ASC",
        )
        .bind(&case_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let case_id: String = row.try_get("case_id").map_err(decode_error)?;
                let valuation_json: String = row.try_get("valuation_json").map_err(decode_error)?;
                let recorded_at: String = row.try_get("recorded_at").map_err(decode_error)?;
                let valuation = serde_json::from_str::<CaseValuation>(&valuation_json)
                    .map_err(|error| {
                        RepositoryError::Decode(format!("failed to decode valuation_json: {error}"))
                    })?;

                Ok(SettlementHistoryEntry {
                    case_id: CaseId(case_id),
                    valuation,
                    recorded_at: parse_timestamp("recorded_at", &recorded_at)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use caseworth_core::domain::case::{CaseId, CaseRecord};
    use caseworth_core::domain::valuation::{
        CaseValuationInput, DamageCalculation, SettlementHistoryEntry,
    };
    use caseworth_core::valuation::compute_local;

    use super::{SqlDamageCalculationRepository, SqlSettlementHistoryRepository};
    use crate::repositories::{
        CaseRecordRepository, DamageCalculationRepository, SettlementHistoryRepository,
        SqlCaseRecordRepository,
    };
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup_with_case(case_id: &str) -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlCaseRecordRepository::new(pool.clone())
            .save(CaseRecord {
                id: CaseId(case_id.to_string()),
                title: "Doe v. Roe".to_string(),
                injury_type: Some("whiplash".to_string()),
                default_multiplier: None,
                policy_limit: None,
                created_at: Utc::now(),
            })
            .await
            .expect("save case");
        pool
    }

    fn sample_input() -> CaseValuationInput {
        CaseValuationInput {
            injury_type: "whiplash".to_string(),
            medical_expenses: Decimal::new(10_000, 0),
            lost_wages: Decimal::new(5_000, 0),
            ..CaseValuationInput::default()
        }
    }

    #[tokio::test]
    async fn snapshot_keeps_settlement_analysis() {
        let pool = setup_with_case("CASE-1").await;
        let repo = SqlDamageCalculationRepository::new(pool);
        let case_id = CaseId("CASE-1".to_string());
        let valuation = compute_local(&sample_input()).for_case(case_id.clone());

        repo.save(DamageCalculation {
            case_id: case_id.clone(),
            economic_total: Decimal::new(15_000, 0),
            non_economic_total: Decimal::ZERO,
            grand_total: Decimal::new(15_000, 0),
            settlement_analysis: Some(valuation.clone()),
            updated_at: Utc::now(),
        })
        .await
        .expect("save snapshot");

        let fetched = repo.fetch(&case_id).await.expect("fetch").expect("snapshot exists");
        assert_eq!(fetched.grand_total, Decimal::new(15_000, 0));
        let analysis = fetched.settlement_analysis.expect("analysis kept");
        assert!(analysis.same_figures(&valuation));
    }

    #[tokio::test]
    async fn history_lists_entries_in_append_order() {
        let pool = setup_with_case("CASE-2").await;
        let repo = SqlSettlementHistoryRepository::new(pool);
        let case_id = CaseId("CASE-2".to_string());

        let first = compute_local(&sample_input()).for_case(case_id.clone());
        let mut second_input = sample_input();
        second_input.custom_multiplier = Some(Decimal::new(4, 0));
        let second = compute_local(&second_input).for_case(case_id.clone());

        for valuation in [first.clone(), second.clone()] {
            repo.append(SettlementHistoryEntry {
                case_id: case_id.clone(),
                valuation,
                recorded_at: Utc::now(),
            })
            .await
            .expect("append");
        }

        let history = repo.list_by_case(&case_id).await.expect("list");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].valuation.multiplier, first.multiplier);
        assert_eq!(history[1].valuation.multiplier, Decimal::new(4, 0));
        assert!(repo.list_by_case(&CaseId("OTHER".to_string())).await.expect("list").is_empty());
    }
}

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use caseworth_agent::{HttpValuationClient, RangeView, ValuationWorkspace, WorkspaceStores};
use caseworth_core::config::AppConfig;
use caseworth_core::damages::{CategoryGroup, CategoryGroupKey, DamageSummary, FormField};
use caseworth_core::domain::case::CaseId;
use caseworth_core::domain::valuation::CaseValuation;
use caseworth_core::errors::ApplicationError;
use caseworth_db::{connect_with_config, migrations};

use crate::commands::{build_runtime, load_config, CommandResult};

#[derive(Debug, Serialize)]
struct AssessReport {
    case_id: String,
    reconciled_fields: Vec<&'static str>,
    damages: DamageSummary,
    groups: Vec<GroupLine>,
    valuation: CaseValuation,
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<RangeView>,
}

#[derive(Debug, Serialize)]
struct GroupLine {
    key: CategoryGroupKey,
    label: &'static str,
    element_count: usize,
    total: Decimal,
}

impl From<CategoryGroup> for GroupLine {
    fn from(group: CategoryGroup) -> Self {
        Self {
            key: group.key,
            label: group.key.label(),
            element_count: group.elements.len(),
            total: group.total,
        }
    }
}

/// Values a stored case end to end: select, optional medical sync,
/// reconciliation, then calculation with the snapshot persisted.
pub fn run(case_id: &str, sync_medical: bool, local_only: bool) -> CommandResult {
    let config = match load_config("assess") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("assess") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    runtime.block_on(async {
        let workspace = match open_workspace(&config, local_only).await {
            Ok(workspace) => workspace,
            Err(failure) => return failure,
        };

        match assess(&workspace, CaseId(case_id.to_string()), sync_medical).await {
            Ok(report) => {
                let message = format!(
                    "case {} valued: realistic recovery {}",
                    report.case_id, report.valuation.realistic_recovery
                );
                CommandResult::success_with_data("assess", message, &report)
            }
            Err(error) => CommandResult::from_application_error("assess", &error),
        }
    })
}

async fn open_workspace(
    config: &AppConfig,
    local_only: bool,
) -> Result<ValuationWorkspace, CommandResult> {
    let pool = connect_with_config(&config.database).await.map_err(|error| {
        CommandResult::failure("assess", "db_connectivity", error.to_string(), 4)
    })?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| CommandResult::failure("assess", "migration", error.to_string(), 5))?;

    let workspace = ValuationWorkspace::new(WorkspaceStores::sqlite(pool));
    if local_only {
        return Ok(workspace);
    }

    match HttpValuationClient::from_config(&config.valuation_service) {
        Ok(Some(client)) => {
            Ok(workspace.with_remote(Arc::new(client), config.valuation_service.timeout()))
        }
        Ok(None) => Ok(workspace),
        Err(error) => Err(CommandResult::failure("assess", "integration", error.to_string(), 9)),
    }
}

async fn assess(
    workspace: &ValuationWorkspace,
    case_id: CaseId,
    sync_medical: bool,
) -> Result<AssessReport, ApplicationError> {
    let mut form = workspace.select_case(&case_id).await?;
    if sync_medical {
        workspace.sync_medical_expenses().await?;
    }

    let reconciled = workspace.reconcile(&mut form).await?;
    let valuation = workspace.calculate(&form).await?;

    Ok(AssessReport {
        case_id: case_id.0,
        reconciled_fields: reconciled.iter().map(FormField::as_str).collect(),
        damages: workspace.damage_summary().await,
        groups: workspace.grouped_elements().await.into_iter().map(GroupLine::from).collect(),
        valuation,
        range: workspace.range_display().await,
    })
}

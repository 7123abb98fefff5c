use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Serialize;
use tracing::warn;

use caseworth_agent::{evaluate_within, HttpValuationClient};
use caseworth_core::config::AppConfig;
use caseworth_core::domain::valuation::{CaseValuation, CaseValuationInput, ValuationSource};
use caseworth_core::errors::{ApplicationError, RemoteServiceError};
use caseworth_core::valuation::{
    compute_local_with_trace, policy_limit_position, synthesize_range, RawValuationInput,
    SettlementRangeDisplay, ValuationPrecondition, ValuationTraceStep,
};

use crate::commands::{build_runtime, load_config, CommandResult};

#[derive(Debug, Serialize)]
struct ValueReport {
    input: CaseValuationInput,
    valuation: CaseValuation,
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<SettlementRangeDisplay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    policy_limit_position: Option<rust_decimal::Decimal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    trace: Vec<ValuationTraceStep>,
}

/// Values a standalone input file (`.json` or `.toml`, `-` for stdin).
pub fn run(input_path: &Path, local_only: bool, trace: bool) -> CommandResult {
    let raw = match read_input(input_path) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure("value", "input", format!("{error:#}"), 6);
        }
    };
    let input = raw.normalize();

    if let Err(error) = ValuationPrecondition::check(&input, rust_decimal::Decimal::ZERO) {
        return CommandResult::from_application_error("value", &ApplicationError::from(error));
    }

    let config = match load_config("value") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let traced = compute_local_with_trace(&input);
    let valuation = if local_only || !config.valuation_service.enabled {
        traced.valuation
    } else {
        let runtime = match build_runtime("value") {
            Ok(runtime) => runtime,
            Err(failure) => return failure,
        };
        match runtime.block_on(value_remotely(&config, &input)) {
            Ok(valuation) => valuation,
            Err(error) => {
                warn!(
                    event_name = "valuation.remote.fallback",
                    reason = error.reason_code(),
                    error = %error,
                    "remote valuation failed; using local formula"
                );
                traced.valuation
            }
        }
    };

    let source = match valuation.source {
        ValuationSource::Local => "local",
        ValuationSource::Remote => "remote",
    };
    let message =
        format!("{source} valuation: realistic recovery {}", valuation.realistic_recovery);

    let range = valuation.settlement_range.map(synthesize_range);
    let report = ValueReport {
        policy_limit_position: range
            .map(|range| policy_limit_position(input.policy_limit, range.high)),
        range,
        trace: if trace { traced.steps } else { Vec::new() },
        input,
        valuation,
    };

    CommandResult::success_with_data("value", message, &report)
}

async fn value_remotely(
    config: &AppConfig,
    input: &CaseValuationInput,
) -> Result<CaseValuation, RemoteServiceError> {
    let client = HttpValuationClient::from_config(&config.valuation_service)?
        .ok_or(RemoteServiceError::Disabled)?;
    evaluate_within(&client, input, config.valuation_service.timeout()).await
}

fn read_input(path: &Path) -> anyhow::Result<RawValuationInput> {
    let raw = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer).context("failed to read stdin")?;
        buffer
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("failed to read input file `{}`", path.display()))?
    };

    if raw.trim().is_empty() {
        bail!("input `{}` is empty", path.display());
    }

    let is_toml = path.extension().and_then(|extension| extension.to_str()) == Some("toml");
    if is_toml {
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse TOML input `{}`", path.display()))
    } else {
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse JSON input `{}`", path.display()))
    }
}

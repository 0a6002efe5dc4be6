use serde::Serialize;
use vidsage_agent::{OpenAiClient, PromptSet};
use vidsage_core::config::{AppConfig, LoadOptions};
use vidsage_db::connect;

use crate::commands::current_thread_runtime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_completion_client(&config));
            checks.push(check_prompt_templates(&config));
            checks.push(check_warehouse_connectivity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["completion_client", "prompt_templates", "warehouse_connectivity"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Builds the client only; no completion is requested.
fn check_completion_client(config: &AppConfig) -> DoctorCheck {
    match OpenAiClient::from_config(&config.llm) {
        Ok(_) => DoctorCheck {
            name: "completion_client",
            status: CheckStatus::Pass,
            details: format!("model `{}` at {}", config.llm.model, config.llm.base_url),
        },
        Err(error) => DoctorCheck {
            name: "completion_client",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_prompt_templates(config: &AppConfig) -> DoctorCheck {
    match PromptSet::from_config(&config.prompts, &config.warehouse) {
        Ok(_) => DoctorCheck {
            name: "prompt_templates",
            status: CheckStatus::Pass,
            details: "query and answer templates render".to_string(),
        },
        Err(error) => DoctorCheck {
            name: "prompt_templates",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_warehouse_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "warehouse_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let warehouse = connect(&config.warehouse)
            .map_err(|error| format!("warehouse is misconfigured: {error}"))?;
        let session = warehouse
            .open()
            .await
            .map_err(|error| format!("failed to open a {} session: {error}", warehouse.provider()))?;
        session
            .close()
            .await
            .map_err(|error| format!("session opened but did not close cleanly: {error}"))?;
        Ok::<&'static str, String>(warehouse.provider())
    });

    match result {
        Ok(provider) => DoctorCheck {
            name: "warehouse_connectivity",
            status: CheckStatus::Pass,
            details: format!("opened and closed a {provider} session"),
        },
        Err(error) => {
            DoctorCheck { name: "warehouse_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

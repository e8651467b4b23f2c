use breezy_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use serde::Serialize;

use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    /// Reported but does not fail the run.
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct DoctorCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub overall_status: CheckStatus,
    pub summary: String,
    pub checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report(LoadOptions::default());
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

pub fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_crm_token(&config));
            checks.push(check_llm_key(&config));
            checks.push(check_catalog(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["crm_token_readiness", "llm_key_readiness", "crm_catalog"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let failed = checks
        .iter()
        .any(|check| matches!(check.status, CheckStatus::Fail | CheckStatus::Skipped));
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_crm_token(config: &AppConfig) -> DoctorCheck {
    let token = config.crm.access_token.expose_secret();
    if token.starts_with("pat-") {
        DoctorCheck {
            name: "crm_token_readiness",
            status: CheckStatus::Pass,
            details: format!("private app token present for {}", config.crm.base_url),
        }
    } else {
        DoctorCheck {
            name: "crm_token_readiness",
            status: CheckStatus::Warn,
            details: "token present but does not look like a private app token (`pat-...`)"
                .to_string(),
        }
    }
}

fn check_llm_key(config: &AppConfig) -> DoctorCheck {
    match &config.llm.api_key {
        Some(_) => DoctorCheck {
            name: "llm_key_readiness",
            status: CheckStatus::Pass,
            details: format!("api key present; model `{}`", config.llm.model),
        },
        None => DoctorCheck {
            name: "llm_key_readiness",
            status: CheckStatus::Warn,
            details: "no api key (GEMINI_API_KEY); opportunity scans will return `Analysis Failed`"
                .to_string(),
        },
    }
}

fn check_catalog(config: &AppConfig) -> DoctorCheck {
    let catalog = &config.catalog;
    DoctorCheck {
        name: "crm_catalog",
        status: CheckStatus::Pass,
        details: format!(
            "hardware pipeline `{}`, subscription pipeline `{}`, device type `{}`",
            catalog.hardware.id, catalog.subscription.id, catalog.device.type_id
        ),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
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

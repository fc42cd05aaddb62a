use std::collections::BTreeMap;

use bidwise_core::config::{AppConfig, LoadOptions};
use bidwise_core::domain::{
    AgencyHistory, BidAnnouncement, BidId, BidType, CompanyProfile, ContractType,
};
use bidwise_core::engine::{BiddingEngine, PipelineState};
use chrono::{Days, Utc};
use serde::Serialize;

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

pub fn run(json_output: bool, options: LoadOptions) -> String {
    let report = build_report(options);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\
                 \"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            match BiddingEngine::new(&config.policy) {
                Ok(engine) => {
                    checks.push(DoctorCheck {
                        name: "engine_policy",
                        status: CheckStatus::Pass,
                        details: format!(
                            "engine built with `{}` strategy",
                            engine.strategy().name()
                        ),
                    });
                    checks.push(check_probe_prediction(&engine));
                }
                Err(error) => {
                    checks.push(DoctorCheck {
                        name: "engine_policy",
                        status: CheckStatus::Fail,
                        details: error.to_string(),
                    });
                    checks.push(skipped("probe_prediction", "engine could not be built"));
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("engine_policy", "configuration did not load"));
            checks.push(skipped("probe_prediction", "configuration did not load"));
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

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: format!("skipped because {reason}"),
    }
}

/// Runs one synthetic announcement through the full pipeline with no history.
fn check_probe_prediction(engine: &BiddingEngine) -> DoctorCheck {
    let deadline = Utc::now().date_naive();
    let bid = BidAnnouncement {
        id: BidId("doctor-probe".to_string()),
        title: "전자유량계 구매".to_string(),
        organization: "조달청".to_string(),
        category: None,
        budget_estimate: 150_000_000,
        deadline: deadline.checked_add_days(Days::new(14)).unwrap_or(deadline),
        contract_type: ContractType::QualificationReview,
        bid_type: BidType::Goods,
        description: None,
        source: None,
        urgent: false,
        required_certifications: Vec::new(),
        outcome: None,
    };
    let profile = CompanyProfile {
        name: "doctor".to_string(),
        credit_rating: "A0".to_string(),
        years_in_business: 10,
        delivery_records: Vec::new(),
        certifications: Vec::new(),
        tech_staff_count: 5,
        agency_history: BTreeMap::new(),
        penalties: Vec::new(),
    };

    match engine.predict(&bid, &profile, &AgencyHistory::default()) {
        Ok(prediction) if prediction.trace.last() == Some(&PipelineState::RecommendationReady) => {
            DoctorCheck {
                name: "probe_prediction",
                status: CheckStatus::Pass,
                details: format!(
                    "probe finished with {} after {} states",
                    prediction.recommendation,
                    prediction.trace.len()
                ),
            }
        }
        Ok(prediction) => DoctorCheck {
            name: "probe_prediction",
            status: CheckStatus::Fail,
            details: format!("probe stopped in {:?}", prediction.trace.last()),
        },
        Err(error) => DoctorCheck {
            name: "probe_prediction",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
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

//! SAM.gov opportunity registry client + multi-code aggregation.
//!
//! The client never surfaces a registry failure to its callers: any network,
//! status, or parse error is logged and replaced by a synthetic fallback
//! notice. The outcome of the most recent call is kept as explicit state for
//! health reporting.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use samscout_core::{
    ExternalOpportunity, NoticeLink, OfficeAddress, PointOfContact,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

pub const CRATE_NAME: &str = "samscout-registry";

/// Classification codes for the target IT-services vertical, in the fixed
/// order aggregation queries them.
pub const IT_SERVICES_NAICS_CODES: [&str; 5] =
    ["541512", "541511", "541513", "541519", "541690"];

#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    pub classification_code: Option<String>,
    pub max_value: Option<f64>,
    pub set_aside: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: std::time::Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.sam.gov/opportunities/v2/search".to_string(),
            api_key: "DEMO_KEY".to_string(),
            timeout: std::time::Duration::from_secs(20),
        }
    }
}

impl RegistryConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("SAM_API_BASE").unwrap_or(defaults.base_url),
            api_key: std::env::var("SAM_API_KEY").unwrap_or(defaults.api_key),
            timeout: std::env::var("SAM_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(std::time::Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry returned {status}: {status_text}")]
    Status { status: u16, status_text: String },
    #[error("registry rate limit exceeded")]
    RateLimited { detail: Option<String> },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("malformed registry response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Outcome of the most recent registry call, readable by the health report.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum RegistryOutcome {
    #[default]
    Unchecked,
    Success {
        count: usize,
        checked_at: DateTime<Utc>,
    },
    RateLimited {
        detail: Option<String>,
        checked_at: DateTime<Utc>,
    },
    Unavailable {
        reason: String,
        checked_at: DateTime<Utc>,
    },
}

impl RegistryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RegistryOutcome::Success { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RegistryOutcome::RateLimited { .. })
    }

    pub fn checked_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RegistryOutcome::Unchecked => None,
            RegistryOutcome::Success { checked_at, .. }
            | RegistryOutcome::RateLimited { checked_at, .. }
            | RegistryOutcome::Unavailable { checked_at, .. } => Some(*checked_at),
        }
    }
}

/// Anything the aggregator can fan a search out over.
#[async_trait]
pub trait OpportunitySource: Send + Sync {
    async fn search_contracts(&self, criteria: &SearchCriteria) -> Vec<ExternalOpportunity>;
}

#[derive(Debug)]
pub struct SamRegistryClient {
    http: reqwest::Client,
    config: RegistryConfig,
    last_outcome: Mutex<RegistryOutcome>,
}

impl SamRegistryClient {
    pub fn new(config: RegistryConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout)
            .build()
            .context("building registry http client")?;
        Ok(Self {
            http,
            config,
            last_outcome: Mutex::new(RegistryOutcome::Unchecked),
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(RegistryConfig::from_env())
    }

    pub async fn last_outcome(&self) -> RegistryOutcome {
        self.last_outcome.lock().await.clone()
    }

    async fn record(&self, outcome: RegistryOutcome) {
        *self.last_outcome.lock().await = outcome;
    }

    /// Search the registry. Never fails: any failure is logged, recorded in
    /// the last-call outcome, and replaced by the synthetic fallback notice.
    pub async fn search_contracts(&self, criteria: &SearchCriteria) -> Vec<ExternalOpportunity> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "registry_search",
            %run_id,
            code = criteria.classification_code.as_deref().unwrap_or("ALL"),
        );

        async {
            match self.try_search(criteria).await {
                Ok(opportunities) => {
                    self.record(RegistryOutcome::Success {
                        count: opportunities.len(),
                        checked_at: Utc::now(),
                    })
                    .await;
                    opportunities
                }
                Err(err) => {
                    warn!(error = %err, "registry search failed; serving fallback fixture");
                    let outcome = match err {
                        RegistryError::RateLimited { detail } => RegistryOutcome::RateLimited {
                            detail,
                            checked_at: Utc::now(),
                        },
                        other => RegistryOutcome::Unavailable {
                            reason: other.to_string(),
                            checked_at: Utc::now(),
                        },
                    };
                    self.record(outcome).await;
                    fallback_opportunities()
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_search(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<ExternalOpportunity>, RegistryError> {
        let posted_to = Utc::now().date_naive();
        let posted_from = posted_to - Duration::days(30);
        let limit = criteria.limit.unwrap_or(10);

        let mut query: Vec<(&str, String)> = vec![
            ("api_key", self.config.api_key.clone()),
            ("postedFrom", posted_from.format("%Y-%m-%d").to_string()),
            ("postedTo", posted_to.format("%Y-%m-%d").to_string()),
            ("limit", limit.to_string()),
            ("offset", "0".to_string()),
        ];
        if let Some(code) = &criteria.classification_code {
            query.push(("ncode", code.clone()));
        }
        if let Some(set_aside) = &criteria.set_aside {
            query.push(("typeOfSetAside", set_aside.clone()));
        }

        let response = self
            .http
            .get(&self.config.base_url)
            .query(&query)
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let detail = response.text().await.ok().filter(|text| !text.is_empty());
            return Err(RegistryError::RateLimited { detail });
        }
        if !status.is_success() {
            return Err(RegistryError::Status {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            });
        }

        let text = response.text().await?;
        let body: SearchResponse = serde_json::from_str(&text)?;
        let mut opportunities = body.opportunities_data.unwrap_or_default();

        if let Some(max_value) = criteria.max_value {
            retain_within_value_cap(&mut opportunities, max_value);
        }

        Ok(opportunities)
    }
}

#[async_trait]
impl OpportunitySource for SamRegistryClient {
    async fn search_contracts(&self, criteria: &SearchCriteria) -> Vec<ExternalOpportunity> {
        SamRegistryClient::search_contracts(self, criteria).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    opportunities_data: Option<Vec<ExternalOpportunity>>,
}

/// Extract a notice's contract value. Precedence: award amount, then
/// estimated value, then base-plus-options value; the first present and
/// parseable field wins. `None` means the value is unknown, not zero.
pub fn extract_contract_value(opportunity: &ExternalOpportunity) -> Option<f64> {
    opportunity
        .award
        .as_ref()
        .and_then(|award| award.amount.as_ref())
        .and_then(parse_currency)
        .or_else(|| {
            opportunity
                .estimated_value
                .as_ref()
                .and_then(parse_currency)
        })
        .or_else(|| {
            opportunity
                .base_and_all_options_value
                .as_ref()
                .and_then(parse_currency)
        })
}

/// Drop every notice whose extracted value is unknown or above the cap.
fn retain_within_value_cap(opportunities: &mut Vec<ExternalOpportunity>, max_value: f64) {
    opportunities.retain(|opp| matches!(extract_contract_value(opp), Some(v) if v <= max_value));
}

fn parse_currency(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(number) => number.as_f64(),
        JsonValue::String(text) => {
            let cleaned = text.trim().trim_start_matches('$').replace(',', "");
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }
}

/// The single synthetic notice served whenever the live registry cannot be
/// reached. Marked as synthetic in its description so downstream imports can
/// flag it as sample data.
pub fn fallback_opportunities() -> Vec<ExternalOpportunity> {
    let now = Utc::now();
    vec![ExternalOpportunity {
        notice_id: "SAM-DEMO-2026-001".into(),
        title: Some("Small Business IT Support Services".into()),
        solicitation_number: Some("W912DY26R0041".into()),
        full_parent_path_name: Some(
            "DEPT OF DEFENSE.DEPT OF THE ARMY.US ARMY CORPS OF ENGINEERS".into(),
        ),
        notice_type: Some("Solicitation".into()),
        type_of_set_aside: Some("SBA".into()),
        type_of_set_aside_description: Some(
            "Total Small Business Set-Aside (FAR 19.5)".into(),
        ),
        award: None,
        estimated_value: None,
        base_and_all_options_value: Some(JsonValue::String("225000".into())),
        naics_code: Some("541512".into()),
        description: Some(
            "SYNTHETIC FALLBACK DATA: help desk, server maintenance, and network \
             administration for a small installation. Served because the live \
             registry was unavailable or rate-limited; configure SAM_API_KEY to \
             receive real notices."
                .into(),
        ),
        posted_date: Some(now.to_rfc3339()),
        response_dead_line: Some((now + Duration::days(30)).to_rfc3339()),
        office_address: Some(OfficeAddress {
            city: Some("Washington".into()),
            state: Some("DC".into()),
        }),
        point_of_contact: vec![PointOfContact {
            contact_type: Some("primary".into()),
            full_name: Some("Contract Specialist".into()),
            email: Some("contracts@example.mil".into()),
            phone: None,
        }],
        links: vec![NoticeLink {
            rel: Some("self".into()),
            href: Some("https://sam.gov/opp/SAM-DEMO-2026-001/view".into()),
        }],
    }]
}

/// Result of fanning one search out across several classification codes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiCodeSearch {
    pub opportunities: Vec<ExternalOpportunity>,
    pub total_unique: usize,
    pub codes_searched: Vec<String>,
}

/// Query `source` once per code, in order, then deduplicate by notice id.
/// On a duplicate the later code's record wins while keeping the earlier
/// record's position (insertion-ordered map semantics).
pub async fn search_across_codes<S: OpportunitySource + ?Sized>(
    source: &S,
    codes: &[&str],
    criteria: &SearchCriteria,
) -> MultiCodeSearch {
    let mut merged: Vec<ExternalOpportunity> = Vec::new();
    let mut slot_by_notice: HashMap<String, usize> = HashMap::new();

    for code in codes {
        let per_code = SearchCriteria {
            classification_code: Some((*code).to_string()),
            ..criteria.clone()
        };
        for opportunity in source.search_contracts(&per_code).await {
            match slot_by_notice.get(&opportunity.notice_id) {
                Some(&slot) => merged[slot] = opportunity,
                None => {
                    slot_by_notice.insert(opportunity.notice_id.clone(), merged.len());
                    merged.push(opportunity);
                }
            }
        }
    }

    MultiCodeSearch {
        total_unique: merged.len(),
        codes_searched: codes.iter().map(|code| code.to_string()).collect(),
        opportunities: merged,
    }
}

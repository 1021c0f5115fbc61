//! Core domain model for SAM small-business lead tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub const CRATE_NAME: &str = "samscout-core";

/// Review lifecycle of a stored lead. Stages only ever advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeStatus {
    #[default]
    Pending,
    Probed,
    ProbedVerbose,
    Live,
}

impl ProbeStatus {
    fn rank(self) -> u8 {
        match self {
            ProbeStatus::Pending => 0,
            ProbeStatus::Probed => 1,
            ProbeStatus::ProbedVerbose => 2,
            ProbeStatus::Live => 3,
        }
    }

    /// Forward-only transition: an advance to an earlier or equal stage is a no-op.
    pub fn advanced_to(self, target: ProbeStatus) -> ProbeStatus {
        if target.rank() > self.rank() {
            target
        } else {
            self
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProbeStatus::Pending => "pending",
            ProbeStatus::Probed => "probed",
            ProbeStatus::ProbedVerbose => "probed-verbose",
            ProbeStatus::Live => "live",
        }
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Awarded or solicited contract attached to a lead. `is_sample`/`is_test`
/// mark synthetic records injected for demos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub contract_number: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: f64,
    pub award_date: DateTime<Utc>,
    pub status: String,
    #[serde(default)]
    pub is_sample: bool,
    #[serde(default)]
    pub is_test: bool,
}

/// Persisted business-registration record. `lead_id` is the immutable
/// business key and is unique across the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub lead_id: String,
    pub company_name: String,
    pub naics_code: String,
    #[serde(default)]
    pub naics_description: Option<String>,
    #[serde(default, rename = "ueiSAM")]
    pub uei_sam: Option<String>,
    #[serde(default)]
    pub cage_code: Option<String>,
    #[serde(default)]
    pub duns: Option<String>,
    #[serde(default)]
    pub address_line1: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub congressional_district: Option<String>,
    #[serde(default)]
    pub business_type: Vec<String>,
    #[serde(default)]
    pub sba_business_type_desc: Vec<String>,
    #[serde(default)]
    pub registration_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub registration_status: Option<String>,
    #[serde(default)]
    pub primary_contact_name: Option<String>,
    #[serde(default)]
    pub primary_contact_email: Option<String>,
    #[serde(default)]
    pub primary_contact_phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub probe_status: ProbeStatus,
    #[serde(default)]
    pub last_probed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub contracts: Vec<Contract>,
}

impl Lead {
    /// Stable field subset served by list and search operations.
    pub fn to_summary(&self) -> LeadSummary {
        LeadSummary {
            lead_id: self.lead_id.clone(),
            company_name: self.company_name.clone(),
            naics_code: self.naics_code.clone(),
            naics_description: self.naics_description.clone(),
            city: self.city.clone(),
            state_code: self.state_code.clone(),
            business_type: self.business_type.clone(),
            registration_status: self.registration_status.clone(),
            probe_status: self.probe_status,
            last_probed: self.last_probed,
            contracts: self.contracts.clone(),
        }
    }
}

/// Projection of a lead for list/search responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSummary {
    pub lead_id: String,
    pub company_name: String,
    pub naics_code: String,
    pub naics_description: Option<String>,
    pub city: Option<String>,
    pub state_code: Option<String>,
    pub business_type: Vec<String>,
    pub registration_status: Option<String>,
    pub probe_status: ProbeStatus,
    pub last_probed: Option<DateTime<Utc>>,
    pub contracts: Vec<Contract>,
}

/// Keyword-search result; `total` always equals `leads.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub total: usize,
    pub leads: Vec<LeadSummary>,
}

/// Transient opportunity record fetched from the external registry.
///
/// The registry serves several historical response shapes; the three
/// monetary fields stay raw JSON (string or number upstream) until value
/// extraction runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalOpportunity {
    pub notice_id: String,
    pub title: Option<String>,
    pub solicitation_number: Option<String>,
    pub full_parent_path_name: Option<String>,
    #[serde(rename = "type")]
    pub notice_type: Option<String>,
    pub type_of_set_aside: Option<String>,
    pub type_of_set_aside_description: Option<String>,
    pub award: Option<AwardBlock>,
    pub estimated_value: Option<JsonValue>,
    pub base_and_all_options_value: Option<JsonValue>,
    pub naics_code: Option<String>,
    pub description: Option<String>,
    pub posted_date: Option<String>,
    pub response_dead_line: Option<String>,
    pub office_address: Option<OfficeAddress>,
    pub point_of_contact: Vec<PointOfContact>,
    pub links: Vec<NoticeLink>,
}

impl ExternalOpportunity {
    pub fn primary_link(&self) -> Option<&str> {
        self.links.first().and_then(|link| link.href.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AwardBlock {
    pub amount: Option<JsonValue>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct OfficeAddress {
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PointOfContact {
    #[serde(rename = "type")]
    pub contact_type: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NoticeLink {
    pub rel: Option<String>,
    pub href: Option<String>,
}

//! Lead lifecycle service: seeding, probe transitions, keyword search, and
//! reconciliation of externally fetched notices into the lead store.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use samscout_core::{
    Contract, ExternalOpportunity, Lead, LeadSummary, ProbeStatus,
};
use samscout_registry::{
    extract_contract_value, search_across_codes, RegistryOutcome, SamRegistryClient,
    SearchCriteria, IT_SERVICES_NAICS_CODES,
};
use samscout_store::{LeadStore, StoreError};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::info;

pub const CRATE_NAME: &str = "samscout-leads";

/// Value ceiling and eligibility filter applied to every registry search the
/// service issues.
const SMALL_BUSINESS_VALUE_CAP: f64 = 250_000.0;
const SMALL_BUSINESS_SET_ASIDE: &str = "SBA";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub lead_id: String,
    pub company_name: String,
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_data: Option<JsonValue>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackResponse {
    pub leads: Vec<LeadSummary>,
    pub script_output: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSearchResponse {
    pub results: Vec<String>,
    pub total: usize,
    pub leads: Vec<LeadSummary>,
}

/// Display mapping of one registry notice.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractView {
    pub notice_id: String,
    pub title: Option<String>,
    pub solicitation_number: Option<String>,
    pub agency: Option<String>,
    #[serde(rename = "type")]
    pub notice_type: Option<String>,
    pub set_aside: Option<String>,
    pub value: Option<f64>,
    pub naics_code: Option<String>,
    pub posted_date: Option<String>,
    pub response_dead_line: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSearchResponse {
    pub success: bool,
    pub message: String,
    pub contracts_found: usize,
    pub contracts: Vec<ContractView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndustrySearchResponse {
    pub success: bool,
    pub message: String,
    pub contracts_found: usize,
    pub naics_codes_searched: Vec<String>,
    pub contracts: Vec<ContractView>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ImportSummary {
    pub considered: usize,
    pub imported: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub naics_codes_searched: Vec<String>,
    pub considered: usize,
    pub imported: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub database: DatabaseHealth,
    pub sam_api: RegistryHealth,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseHealth {
    pub connected: bool,
    pub status: String,
    pub leads: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryHealth {
    pub connected: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check: Option<DateTime<Utc>>,
}

pub struct LeadService {
    store: Arc<LeadStore>,
    registry: Arc<SamRegistryClient>,
}

impl LeadService {
    pub fn new(store: Arc<LeadStore>, registry: Arc<SamRegistryClient>) -> Self {
        Self { store, registry }
    }

    /// Seed an empty store with the demo registration set. A populated
    /// store is left untouched.
    pub async fn seed_if_empty(&self) -> Result<usize> {
        if self.store.count().await > 0 {
            return Ok(0);
        }
        let inserted = self
            .store
            .insert_many(seed_leads())
            .await
            .context("seeding lead store")?;
        info!(inserted, "seeded lead store with demo registrations");
        Ok(inserted)
    }

    pub async fn pack_leads(&self) -> Result<PackResponse> {
        let leads = self.store.find_all().await;
        let script_output = format!("Packed {} leads from database", leads.len());
        Ok(PackResponse {
            leads,
            script_output,
        })
    }

    pub async fn search_leads(&self, term: &str) -> Result<LeadSearchResponse> {
        let found = self.store.search(term).await;
        let results = found
            .leads
            .iter()
            .map(|lead| {
                format!(
                    "{} ({}) - {}: {}, {}",
                    lead.company_name,
                    lead.lead_id,
                    lead.naics_code,
                    opt_text(&lead.city),
                    opt_text(&lead.state_code),
                )
            })
            .collect();
        Ok(LeadSearchResponse {
            results,
            total: found.total,
            leads: found.leads,
        })
    }

    /// Advance a lead to `probed` and return the terse summary. A missing
    /// id yields a successful placeholder result, never an error.
    pub async fn probe(&self, lead_id: &str) -> Result<ProbeResult> {
        match self
            .store
            .advance_probe(lead_id, ProbeStatus::Probed)
            .await
            .context("advancing probe state")?
        {
            None => Ok(not_found_result(lead_id)),
            Some(lead) => Ok(ProbeResult {
                lead_id: lead.lead_id.clone(),
                company_name: lead.company_name.clone(),
                result: render_probe_summary(&lead),
                probe_data: Some(terse_probe_data(&lead)),
                timestamp: Utc::now(),
            }),
        }
    }

    /// Advance a lead to `probed-verbose` and return the full report.
    pub async fn probe_verbose(&self, lead_id: &str) -> Result<ProbeResult> {
        match self
            .store
            .advance_probe(lead_id, ProbeStatus::ProbedVerbose)
            .await
            .context("advancing probe state")?
        {
            None => Ok(not_found_result(lead_id)),
            Some(lead) => Ok(ProbeResult {
                lead_id: lead.lead_id.clone(),
                company_name: lead.company_name.clone(),
                result: render_probe_verbose(&lead),
                probe_data: Some(serde_json::to_value(&lead).context("encoding lead")?),
                timestamp: Utc::now(),
            }),
        }
    }

    /// One uncapped-code live query against the registry, reported as a
    /// structured result. A rate-limited registry produces `success: false`
    /// with the upstream quota detail rather than an error.
    pub async fn test_live_search(&self) -> LiveSearchResponse {
        let criteria = SearchCriteria {
            classification_code: None,
            max_value: Some(SMALL_BUSINESS_VALUE_CAP),
            set_aside: Some(SMALL_BUSINESS_SET_ASIDE.into()),
            limit: Some(5),
        };
        let contracts = self.registry.search_contracts(&criteria).await;
        let views: Vec<ContractView> = contracts.iter().map(contract_view).collect();

        match self.registry.last_outcome().await {
            RegistryOutcome::RateLimited { detail, .. } => LiveSearchResponse {
                success: false,
                message: "SAM.gov rate limit reached; the quota resets upstream. \
                          Showing synthetic demo data until then."
                    .into(),
                contracts_found: views.len(),
                contracts: views,
                rate_limit_detail: detail,
                timestamp: Utc::now(),
            },
            _ => LiveSearchResponse {
                success: true,
                message: "Live registry search - small-business set-aside notices under $250K"
                    .into(),
                contracts_found: views.len(),
                contracts: views,
                rate_limit_detail: None,
                timestamp: Utc::now(),
            },
        }
    }

    /// Fan the standard small-business criteria out across the IT-services
    /// classification codes and report the deduplicated result.
    pub async fn industry_contracts(&self) -> IndustrySearchResponse {
        let criteria = SearchCriteria {
            classification_code: None,
            max_value: Some(SMALL_BUSINESS_VALUE_CAP),
            set_aside: Some(SMALL_BUSINESS_SET_ASIDE.into()),
            limit: Some(10),
        };
        let merged = search_across_codes(
            self.registry.as_ref(),
            &IT_SERVICES_NAICS_CODES,
            &criteria,
        )
        .await;
        IndustrySearchResponse {
            success: true,
            message: "North Dakota IT contracts - under $250K with Small Business Set-Aside"
                .into(),
            contracts_found: merged.total_unique,
            naics_codes_searched: merged.codes_searched,
            contracts: merged.opportunities.iter().map(contract_view).collect(),
            timestamp: Utc::now(),
        }
    }

    /// Import externally fetched notices as new pending leads. Existing
    /// `lead_id`s are skipped via the store's duplicate reject; candidates
    /// with a blank notice id are counted but never inserted.
    pub async fn import_opportunities(
        &self,
        candidates: &[ExternalOpportunity],
    ) -> Result<ImportSummary> {
        let mut imported = 0;
        for candidate in candidates {
            if candidate.notice_id.is_empty() {
                continue;
            }
            match self.store.insert_new(lead_from_opportunity(candidate)).await {
                Ok(()) => imported += 1,
                Err(StoreError::DuplicateLeadId(_)) => {}
                Err(other) => return Err(other).context("importing lead"),
            }
        }
        Ok(ImportSummary {
            considered: candidates.len(),
            imported,
        })
    }

    /// Aggregate across the fixed code set, then import the result.
    pub async fn reconcile_from_registry(&self) -> Result<ReconcileReport> {
        let criteria = SearchCriteria {
            classification_code: None,
            max_value: Some(SMALL_BUSINESS_VALUE_CAP),
            set_aside: Some(SMALL_BUSINESS_SET_ASIDE.into()),
            limit: Some(10),
        };
        let merged = search_across_codes(
            self.registry.as_ref(),
            &IT_SERVICES_NAICS_CODES,
            &criteria,
        )
        .await;
        let summary = self.import_opportunities(&merged.opportunities).await?;
        info!(
            considered = summary.considered,
            imported = summary.imported,
            "reconciled registry notices into lead store"
        );
        Ok(ReconcileReport {
            naics_codes_searched: merged.codes_searched,
            considered: summary.considered,
            imported: summary.imported,
            timestamp: Utc::now(),
        })
    }

    /// Liveness snapshot for the polling collaborator: store reachability
    /// plus the registry's last-call outcome.
    pub async fn health(&self) -> HealthReport {
        let leads = self.store.count().await;
        let outcome = self.registry.last_outcome().await;
        let sam_status = match &outcome {
            RegistryOutcome::Unchecked => "unchecked".to_string(),
            RegistryOutcome::Success { count, .. } => {
                format!("ok ({count} notices on last search)")
            }
            RegistryOutcome::RateLimited { .. } => "rate-limited".to_string(),
            RegistryOutcome::Unavailable { reason, .. } => format!("unavailable: {reason}"),
        };
        HealthReport {
            status: "ok".into(),
            database: DatabaseHealth {
                connected: true,
                status: "ok".into(),
                leads,
            },
            sam_api: RegistryHealth {
                connected: outcome.is_success(),
                status: sam_status,
                last_check: outcome.checked_at(),
            },
            timestamp: Utc::now(),
        }
    }
}

/// Build the fully wired service from the environment: snapshot-backed store
/// when `LEADS_SNAPSHOT_PATH` is set, in-memory otherwise, seeded on start.
pub async fn service_from_env() -> Result<Arc<LeadService>> {
    let store = match std::env::var("LEADS_SNAPSHOT_PATH") {
        Ok(path) => LeadStore::open(path).await.context("opening lead store")?,
        Err(_) => LeadStore::in_memory(),
    };
    let registry = SamRegistryClient::from_env().context("building registry client")?;
    let service = Arc::new(LeadService::new(Arc::new(store), Arc::new(registry)));
    service.seed_if_empty().await?;
    Ok(service)
}

fn not_found_result(lead_id: &str) -> ProbeResult {
    ProbeResult {
        lead_id: lead_id.to_string(),
        company_name: "Unknown".into(),
        result: format!("Lead {lead_id} not found in database"),
        probe_data: None,
        timestamp: Utc::now(),
    }
}

fn contract_view(opportunity: &ExternalOpportunity) -> ContractView {
    ContractView {
        notice_id: opportunity.notice_id.clone(),
        title: opportunity.title.clone(),
        solicitation_number: opportunity.solicitation_number.clone(),
        agency: opportunity.full_parent_path_name.clone(),
        notice_type: opportunity.notice_type.clone(),
        set_aside: opportunity.type_of_set_aside_description.clone(),
        value: extract_contract_value(opportunity),
        naics_code: opportunity.naics_code.clone(),
        posted_date: opportunity.posted_date.clone(),
        response_dead_line: opportunity.response_dead_line.clone(),
        link: opportunity.primary_link().map(ToString::to_string),
    }
}

/// Map a registry notice onto a new pending lead. The issuing agency path is
/// the only organization name an unawarded notice carries, so it becomes the
/// company line; the notice itself becomes the lead's first contract record.
pub fn lead_from_opportunity(opportunity: &ExternalOpportunity) -> Lead {
    let is_sample = opportunity
        .description
        .as_deref()
        .map(|text| text.contains("SYNTHETIC"))
        .unwrap_or(false);
    let contract = Contract {
        contract_number: opportunity
            .solicitation_number
            .clone()
            .unwrap_or_else(|| opportunity.notice_id.clone()),
        title: opportunity
            .title
            .clone()
            .unwrap_or_else(|| "Untitled notice".into()),
        description: opportunity.description.clone(),
        value: extract_contract_value(opportunity).unwrap_or(0.0),
        award_date: opportunity
            .posted_date
            .as_deref()
            .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
            .map(|parsed| parsed.with_timezone(&Utc))
            .unwrap_or_else(Utc::now),
        status: opportunity
            .notice_type
            .clone()
            .unwrap_or_else(|| "Solicitation".into()),
        is_sample,
        is_test: false,
    };
    let contact = opportunity.point_of_contact.first();

    Lead {
        lead_id: opportunity.notice_id.clone(),
        company_name: opportunity
            .full_parent_path_name
            .clone()
            .or_else(|| opportunity.title.clone())
            .unwrap_or_else(|| "Unknown".into()),
        naics_code: opportunity.naics_code.clone().unwrap_or_default(),
        naics_description: None,
        uei_sam: None,
        cage_code: None,
        duns: None,
        address_line1: None,
        city: opportunity
            .office_address
            .as_ref()
            .and_then(|address| address.city.clone()),
        state_code: opportunity
            .office_address
            .as_ref()
            .and_then(|address| address.state.clone()),
        zip_code: None,
        congressional_district: None,
        business_type: vec![],
        sba_business_type_desc: vec![],
        registration_date: None,
        expiration_date: None,
        registration_status: None,
        primary_contact_name: contact.and_then(|c| c.full_name.clone()),
        primary_contact_email: contact.and_then(|c| c.email.clone()),
        primary_contact_phone: contact.and_then(|c| c.phone.clone()),
        website: opportunity.primary_link().map(ToString::to_string),
        probe_status: ProbeStatus::Pending,
        last_probed: None,
        contracts: vec![contract],
    }
}

/// Terse probe summary: five fixed lines over the registration record.
pub fn render_probe_summary(lead: &Lead) -> String {
    format!(
        "Company: {company}\nNAICS: {naics} - {naics_desc}\nLocation: {city}, {state}\nStatus: {status}\nBusiness Types: {business_types}",
        company = lead.company_name,
        naics = lead.naics_code,
        naics_desc = opt_text(&lead.naics_description),
        city = opt_text(&lead.city),
        state = opt_text(&lead.state_code),
        status = opt_text(&lead.registration_status),
        business_types = lead.sba_business_type_desc.join(", "),
    )
}

/// Verbose probe report: fixed sections, every field interpolated as-is.
/// Absent fields render as the empty token rather than being omitted.
pub fn render_probe_verbose(lead: &Lead) -> String {
    format!(
        "=== SAM.gov Entity Details ===\n\
         Lead ID: {lead_id}\n\
         Company Name: {company}\n\
         UEI SAM: {uei}\n\
         CAGE Code: {cage}\n\
         DUNS: {duns}\n\
         \n\
         === NAICS Information ===\n\
         Primary NAICS: {naics}\n\
         Description: {naics_desc}\n\
         \n\
         === Location ===\n\
         Address: {address}\n\
         City: {city}, {state} {zip}\n\
         Congressional District: {district}\n\
         \n\
         === Registration ===\n\
         Status: {reg_status}\n\
         Registration Date: {reg_date}\n\
         Expiration Date: {exp_date}\n\
         \n\
         === Business Classifications ===\n\
         Business Types: {business_types}\n\
         SBA Certifications: {sba_types}\n\
         \n\
         === Contact Information ===\n\
         Primary Contact: {contact_name}\n\
         Email: {contact_email}\n\
         Phone: {contact_phone}\n\
         Website: {website}\n\
         \n\
         === Probe History ===\n\
         Last Probed: {last_probed}\n\
         Probe Status: {probe_status}",
        lead_id = lead.lead_id,
        company = lead.company_name,
        uei = opt_text(&lead.uei_sam),
        cage = opt_text(&lead.cage_code),
        duns = opt_text(&lead.duns),
        naics = lead.naics_code,
        naics_desc = opt_text(&lead.naics_description),
        address = opt_text(&lead.address_line1),
        city = opt_text(&lead.city),
        state = opt_text(&lead.state_code),
        zip = opt_text(&lead.zip_code),
        district = opt_text(&lead.congressional_district),
        reg_status = opt_text(&lead.registration_status),
        reg_date = date_text(&lead.registration_date),
        exp_date = date_text(&lead.expiration_date),
        business_types = lead.business_type.join(", "),
        sba_types = lead.sba_business_type_desc.join(", "),
        contact_name = opt_text(&lead.primary_contact_name),
        contact_email = opt_text(&lead.primary_contact_email),
        contact_phone = opt_text(&lead.primary_contact_phone),
        website = opt_text(&lead.website),
        last_probed = datetime_text(&lead.last_probed),
        probe_status = lead.probe_status,
    )
}

fn terse_probe_data(lead: &Lead) -> JsonValue {
    json!({
        "ueiSAM": lead.uei_sam,
        "cageCode": lead.cage_code,
        "address": lead.address_line1,
        "contact": {
            "name": lead.primary_contact_name,
            "email": lead.primary_contact_email,
            "phone": lead.primary_contact_phone,
        },
        "website": lead.website,
    })
}

fn opt_text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn date_text(value: &Option<DateTime<Utc>>) -> String {
    value
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn datetime_text(value: &Option<DateTime<Utc>>) -> String {
    value
        .map(|date| date.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default()
}

/// Demo registration set installed on first run: five North Dakota
/// IT-services registrations with deterministic field values.
pub fn seed_leads() -> Vec<Lead> {
    vec![
        Lead {
            lead_id: "NDIT-0001".into(),
            company_name: "Prairie Byte Solutions".into(),
            naics_code: "541512".into(),
            naics_description: Some("Computer Systems Design Services".into()),
            uei_sam: Some("PB1XZQ4T7L55".into()),
            cage_code: Some("8KD21".into()),
            duns: Some("080451297".into()),
            address_line1: Some("401 Broadway N".into()),
            city: Some("Fargo".into()),
            state_code: Some("ND".into()),
            zip_code: Some("58102".into()),
            congressional_district: Some("ND-00".into()),
            business_type: vec!["For Profit Organization".into()],
            sba_business_type_desc: vec![
                "Small Business".into(),
                "Veteran-Owned Small Business".into(),
            ],
            registration_date: Some(seed_date(2019, 3, 14)),
            expiration_date: Some(seed_date(2026, 3, 14)),
            registration_status: Some("Active".into()),
            primary_contact_name: Some("Dana Kjellberg".into()),
            primary_contact_email: Some("dana@prairiebyte.example.com".into()),
            primary_contact_phone: Some("701-555-0142".into()),
            website: Some("https://prairiebyte.example.com".into()),
            probe_status: ProbeStatus::Pending,
            last_probed: None,
            contracts: vec![Contract {
                contract_number: "W912DY21C0087".into(),
                title: "Installation Help Desk Support".into(),
                description: Some("Tier 1/2 help desk for a regional installation".into()),
                value: 187_500.0,
                award_date: seed_date(2021, 9, 30),
                status: "Completed".into(),
                is_sample: true,
                is_test: false,
            }],
        },
        Lead {
            lead_id: "NDIT-0002".into(),
            company_name: "Red River Data Systems".into(),
            naics_code: "541511".into(),
            naics_description: Some("Custom Computer Programming Services".into()),
            uei_sam: Some("RR7MK2H9WD33".into()),
            cage_code: Some("7QX94".into()),
            duns: Some("080623145".into()),
            address_line1: Some("2750 S Columbia Rd".into()),
            city: Some("Grand Forks".into()),
            state_code: Some("ND".into()),
            zip_code: Some("58201".into()),
            congressional_district: Some("ND-00".into()),
            business_type: vec!["For Profit Organization".into()],
            sba_business_type_desc: vec!["Small Business".into()],
            registration_date: Some(seed_date(2020, 7, 2)),
            expiration_date: Some(seed_date(2026, 7, 2)),
            registration_status: Some("Active".into()),
            primary_contact_name: Some("Marcus Vollan".into()),
            primary_contact_email: Some("mvollan@redriverdata.example.com".into()),
            primary_contact_phone: Some("701-555-0178".into()),
            website: Some("https://redriverdata.example.com".into()),
            probe_status: ProbeStatus::Pending,
            last_probed: None,
            contracts: vec![],
        },
        Lead {
            lead_id: "NDIT-0003".into(),
            company_name: "Bison Creek Software".into(),
            naics_code: "541511".into(),
            naics_description: Some("Custom Computer Programming Services".into()),
            uei_sam: Some("BC4TN8P2QF66".into()),
            cage_code: Some("6WJ38".into()),
            duns: Some("080718234".into()),
            address_line1: Some("1120 E Main Ave".into()),
            city: Some("Bismarck".into()),
            state_code: Some("ND".into()),
            zip_code: Some("58501".into()),
            congressional_district: Some("ND-00".into()),
            business_type: vec!["For Profit Organization".into()],
            sba_business_type_desc: vec![
                "Small Business".into(),
                "Woman-Owned Small Business".into(),
            ],
            registration_date: Some(seed_date(2018, 11, 20)),
            expiration_date: Some(seed_date(2025, 11, 20)),
            registration_status: Some("Active".into()),
            primary_contact_name: Some("Elin Sorum".into()),
            primary_contact_email: Some("elin@bisoncreek.example.com".into()),
            primary_contact_phone: Some("701-555-0113".into()),
            website: Some("https://bisoncreek.example.com".into()),
            probe_status: ProbeStatus::Pending,
            last_probed: None,
            contracts: vec![Contract {
                contract_number: "GS35F0119X".into(),
                title: "State Portal Modernization".into(),
                description: None,
                value: 94_000.0,
                award_date: seed_date(2022, 4, 18),
                status: "Active".into(),
                is_sample: true,
                is_test: true,
            }],
        },
        Lead {
            lead_id: "NDIT-0004".into(),
            company_name: "Northern Plains Cyber".into(),
            naics_code: "541690".into(),
            naics_description: Some(
                "Other Scientific and Technical Consulting Services".into(),
            ),
            uei_sam: Some("NP9RL5V1KA22".into()),
            cage_code: Some("5TY67".into()),
            duns: Some("080834412".into()),
            address_line1: Some("315 Main St S".into()),
            city: Some("Minot".into()),
            state_code: Some("ND".into()),
            zip_code: Some("58701".into()),
            congressional_district: Some("ND-00".into()),
            business_type: vec!["For Profit Organization".into()],
            sba_business_type_desc: vec![
                "Small Business".into(),
                "Service-Disabled Veteran-Owned Small Business".into(),
            ],
            registration_date: Some(seed_date(2021, 1, 8)),
            expiration_date: Some(seed_date(2027, 1, 8)),
            registration_status: Some("Active".into()),
            primary_contact_name: Some("Joel Haugen".into()),
            primary_contact_email: Some("jhaugen@npcyber.example.com".into()),
            primary_contact_phone: Some("701-555-0196".into()),
            website: Some("https://npcyber.example.com".into()),
            probe_status: ProbeStatus::Pending,
            last_probed: None,
            contracts: vec![],
        },
        Lead {
            lead_id: "NDIT-0005".into(),
            company_name: "Sheyenne Valley Networks".into(),
            naics_code: "541519".into(),
            naics_description: Some("Other Computer Related Services".into()),
            uei_sam: Some("SV2QW7J4MB88".into()),
            cage_code: Some("4HN52".into()),
            duns: Some("080912573".into()),
            address_line1: Some("845 Sheyenne St".into()),
            city: Some("West Fargo".into()),
            state_code: Some("ND".into()),
            zip_code: Some("58078".into()),
            congressional_district: Some("ND-00".into()),
            business_type: vec!["For Profit Organization".into()],
            sba_business_type_desc: vec!["Small Business".into(), "HUBZone".into()],
            registration_date: Some(seed_date(2017, 6, 27)),
            expiration_date: Some(seed_date(2026, 6, 27)),
            registration_status: Some("Expiring".into()),
            primary_contact_name: Some("Renata Lindqvist".into()),
            primary_contact_email: Some("renata@sheyennevalley.example.com".into()),
            primary_contact_phone: Some("701-555-0124".into()),
            website: None,
            probe_status: ProbeStatus::Pending,
            last_probed: None,
            contracts: vec![],
        },
    ]
}

fn seed_date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("seed dates are valid calendar dates")
}

#[cfg(test)]
mod tests {
    use super::*;
    use samscout_registry::{fallback_opportunities, RegistryConfig};

    fn unreachable_registry() -> Arc<SamRegistryClient> {
        Arc::new(
            SamRegistryClient::new(RegistryConfig {
                base_url: "http://127.0.0.1:9/opportunities/v2/search".into(),
                api_key: "DEMO_KEY".into(),
                timeout: std::time::Duration::from_secs(2),
            })
            .unwrap(),
        )
    }

    async fn seeded_service() -> LeadService {
        let service = LeadService::new(Arc::new(LeadStore::in_memory()), unreachable_registry());
        service.seed_if_empty().await.unwrap();
        service
    }

    fn probed_lead() -> Lead {
        let mut lead = seed_leads().remove(0);
        lead.probe_status = ProbeStatus::ProbedVerbose;
        lead.last_probed = Some(seed_date(2026, 2, 24) + chrono::Duration::hours(15));
        lead
    }

    #[tokio::test]
    async fn seeding_is_a_no_op_on_a_populated_store() {
        let service = seeded_service().await;
        let before = service.pack_leads().await.unwrap().leads.len();
        assert_eq!(before, 5);
        let reseeded = service.seed_if_empty().await.unwrap();
        assert_eq!(reseeded, 0);
        assert_eq!(service.pack_leads().await.unwrap().leads.len(), before);
    }

    #[tokio::test]
    async fn pack_reports_the_script_output_line() {
        let service = seeded_service().await;
        let pack = service.pack_leads().await.unwrap();
        assert_eq!(pack.script_output, "Packed 5 leads from database");
    }

    #[tokio::test]
    async fn probe_on_missing_lead_is_a_successful_placeholder() {
        let service = seeded_service().await;
        let result = service.probe("GHOST-404").await.unwrap();
        assert_eq!(result.lead_id, "GHOST-404");
        assert_eq!(result.company_name, "Unknown");
        assert_eq!(result.result, "Lead GHOST-404 not found in database");
        assert!(result.probe_data.is_none());
        // No record was created for the unknown id.
        let pack = service.pack_leads().await.unwrap();
        assert!(!pack.leads.iter().any(|lead| lead.lead_id == "GHOST-404"));
    }

    #[tokio::test]
    async fn probe_advances_status_and_strictly_bumps_last_probed() {
        let service = seeded_service().await;

        let first = service.probe("NDIT-0001").await.unwrap();
        assert_eq!(first.company_name, "Prairie Byte Solutions");
        let after_first = service
            .search_leads("Prairie Byte")
            .await
            .unwrap()
            .leads
            .remove(0);
        assert_eq!(after_first.probe_status, ProbeStatus::Probed);
        let first_probed = after_first.last_probed.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        service.probe_verbose("NDIT-0001").await.unwrap();
        let after_verbose = service
            .search_leads("Prairie Byte")
            .await
            .unwrap()
            .leads
            .remove(0);
        assert_eq!(after_verbose.probe_status, ProbeStatus::ProbedVerbose);
        assert!(after_verbose.last_probed.unwrap() > first_probed);

        // A later terse probe does not regress the verbose stage.
        service.probe("NDIT-0001").await.unwrap();
        let after_reprobe = service
            .search_leads("Prairie Byte")
            .await
            .unwrap()
            .leads
            .remove(0);
        assert_eq!(after_reprobe.probe_status, ProbeStatus::ProbedVerbose);
    }

    #[tokio::test]
    async fn search_formats_result_lines_and_counts() {
        let service = seeded_service().await;
        let found = service.search_leads("54151").await.unwrap();
        assert_eq!(found.total, found.leads.len());
        assert!(found.total >= 3);
        assert!(found
            .results
            .iter()
            .any(|line| line == "Prairie Byte Solutions (NDIT-0001) - 541512: Fargo, ND"));

        let none = service.search_leads("zzz-no-match").await.unwrap();
        assert_eq!(none.total, 0);
        assert!(none.leads.is_empty());
        assert!(none.results.is_empty());
    }

    #[tokio::test]
    async fn import_skips_existing_and_is_idempotent() {
        let service = seeded_service().await;
        let candidates = fallback_opportunities();

        let first = service.import_opportunities(&candidates).await.unwrap();
        assert_eq!(first.considered, 1);
        assert_eq!(first.imported, 1);

        let second = service.import_opportunities(&candidates).await.unwrap();
        assert_eq!(second.imported, 0);

        let pack = service.pack_leads().await.unwrap();
        let imported: Vec<_> = pack
            .leads
            .iter()
            .filter(|lead| lead.lead_id == "SAM-DEMO-2026-001")
            .collect();
        assert_eq!(imported.len(), 1);
        // The synthetic marker survives into the contract sub-record.
        assert!(imported[0].contracts[0].is_sample);
        assert_eq!(imported[0].probe_status, ProbeStatus::Pending);
    }

    #[tokio::test]
    async fn reconcile_runs_aggregation_then_import() {
        let service = seeded_service().await;
        // Every per-code call falls back to the same synthetic notice, so
        // the aggregate dedups to one candidate and imports it once.
        let report = service.reconcile_from_registry().await.unwrap();
        assert_eq!(report.naics_codes_searched.len(), 5);
        assert_eq!(report.considered, 1);
        assert_eq!(report.imported, 1);

        let again = service.reconcile_from_registry().await.unwrap();
        assert_eq!(again.imported, 0);
    }

    #[tokio::test]
    async fn test_live_search_stays_successful_on_fallback() {
        let service = seeded_service().await;
        let live = service.test_live_search().await;
        assert!(live.success);
        assert_eq!(live.contracts_found, 1);
        assert_eq!(live.contracts[0].notice_id, "SAM-DEMO-2026-001");
        assert_eq!(live.contracts[0].value, Some(225000.0));
        assert!(live.rate_limit_detail.is_none());
    }

    #[tokio::test]
    async fn health_reports_store_count_and_registry_outcome() {
        let service = seeded_service().await;
        let before = service.health().await;
        assert_eq!(before.status, "ok");
        assert_eq!(before.database.leads, 5);
        assert!(!before.sam_api.connected);
        assert_eq!(before.sam_api.status, "unchecked");
        assert!(before.sam_api.last_check.is_none());

        service.test_live_search().await;
        let after = service.health().await;
        assert!(!after.sam_api.connected);
        assert!(after.sam_api.status.starts_with("unavailable:"));
        assert!(after.sam_api.last_check.is_some());
    }

    #[test]
    fn terse_summary_matches_the_fixed_format() {
        let lead = probed_lead();
        assert_eq!(
            render_probe_summary(&lead),
            "Company: Prairie Byte Solutions\n\
             NAICS: 541512 - Computer Systems Design Services\n\
             Location: Fargo, ND\n\
             Status: Active\n\
             Business Types: Small Business, Veteran-Owned Small Business"
        );
    }

    #[test]
    fn verbose_report_matches_the_fixed_sections() {
        let lead = probed_lead();
        let expected = "=== SAM.gov Entity Details ===\n\
             Lead ID: NDIT-0001\n\
             Company Name: Prairie Byte Solutions\n\
             UEI SAM: PB1XZQ4T7L55\n\
             CAGE Code: 8KD21\n\
             DUNS: 080451297\n\
             \n\
             === NAICS Information ===\n\
             Primary NAICS: 541512\n\
             Description: Computer Systems Design Services\n\
             \n\
             === Location ===\n\
             Address: 401 Broadway N\n\
             City: Fargo, ND 58102\n\
             Congressional District: ND-00\n\
             \n\
             === Registration ===\n\
             Status: Active\n\
             Registration Date: 2019-03-14\n\
             Expiration Date: 2026-03-14\n\
             \n\
             === Business Classifications ===\n\
             Business Types: For Profit Organization\n\
             SBA Certifications: Small Business, Veteran-Owned Small Business\n\
             \n\
             === Contact Information ===\n\
             Primary Contact: Dana Kjellberg\n\
             Email: dana@prairiebyte.example.com\n\
             Phone: 701-555-0142\n\
             Website: https://prairiebyte.example.com\n\
             \n\
             === Probe History ===\n\
             Last Probed: 2026-02-24 15:00:00 UTC\n\
             Probe Status: probed-verbose";
        assert_eq!(render_probe_verbose(&lead), expected);
    }

    #[test]
    fn absent_fields_render_as_the_empty_token() {
        let mut lead = probed_lead();
        lead.naics_description = None;
        lead.city = None;
        lead.state_code = None;
        lead.registration_status = None;
        lead.sba_business_type_desc = vec![];
        assert_eq!(
            render_probe_summary(&lead),
            "Company: Prairie Byte Solutions\n\
             NAICS: 541512 - \n\
             Location: , \n\
             Status: \n\
             Business Types: "
        );
    }

    #[test]
    fn imported_lead_takes_agency_contact_and_link() {
        let candidate = fallback_opportunities().remove(0);
        let lead = lead_from_opportunity(&candidate);
        assert_eq!(lead.lead_id, "SAM-DEMO-2026-001");
        assert_eq!(
            lead.company_name,
            "DEPT OF DEFENSE.DEPT OF THE ARMY.US ARMY CORPS OF ENGINEERS"
        );
        assert_eq!(lead.naics_code, "541512");
        assert_eq!(lead.city.as_deref(), Some("Washington"));
        assert_eq!(lead.state_code.as_deref(), Some("DC"));
        assert_eq!(lead.primary_contact_name.as_deref(), Some("Contract Specialist"));
        assert_eq!(
            lead.website.as_deref(),
            Some("https://sam.gov/opp/SAM-DEMO-2026-001/view")
        );
        assert_eq!(lead.contracts.len(), 1);
        assert_eq!(lead.contracts[0].value, 225000.0);
        assert!(lead.contracts[0].is_sample);
    }
}

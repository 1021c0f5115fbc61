//! Persisted lead collection with field-projected queries.
//!
//! The store is an in-memory document map keyed by `lead_id`, optionally
//! mirrored to a JSON snapshot file. Snapshot writes go through a temp file
//! and an atomic rename.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use samscout_core::{Lead, LeadSummary, ProbeStatus, SearchResult};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

pub const CRATE_NAME: &str = "samscout-store";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lead {0} already exists")]
    DuplicateLeadId(String),
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct LeadStore {
    leads: RwLock<BTreeMap<String, Lead>>,
    snapshot_path: Option<PathBuf>,
}

impl LeadStore {
    /// Volatile store with no snapshot file.
    pub fn in_memory() -> Self {
        Self {
            leads: RwLock::new(BTreeMap::new()),
            snapshot_path: None,
        }
    }

    /// Open a snapshot-backed store, loading any existing snapshot.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let leads = if fs::try_exists(&path).await? {
            let text = fs::read_to_string(&path).await?;
            let loaded: Vec<Lead> = serde_json::from_str(&text)?;
            debug!(count = loaded.len(), path = %path.display(), "loaded lead snapshot");
            loaded
                .into_iter()
                .map(|lead| (lead.lead_id.clone(), lead))
                .collect()
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            leads: RwLock::new(leads),
            snapshot_path: Some(path),
        })
    }

    pub async fn count(&self) -> usize {
        self.leads.read().await.len()
    }

    /// Insert a brand-new lead. A duplicate `lead_id` is rejected, never
    /// overwritten.
    pub async fn insert_new(&self, lead: Lead) -> Result<(), StoreError> {
        let mut guard = self.leads.write().await;
        if guard.contains_key(&lead.lead_id) {
            return Err(StoreError::DuplicateLeadId(lead.lead_id));
        }
        guard.insert(lead.lead_id.clone(), lead);
        self.persist(&guard).await
    }

    /// Bulk insert for seeding: one lock, one snapshot write.
    pub async fn insert_many(&self, leads: Vec<Lead>) -> Result<usize, StoreError> {
        let mut guard = self.leads.write().await;
        let mut inserted = 0;
        for lead in leads {
            if guard.contains_key(&lead.lead_id) {
                return Err(StoreError::DuplicateLeadId(lead.lead_id));
            }
            guard.insert(lead.lead_id.clone(), lead);
            inserted += 1;
        }
        self.persist(&guard).await?;
        Ok(inserted)
    }

    pub async fn find_all(&self) -> Vec<LeadSummary> {
        self.leads
            .read()
            .await
            .values()
            .map(Lead::to_summary)
            .collect()
    }

    pub async fn find_by_lead_id(&self, lead_id: &str) -> Option<Lead> {
        self.leads.read().await.get(lead_id).cloned()
    }

    /// Case-insensitive substring match over company name, classification
    /// code and description, city, and state code, OR-combined.
    pub async fn search(&self, term: &str) -> SearchResult {
        let needle = term.to_lowercase();
        let leads: Vec<LeadSummary> = self
            .leads
            .read()
            .await
            .values()
            .filter(|lead| {
                contains(&lead.company_name, &needle)
                    || contains(&lead.naics_code, &needle)
                    || opt_contains(&lead.naics_description, &needle)
                    || opt_contains(&lead.city, &needle)
                    || opt_contains(&lead.state_code, &needle)
            })
            .map(Lead::to_summary)
            .collect();
        SearchResult {
            total: leads.len(),
            leads,
        }
    }

    /// Advance a lead's probe stage and stamp `last_probed`, as one
    /// read-modify-write under the write lock. Returns the updated lead,
    /// or `None` when the id is unknown (never an error).
    pub async fn advance_probe(
        &self,
        lead_id: &str,
        stage: ProbeStatus,
    ) -> Result<Option<Lead>, StoreError> {
        let mut guard = self.leads.write().await;
        let Some(lead) = guard.get_mut(lead_id) else {
            return Ok(None);
        };
        lead.probe_status = lead.probe_status.advanced_to(stage);
        lead.last_probed = Some(Utc::now());
        let updated = lead.clone();
        self.persist(&guard).await?;
        Ok(Some(updated))
    }

    async fn persist(&self, guard: &BTreeMap<String, Lead>) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let leads: Vec<&Lead> = guard.values().collect();
        let bytes = serde_json::to_vec_pretty(&leads)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = path.with_file_name(format!(".{}.tmp", Uuid::new_v4()));
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        match fs::rename(&temp_path, path).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = fs::remove_file(&temp_path).await;
                Err(err.into())
            }
        }
    }
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn opt_contains(haystack: &Option<String>, needle: &str) -> bool {
    haystack
        .as_deref()
        .map(|value| value.to_lowercase().contains(needle))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn lead(lead_id: &str, company: &str, naics: &str, city: &str, state: &str) -> Lead {
        Lead {
            lead_id: lead_id.into(),
            company_name: company.into(),
            naics_code: naics.into(),
            naics_description: Some("Computer Systems Design Services".into()),
            uei_sam: None,
            cage_code: None,
            duns: None,
            address_line1: None,
            city: Some(city.into()),
            state_code: Some(state.into()),
            zip_code: None,
            congressional_district: None,
            business_type: vec![],
            sba_business_type_desc: vec![],
            registration_date: None,
            expiration_date: None,
            registration_status: Some("Active".into()),
            primary_contact_name: None,
            primary_contact_email: None,
            primary_contact_phone: None,
            website: None,
            probe_status: ProbeStatus::Pending,
            last_probed: None,
            contracts: vec![],
        }
    }

    #[tokio::test]
    async fn duplicate_lead_id_is_rejected() {
        let store = LeadStore::in_memory();
        store
            .insert_new(lead("L-1", "Acme", "541512", "Fargo", "ND"))
            .await
            .unwrap();
        let err = store
            .insert_new(lead("L-1", "Acme Again", "541511", "Fargo", "ND"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateLeadId(id) if id == "L-1"));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_substring() {
        let store = LeadStore::in_memory();
        store
            .insert_new(lead("L-1", "Prairie Byte Solutions", "541512", "Fargo", "ND"))
            .await
            .unwrap();
        store
            .insert_new(lead("L-2", "Gulf Coast Logistics", "488510", "Mobile", "AL"))
            .await
            .unwrap();

        let by_partial_naics = store.search("54151").await;
        assert_eq!(by_partial_naics.total, 1);
        assert_eq!(by_partial_naics.leads[0].lead_id, "L-1");

        let by_company_casefold = store.search("prairie BYTE").await;
        assert_eq!(by_company_casefold.total, 1);

        let by_state = store.search("al").await;
        assert_eq!(by_state.total, 1);
        assert_eq!(by_state.leads[0].lead_id, "L-2");

        let no_match = store.search("zzz-no-match").await;
        assert_eq!(no_match.total, 0);
        assert!(no_match.leads.is_empty());
    }

    #[tokio::test]
    async fn advance_probe_moves_forward_only_and_stamps_time() {
        let store = LeadStore::in_memory();
        store
            .insert_new(lead("L-1", "Acme", "541512", "Fargo", "ND"))
            .await
            .unwrap();

        let first = store
            .advance_probe("L-1", ProbeStatus::ProbedVerbose)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.probe_status, ProbeStatus::ProbedVerbose);
        let first_probed = first.last_probed.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store
            .advance_probe("L-1", ProbeStatus::Probed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.probe_status, ProbeStatus::ProbedVerbose);
        assert!(second.last_probed.unwrap() > first_probed);
    }

    #[tokio::test]
    async fn advance_probe_on_unknown_id_is_none_and_creates_nothing() {
        let store = LeadStore::in_memory();
        let result = store
            .advance_probe("missing", ProbeStatus::Probed)
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn snapshot_round_trips_across_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("leads.json");

        let store = LeadStore::open(&path).await.unwrap();
        store
            .insert_new(lead("L-1", "Acme", "541512", "Fargo", "ND"))
            .await
            .unwrap();
        store
            .advance_probe("L-1", ProbeStatus::Probed)
            .await
            .unwrap();
        drop(store);

        let reopened = LeadStore::open(&path).await.unwrap();
        assert_eq!(reopened.count().await, 1);
        let restored = reopened.find_by_lead_id("L-1").await.unwrap();
        assert_eq!(restored.probe_status, ProbeStatus::Probed);
        assert!(restored.last_probed.is_some());
    }

    #[tokio::test]
    async fn find_all_projects_summaries() {
        let store = LeadStore::in_memory();
        store
            .insert_new(lead("L-1", "Acme", "541512", "Fargo", "ND"))
            .await
            .unwrap();
        let all = store.find_all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].company_name, "Acme");
        assert_eq!(all[0].registration_status.as_deref(), Some("Active"));
    }
}

//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Provisioning ledger: step cursor, recorded ids and record stores."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use r_hub_common::config::ProvisioningConfig;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::debug;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::model::GroupSet;

/// Steps of the initiative provisioning workflow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProvisioningStep {
    Validate,
    CreateGroups,
    CreateItem,
    ShareItem,
    ProvisionSite,
    CrossLink,
    WriteData,
}

impl ProvisioningStep {
    pub const ALL: [ProvisioningStep; 7] = [
        ProvisioningStep::Validate,
        ProvisioningStep::CreateGroups,
        ProvisioningStep::CreateItem,
        ProvisioningStep::ShareItem,
        ProvisioningStep::ProvisionSite,
        ProvisioningStep::CrossLink,
        ProvisioningStep::WriteData,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowStatus {
    InProgress,
    Completed,
    /// Stopped at `failed_step`; created resources were left in place.
    Aborted,
    /// Compensations ran and every recorded resource was removed.
    RolledBack,
}

/// Group ids recorded as they are created. Any of them may still be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedGroups {
    pub content: Option<String>,
    pub collaboration: Option<String>,
    pub followers: Option<String>,
}

impl RecordedGroups {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        [
            self.content.as_deref(),
            self.collaboration.as_deref(),
            self.followers.as_deref(),
        ]
        .into_iter()
        .flatten()
    }

    /// Complete set, once content and core team exist.
    pub fn complete(&self) -> Option<GroupSet> {
        Some(GroupSet {
            content: self.content.clone()?,
            collaboration: self.collaboration.clone()?,
            followers: self.followers.clone(),
        })
    }
}

impl From<&GroupSet> for RecordedGroups {
    fn from(groups: &GroupSet) -> Self {
        Self {
            content: Some(groups.content.clone()),
            collaboration: Some(groups.collaboration.clone()),
            followers: groups.followers.clone(),
        }
    }
}

/// Persisted state of one provisioning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Site cloned for the initiative instead of provisioning a fresh one.
    #[serde(default)]
    pub template_site_id: Option<String>,
    #[serde(default)]
    pub groups: RecordedGroups,
    #[serde(default)]
    pub initiative_id: Option<String>,
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub completed: Vec<ProvisioningStep>,
    pub status: WorkflowStatus,
    #[serde(default)]
    pub failed_step: Option<ProvisioningStep>,
    #[serde(default)]
    pub last_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProvisioningRecord {
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description,
            template_site_id: None,
            groups: RecordedGroups::default(),
            initiative_id: None,
            site_id: None,
            completed: Vec::new(),
            status: WorkflowStatus::InProgress,
            failed_step: None,
            last_error: None,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn is_done(&self, step: ProvisioningStep) -> bool {
        self.completed.contains(&step)
    }

    /// First step not yet completed.
    pub fn next_step(&self) -> Option<ProvisioningStep> {
        ProvisioningStep::ALL
            .into_iter()
            .find(|step| !self.is_done(*step))
    }

    pub fn mark_done(&mut self, step: ProvisioningStep) {
        if !self.is_done(step) {
            self.completed.push(step);
        }
        self.touch();
        if self.next_step().is_none() {
            self.status = WorkflowStatus::Completed;
            self.failed_step = None;
            self.last_error = None;
        }
    }

    pub fn mark_failed(&mut self, step: ProvisioningStep, error: impl ToString) {
        self.status = WorkflowStatus::Aborted;
        self.failed_step = Some(step);
        self.last_error = Some(error.to_string());
        self.touch();
    }

    pub fn mark_in_progress(&mut self) {
        self.status = WorkflowStatus::InProgress;
        self.touch();
    }

    pub fn mark_rolled_back(&mut self) {
        self.status = WorkflowStatus::RolledBack;
        self.groups = RecordedGroups::default();
        self.initiative_id = None;
        self.site_id = None;
        self.completed.clear();
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.id)
    }
}

/// Persistence seam for provisioning records.
pub trait ProvisioningStore: Send + Sync {
    fn save(&self, record: &ProvisioningRecord) -> Result<()>;
    fn load(&self, id: Uuid) -> Result<Option<ProvisioningRecord>>;
    /// Every record, oldest first.
    fn list(&self) -> Result<Vec<ProvisioningRecord>>;
}

/// Records kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryProvisioningStore {
    records: Mutex<HashMap<Uuid, ProvisioningRecord>>,
}

impl MemoryProvisioningStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProvisioningStore for MemoryProvisioningStore {
    fn save(&self, record: &ProvisioningRecord) -> Result<()> {
        self.records.lock().insert(record.id, record.clone());
        Ok(())
    }

    fn load(&self, id: Uuid) -> Result<Option<ProvisioningRecord>> {
        Ok(self.records.lock().get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<ProvisioningRecord>> {
        let mut records: Vec<_> = self.records.lock().values().cloned().collect();
        records.sort_by_key(|record| record.started_at);
        Ok(records)
    }
}

/// One JSON file per workflow below a state directory.
#[derive(Debug, Clone)]
pub struct FileProvisioningStore {
    root: PathBuf,
}

impl FileProvisioningStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).with_context(|| {
            format!("unable to create provisioning state directory {}", root.display())
        })?;
        Ok(Self { root })
    }

    pub fn from_config(config: &ProvisioningConfig) -> Result<Self> {
        Self::new(config.state_dir.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    fn read(path: &Path) -> Result<ProvisioningRecord> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read provisioning record {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse provisioning record {}", path.display()))
    }
}

impl ProvisioningStore for FileProvisioningStore {
    fn save(&self, record: &ProvisioningRecord) -> Result<()> {
        let path = self.root.join(record.file_name());
        let staging = path.with_extension("json.tmp");
        let payload = serde_json::to_vec_pretty(record)?;
        fs::write(&staging, payload)
            .with_context(|| format!("failed to write {}", staging.display()))?;
        fs::rename(&staging, &path)
            .with_context(|| format!("failed to move record into {}", path.display()))?;
        debug!(
            workflow = %record.id,
            status = %record.status,
            path = %path.display(),
            "provisioning record persisted"
        );
        Ok(())
    }

    fn load(&self, id: Uuid) -> Result<Option<ProvisioningRecord>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        Self::read(&path).map(Some)
    }

    fn list(&self) -> Result<Vec<ProvisioningRecord>> {
        let mut records = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .map(|path| Self::read(&path))
            .collect::<Result<Vec<_>>>()?;
        records.sort_by_key(|record| record.started_at);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_advances_in_declared_order() {
        let mut record = ProvisioningRecord::new("Vision Zero", None);
        assert_eq!(record.next_step(), Some(ProvisioningStep::Validate));
        record.mark_done(ProvisioningStep::Validate);
        record.mark_done(ProvisioningStep::CreateGroups);
        assert_eq!(record.next_step(), Some(ProvisioningStep::CreateItem));
        for step in ProvisioningStep::ALL {
            record.mark_done(step);
        }
        assert_eq!(record.status, WorkflowStatus::Completed);
        assert_eq!(record.completed.len(), 7);
    }

    #[test]
    fn partial_groups_are_not_complete() {
        let groups = RecordedGroups {
            content: Some("g1".into()),
            ..RecordedGroups::default()
        };
        assert!(groups.complete().is_none());
        assert_eq!(groups.ids().count(), 1);
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryProvisioningStore::new();
        let mut record = ProvisioningRecord::new("Parks", None);
        store.save(&record).unwrap();
        record.mark_failed(ProvisioningStep::ProvisionSite, "boom");
        store.save(&record).unwrap();
        let loaded = store.load(record.id).unwrap().unwrap();
        assert_eq!(loaded.status, WorkflowStatus::Aborted);
        assert_eq!(store.list().unwrap().len(), 1);
    }
}

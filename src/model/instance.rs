use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{
    generate_id, Acl, AclPermission, BaselinedPart, BinaryResource, ConfigurationItemKey,
    DocumentIterationKey, Id, InstanceAttribute, PathDataMaster, PathToPathLink,
    ProductInstanceMasterKey, TargetPart,
};

/// Reference from a versioned snapshot to an external document iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLink {
    pub target: DocumentIterationKey,
    pub comment: String,
}

impl DocumentLink {
    pub fn new(target: DocumentIterationKey, comment: impl Into<String>) -> Self {
        Self {
            target,
            comment: comment.into(),
        }
    }
}

/// The part snapshot held by one product-instance iteration. Created fresh
/// per iteration and owned exclusively by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartCollection {
    pub id: Id,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub baselined_parts: BTreeMap<String, BaselinedPart>,
}

impl PartCollection {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            author: author.into(),
            created_at: Utc::now(),
            baselined_parts: BTreeMap::new(),
        }
    }

    /// Track the resolved target part, not the baseline-time wrapper it came
    /// from.
    pub fn add_baselined_part(&mut self, target: TargetPart) {
        let part = BaselinedPart::new(target);
        self.baselined_parts.insert(part.number.clone(), part);
    }
}

/// One numbered snapshot of a product instance. Content (part collection,
/// baseline reference) is frozen once a later iteration exists; metadata
/// stays editable on an explicitly addressed iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInstanceIteration {
    pub iteration: u32,
    pub iteration_note: Option<String>,
    /// Baseline this snapshot was computed from; `None` for manually edited
    /// iterations.
    pub based_on: Option<Id>,
    pub part_collection: PartCollection,
    pub substitute_links: BTreeSet<String>,
    pub optional_usage_links: BTreeSet<String>,
    #[serde(default)]
    pub instance_attributes: Vec<InstanceAttribute>,
    #[serde(default)]
    pub attached_files: Vec<BinaryResource>,
    #[serde(default)]
    pub linked_documents: Vec<DocumentLink>,
    #[serde(default)]
    pub path_to_path_links: Vec<PathToPathLink>,
}

impl ProductInstanceIteration {
    fn new(iteration: u32, author: &str) -> Self {
        Self {
            iteration,
            iteration_note: None,
            based_on: None,
            part_collection: PartCollection::new(author),
            substitute_links: BTreeSet::new(),
            optional_usage_links: BTreeSet::new(),
            instance_attributes: Vec::new(),
            attached_files: Vec::new(),
            linked_documents: Vec::new(),
            path_to_path_links: Vec::new(),
        }
    }

    pub fn find_file(&self, full_name: &str) -> Option<&BinaryResource> {
        self.attached_files.iter().find(|f| f.full_name == full_name)
    }

    pub fn find_file_mut(&mut self, full_name: &str) -> Option<&mut BinaryResource> {
        self.attached_files
            .iter_mut()
            .find(|f| f.full_name == full_name)
    }

    /// Attach a file; re-attaching the same full name replaces the entry.
    pub fn add_file(&mut self, file: BinaryResource) {
        self.remove_file(&file.full_name);
        self.attached_files.push(file);
    }

    pub fn remove_file(&mut self, full_name: &str) -> bool {
        let before = self.attached_files.len();
        self.attached_files.retain(|f| f.full_name != full_name);
        self.attached_files.len() != before
    }

    /// Clear-then-rebuild link replacement; links are never merged.
    pub fn replace_linked_documents(&mut self, links: Vec<DocumentLink>) {
        self.linked_documents.clear();
        self.linked_documents = links;
    }
}

/// One serial-numbered instance of a configuration item, carrying the
/// iteration chain, path-data records and an optional ACL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInstanceMaster {
    pub serial_number: String,
    pub instance_of: ConfigurationItemKey,
    pub acl: Option<Acl>,
    pub iterations: Vec<ProductInstanceIteration>,
    #[serde(default)]
    pub path_data_masters: Vec<PathDataMaster>,

    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,

    /// Optimistic-concurrency counter checked by the store on upsert.
    #[serde(default)]
    pub revision: u64,
}

impl ProductInstanceMaster {
    pub fn new(
        instance_of: ConfigurationItemKey,
        serial_number: impl Into<String>,
        user_id: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            serial_number: serial_number.into(),
            instance_of,
            acl: None,
            iterations: Vec::new(),
            path_data_masters: Vec::new(),
            created_by: user_id.to_string(),
            created_at: now,
            updated_by: user_id.to_string(),
            updated_at: now,
            revision: 0,
        }
    }

    pub fn key(&self) -> ProductInstanceMasterKey {
        ProductInstanceMasterKey::new(
            self.instance_of.workspace_id.clone(),
            self.instance_of.item_id.clone(),
            self.serial_number.clone(),
        )
    }

    /// Append the next snapshot. Numbers are contiguous from 1 in creation
    /// order; this is the only way the chain advances.
    pub fn create_next_iteration(&mut self, author: &str) -> &mut ProductInstanceIteration {
        let number = self.iterations.len() as u32 + 1;
        self.iterations
            .push(ProductInstanceIteration::new(number, author));
        self.iterations
            .last_mut()
            .expect("iteration just appended")
    }

    pub fn last_iteration(&self) -> Option<&ProductInstanceIteration> {
        self.iterations.last()
    }

    pub fn last_iteration_mut(&mut self) -> Option<&mut ProductInstanceIteration> {
        self.iterations.last_mut()
    }

    /// 1-based lookup, matching the numbering on the snapshots themselves.
    pub fn iteration(&self, number: u32) -> Option<&ProductInstanceIteration> {
        if number == 0 {
            return None;
        }
        self.iterations.get(number as usize - 1)
    }

    pub fn iteration_mut(&mut self, number: u32) -> Option<&mut ProductInstanceIteration> {
        if number == 0 {
            return None;
        }
        self.iterations.get_mut(number as usize - 1)
    }

    pub fn owns_path_data(&self, path_data_id: &Id) -> bool {
        self.path_data_masters.iter().any(|m| &m.id == path_data_id)
    }

    pub fn path_data(&self, path_data_id: &Id) -> Option<&PathDataMaster> {
        self.path_data_masters.iter().find(|m| &m.id == path_data_id)
    }

    pub fn path_data_mut(&mut self, path_data_id: &Id) -> Option<&mut PathDataMaster> {
        self.path_data_masters
            .iter_mut()
            .find(|m| &m.id == path_data_id)
    }

    /// Scan for an existing record carrying this exact path value. Records
    /// without a path never match, so any number of unpathed records can
    /// coexist.
    pub fn path_data_by_path(&self, path: &str) -> Option<&PathDataMaster> {
        self.path_data_masters
            .iter()
            .find(|m| m.path.as_deref() == Some(path))
    }

    /// Refresh the audit trail after a mutation, preserving created_by/at.
    pub fn touch(&mut self, user_id: &str) {
        self.updated_by = user_id.to_string();
        self.updated_at = Utc::now();
    }
}

/// Input model for instance creation; keys and iteration numbers are assigned
/// server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProductInstance {
    pub configuration_item_id: Id,
    pub serial_number: String,
    pub baseline_id: Id,
    #[serde(default)]
    pub user_entries: BTreeMap<String, AclPermission>,
    #[serde(default)]
    pub group_entries: BTreeMap<String, AclPermission>,
    #[serde(default)]
    pub attributes: Vec<InstanceAttribute>,
    #[serde(default)]
    pub links: Vec<DocumentIterationKey>,
    #[serde(default)]
    pub link_comments: Vec<String>,
}

/// Input model for metadata edits on an explicitly addressed iteration.
/// Editing never advances the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInstanceUpdate {
    pub iteration: u32,
    pub iteration_note: Option<String>,
    #[serde(default)]
    pub attributes: Vec<InstanceAttribute>,
    /// `None` leaves current links untouched; `Some` replaces them all.
    #[serde(default)]
    pub links: Option<Vec<DocumentIterationKey>>,
    #[serde(default)]
    pub link_comments: Vec<String>,
}

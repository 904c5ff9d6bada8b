use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{generate_id, ConfigurationItemKey, Id};

/// The product definition a serial-numbered instance is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationItem {
    pub workspace_id: String,
    pub item_id: Id,
    pub description: Option<String>,
}

impl ConfigurationItem {
    pub fn new(
        workspace_id: impl Into<String>,
        item_id: impl Into<Id>,
        description: Option<String>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            item_id: item_id.into(),
            description,
        }
    }

    pub fn key(&self) -> ConfigurationItemKey {
        ConfigurationItemKey::new(self.workspace_id.clone(), self.item_id.clone())
    }
}

/// A concrete part revision resolved at baseline time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPart {
    pub number: String,
    pub version: String,
    pub iteration: u32,
}

impl TargetPart {
    pub fn new(number: impl Into<String>, version: impl Into<String>, iteration: u32) -> Self {
        Self {
            number: number.into(),
            version: version.into(),
            iteration,
        }
    }
}

/// Baseline-time binding of a part number to the target part it froze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselinedPart {
    pub number: String,
    pub target: TargetPart,
}

impl BaselinedPart {
    pub fn new(target: TargetPart) -> Self {
        Self {
            number: target.number.clone(),
            target,
        }
    }
}

/// Frozen definition of a typed directed edge between two structural paths.
/// Copied into every iteration created from the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathToPathLinkDef {
    #[serde(rename = "type")]
    pub link_type: String,
    pub source_path: String,
    pub target_path: String,
}

/// An immutable, previously frozen part set plus link configuration for one
/// configuration item. Read-only input to instance creation and rebasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductBaseline {
    pub id: Id,
    pub name: String,
    pub configuration_item: ConfigurationItemKey,
    pub baselined_parts: BTreeMap<String, BaselinedPart>,
    pub substitute_links: BTreeSet<String>,
    pub optional_usage_links: BTreeSet<String>,
    #[serde(default)]
    pub path_to_path_links: Vec<PathToPathLinkDef>,
    pub created_at: DateTime<Utc>,
}

impl ProductBaseline {
    pub fn new(name: impl Into<String>, configuration_item: ConfigurationItemKey) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            configuration_item,
            baselined_parts: BTreeMap::new(),
            substitute_links: BTreeSet::new(),
            optional_usage_links: BTreeSet::new(),
            path_to_path_links: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn add_baselined_part(&mut self, target: TargetPart) {
        let part = BaselinedPart::new(target);
        self.baselined_parts.insert(part.number.clone(), part);
    }
}

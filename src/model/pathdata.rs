use serde::{Deserialize, Serialize};

use crate::model::{
    generate_id, BinaryResource, DocumentIterationKey, DocumentLink, Id, InstanceAttribute,
};

/// An attribute/file carrier addressed by a structural path string, owned by
/// one product-instance master. At most one record per distinct non-null path
/// within the owning instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDataMaster {
    pub id: Id,
    pub path: Option<String>,
    pub iterations: Vec<PathDataIteration>,
}

impl PathDataMaster {
    pub fn new(path: Option<String>) -> Self {
        Self {
            id: generate_id(),
            path,
            iterations: Vec::new(),
        }
    }

    pub fn create_next_iteration(&mut self) -> &mut PathDataIteration {
        let number = self.iterations.len() as u32 + 1;
        self.iterations.push(PathDataIteration::new(number));
        self.iterations
            .last_mut()
            .expect("iteration just appended")
    }

    pub fn last_iteration(&self) -> Option<&PathDataIteration> {
        self.iterations.last()
    }

    pub fn iteration(&self, number: u32) -> Option<&PathDataIteration> {
        if number == 0 {
            return None;
        }
        self.iterations.get(number as usize - 1)
    }

    pub fn iteration_mut(&mut self, number: u32) -> Option<&mut PathDataIteration> {
        if number == 0 {
            return None;
        }
        self.iterations.get_mut(number as usize - 1)
    }
}

/// Versioned snapshot scoped to a path. Same numbering rules as
/// product-instance iterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDataIteration {
    pub iteration: u32,
    pub iteration_note: Option<String>,
    #[serde(default)]
    pub instance_attributes: Vec<InstanceAttribute>,
    #[serde(default)]
    pub attached_files: Vec<BinaryResource>,
    #[serde(default)]
    pub linked_documents: Vec<DocumentLink>,
}

impl PathDataIteration {
    fn new(iteration: u32) -> Self {
        Self {
            iteration,
            iteration_note: None,
            instance_attributes: Vec::new(),
            attached_files: Vec::new(),
            linked_documents: Vec::new(),
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

    pub fn add_file(&mut self, file: BinaryResource) {
        self.remove_file(&file.full_name);
        self.attached_files.push(file);
    }

    pub fn remove_file(&mut self, full_name: &str) -> bool {
        let before = self.attached_files.len();
        self.attached_files.retain(|f| f.full_name != full_name);
        self.attached_files.len() != before
    }

    pub fn replace_linked_documents(&mut self, links: Vec<DocumentLink>) {
        self.linked_documents.clear();
        self.linked_documents = links;
    }
}

/// A typed directed edge between two path strings, scoped to one
/// product-instance iteration's snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathToPathLink {
    pub id: Id,
    #[serde(rename = "type")]
    pub link_type: String,
    pub source_path: String,
    pub target_path: String,
}

impl PathToPathLink {
    pub fn new(
        link_type: impl Into<String>,
        source_path: impl Into<String>,
        target_path: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_id(),
            link_type: link_type.into(),
            source_path: source_path.into(),
            target_path: target_path.into(),
        }
    }
}

/// Input model for adding path data. When a record with the same non-null
/// path already exists, `path_data_id` addresses the record whose chain
/// advances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPathData {
    #[serde(default)]
    pub path_data_id: Option<Id>,
    pub path: Option<String>,
    #[serde(default)]
    pub attributes: Vec<InstanceAttribute>,
    pub note: Option<String>,
    #[serde(default)]
    pub links: Option<Vec<DocumentIterationKey>>,
    #[serde(default)]
    pub link_comments: Vec<String>,
}

/// Input model for metadata edits on an addressed path-data iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDataUpdate {
    pub iteration: u32,
    #[serde(default)]
    pub attributes: Vec<InstanceAttribute>,
    pub note: Option<String>,
    #[serde(default)]
    pub links: Option<Vec<DocumentIterationKey>>,
    #[serde(default)]
    pub link_comments: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_data_iterations_number_from_one() {
        let mut master = PathDataMaster::new(Some("root/sub".to_string()));
        assert_eq!(master.create_next_iteration().iteration, 1);
        assert_eq!(master.create_next_iteration().iteration, 2);
        assert_eq!(master.last_iteration().map(|i| i.iteration), Some(2));
        assert!(master.iteration(0).is_none());
        assert!(master.iteration(3).is_none());
    }
}

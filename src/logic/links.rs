use itertools::Itertools;

use crate::error::ServiceError;
use crate::model::{
    DocumentIterationKey, DocumentLink, PathToPathLink, ProductInstanceIteration,
};

/// Pair link targets with the comment at the same position. Arity is
/// validated at the API boundary; a mismatch reaching this point is an
/// internal invariant violation.
pub fn build_document_links(
    keys: &[DocumentIterationKey],
    comments: &[String],
) -> Result<Vec<DocumentLink>, ServiceError> {
    if keys.len() != comments.len() {
        return Err(ServiceError::Internal(anyhow::anyhow!(
            "{} document links paired with {} comments",
            keys.len(),
            comments.len()
        )));
    }
    Ok(keys
        .iter()
        .zip(comments)
        .map(|(key, comment)| DocumentLink::new(key.clone(), comment.clone()))
        .collect())
}

pub fn link_by_id<'a>(
    iteration: &'a ProductInstanceIteration,
    link_id: &str,
) -> Option<&'a PathToPathLink> {
    iteration.path_to_path_links.iter().find(|l| l.id == link_id)
}

pub fn links_from_source_and_target<'a>(
    iteration: &'a ProductInstanceIteration,
    source_path: &str,
    target_path: &str,
) -> Vec<&'a PathToPathLink> {
    iteration
        .path_to_path_links
        .iter()
        .filter(|l| l.source_path == source_path && l.target_path == target_path)
        .collect()
}

pub fn distinct_link_types(iteration: &ProductInstanceIteration) -> Vec<String> {
    iteration
        .path_to_path_links
        .iter()
        .map(|l| l.link_type.clone())
        .unique()
        .collect()
}

/// Roots of one link type: edges whose source is not the target of any edge
/// of the same type.
pub fn root_links<'a>(
    iteration: &'a ProductInstanceIteration,
    link_type: &str,
) -> Vec<&'a PathToPathLink> {
    let typed: Vec<&PathToPathLink> = iteration
        .path_to_path_links
        .iter()
        .filter(|l| l.link_type == link_type)
        .collect();
    typed
        .iter()
        .filter(|candidate| !typed.iter().any(|l| l.target_path == candidate.source_path))
        .copied()
        .collect()
}

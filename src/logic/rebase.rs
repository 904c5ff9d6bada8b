use crate::error::ServiceError;
use crate::model::{
    ConfigurationItemKey, PartCollection, PathToPathLink, ProductBaseline,
    ProductInstanceIteration, ProductInstanceMaster,
};

/// Copy a baseline's content into a freshly created iteration: link sets by
/// value, a new part collection holding each baselined part's *target* part
/// (the resolved part, not the baseline-time wrapper), and the frozen
/// path-link definitions.
pub fn apply_baseline(
    iteration: &mut ProductInstanceIteration,
    baseline: &ProductBaseline,
    author: &str,
) {
    iteration.based_on = Some(baseline.id.clone());
    iteration.substitute_links = baseline.substitute_links.clone();
    iteration.optional_usage_links = baseline.optional_usage_links.clone();

    let mut collection = PartCollection::new(author);
    for part in baseline.baselined_parts.values() {
        collection.add_baselined_part(part.target.clone());
    }
    iteration.part_collection = collection;

    iteration.path_to_path_links = baseline
        .path_to_path_links
        .iter()
        .map(|def| {
            PathToPathLink::new(
                def.link_type.clone(),
                def.source_path.clone(),
                def.target_path.clone(),
            )
        })
        .collect();
}

/// Rebase precondition: the baseline must be frozen for the requested
/// configuration item, which must be the one the master instantiates. Any
/// mismatch fails before any state changes.
pub fn check_rebase_target(
    master: &ProductInstanceMaster,
    requested: &ConfigurationItemKey,
    baseline: &ProductBaseline,
) -> Result<(), ServiceError> {
    if baseline.configuration_item == *requested
        && baseline.configuration_item == master.instance_of
    {
        Ok(())
    } else {
        Err(ServiceError::NotAllowed(format!(
            "baseline '{}' targets configuration item '{}', not '{}'",
            baseline.name, baseline.configuration_item.item_id, master.instance_of.item_id
        )))
    }
}

/// Advance the chain onto a new baseline. The previous iteration's note is
/// carried forward; file attachments are not migrated.
pub fn rebase_onto(
    master: &mut ProductInstanceMaster,
    baseline: &ProductBaseline,
    author: &str,
) -> u32 {
    let carried_note = master
        .last_iteration()
        .and_then(|it| it.iteration_note.clone());
    let next = master.create_next_iteration(author);
    next.iteration_note = carried_note;
    apply_baseline(next, baseline, author);
    next.iteration
}

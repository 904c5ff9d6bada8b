use anyhow::Result;

use crate::logic::instance_ops::ProductInstanceOperations;
use crate::model::{
    ConfigurationItem, ConfigurationItemKey, InstanceAttribute, NewProductInstance,
    PathToPathLinkDef, ProductBaseline, TargetPart, TypedValue, User,
};
use crate::store::memory::{MemoryStore, MemoryUserManager};
use crate::store::traits::BaselineStore;

pub const DEMO_WORKSPACE: &str = "demo";
pub const DEMO_ITEM: &str = "city-bike";

/// Populate the store with a small workspace: two members, one
/// configuration item, one frozen baseline, one serial-numbered instance.
pub async fn load_seed_data(store: &MemoryStore, users: &MemoryUserManager) -> Result<()> {
    users.add_workspace(DEMO_WORKSPACE).await;
    users
        .add_member(User::administrator("admin", DEMO_WORKSPACE), true)
        .await;
    users.add_member(User::new("alice", DEMO_WORKSPACE), true).await;
    users.add_member(User::new("bob", DEMO_WORKSPACE), false).await;

    let item = ConfigurationItem::new(
        DEMO_WORKSPACE,
        DEMO_ITEM,
        Some("Single-speed city bike".to_string()),
    );
    store.upsert_configuration_item(item).await?;

    let mut baseline = ProductBaseline::new(
        "2026-spring",
        ConfigurationItemKey::new(DEMO_WORKSPACE, DEMO_ITEM),
    );
    baseline.add_baselined_part(TargetPart::new("FRAME-54", "B", 2));
    baseline.add_baselined_part(TargetPart::new("WHEEL-700C", "A", 5));
    baseline.add_baselined_part(TargetPart::new("SADDLE-STD", "A", 1));
    baseline
        .substitute_links
        .insert("frame/fork/steel".to_string());
    baseline
        .optional_usage_links
        .insert("frame/rack-mount".to_string());
    baseline.path_to_path_links.push(PathToPathLinkDef {
        link_type: "routing".to_string(),
        source_path: "frame".to_string(),
        target_path: "frame/fork".to_string(),
    });
    baseline.path_to_path_links.push(PathToPathLinkDef {
        link_type: "routing".to_string(),
        source_path: "frame/fork".to_string(),
        target_path: "frame/fork/brake".to_string(),
    });
    let baseline_id = baseline.id.clone();
    store.upsert_baseline(baseline).await?;

    ProductInstanceOperations::create_product_instance(
        store,
        users,
        "alice",
        DEMO_WORKSPACE,
        NewProductInstance {
            configuration_item_id: DEMO_ITEM.to_string(),
            serial_number: "SN-0001".to_string(),
            baseline_id,
            user_entries: Default::default(),
            group_entries: Default::default(),
            attributes: vec![InstanceAttribute::new(
                "color",
                TypedValue::string("midnight blue".to_string()),
            )],
            links: Vec::new(),
            link_comments: Vec::new(),
        },
    )
    .await
    .map_err(anyhow::Error::new)?;

    Ok(())
}

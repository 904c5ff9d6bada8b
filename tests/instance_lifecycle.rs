use std::collections::BTreeMap;

use piv_db_rust::{
    Acl, AclPermission, ConfigurationItem, ConfigurationItemKey, DocumentIterationKey,
    InstanceAttribute, MemoryDataManager, MemoryStore, MemoryUserManager, NewPathData,
    NewProductInstance, PathDataUpdate, PathDataOperations, PathToPathLinkDef, ProductBaseline,
    ProductInstanceMasterKey, ProductInstanceOperations, ProductInstanceUpdate, ServiceError,
    TargetPart, TypedValue, User,
};
use piv_db_rust::{BaselineStore, ProductInstanceStore, BinaryResourceStore};

const WORKSPACE: &str = "wks1";
const ITEM: &str = "bike";

struct TestEnv {
    store: MemoryStore,
    data: MemoryDataManager,
    users: MemoryUserManager,
    baseline_id: String,
}

async fn setup() -> TestEnv {
    let store = MemoryStore::new();
    let data = MemoryDataManager::new();
    let users = MemoryUserManager::new();

    users.add_member(User::administrator("root", WORKSPACE), true).await;
    users.add_member(User::new("alice", WORKSPACE), true).await;
    users.add_member(User::new("bob", WORKSPACE), false).await;

    store
        .upsert_configuration_item(ConfigurationItem::new(WORKSPACE, ITEM, None))
        .await
        .unwrap();

    let mut baseline =
        ProductBaseline::new("release-1", ConfigurationItemKey::new(WORKSPACE, ITEM));
    baseline.add_baselined_part(TargetPart::new("P1", "A", 1));
    baseline.add_baselined_part(TargetPart::new("P2", "A", 2));
    baseline.substitute_links.insert("u1".to_string());
    baseline.path_to_path_links.push(PathToPathLinkDef {
        link_type: "routing".to_string(),
        source_path: "root".to_string(),
        target_path: "root/sub".to_string(),
    });
    baseline.path_to_path_links.push(PathToPathLinkDef {
        link_type: "routing".to_string(),
        source_path: "root/sub".to_string(),
        target_path: "root/sub/leaf".to_string(),
    });
    let baseline_id = baseline.id.clone();
    store.upsert_baseline(baseline).await.unwrap();

    TestEnv {
        store,
        data,
        users,
        baseline_id,
    }
}

fn master_key(serial: &str) -> ProductInstanceMasterKey {
    ProductInstanceMasterKey::new(WORKSPACE, ITEM, serial)
}

fn new_instance(serial: &str, baseline_id: &str) -> NewProductInstance {
    NewProductInstance {
        configuration_item_id: ITEM.to_string(),
        serial_number: serial.to_string(),
        baseline_id: baseline_id.to_string(),
        user_entries: BTreeMap::new(),
        group_entries: BTreeMap::new(),
        attributes: vec![InstanceAttribute::new(
            "color",
            TypedValue::string("red".to_string()),
        )],
        links: Vec::new(),
        link_comments: Vec::new(),
    }
}

async fn create(env: &TestEnv, serial: &str) {
    ProductInstanceOperations::create_product_instance(
        &env.store,
        &env.users,
        "alice",
        WORKSPACE,
        new_instance(serial, &env.baseline_id),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn creating_an_instance_snapshots_the_baseline() {
    let env = setup().await;
    let master = ProductInstanceOperations::create_product_instance(
        &env.store,
        &env.users,
        "alice",
        WORKSPACE,
        new_instance("S1", &env.baseline_id),
    )
    .await
    .unwrap();

    assert_eq!(master.iterations.len(), 1);
    let first = master.last_iteration().unwrap();
    assert_eq!(first.iteration, 1);
    assert_eq!(first.iteration_note.as_deref(), Some("Initial"));
    assert_eq!(first.based_on.as_deref(), Some(env.baseline_id.as_str()));
    let parts: Vec<&str> = first
        .part_collection
        .baselined_parts
        .keys()
        .map(|k| k.as_str())
        .collect();
    assert_eq!(parts, vec!["P1", "P2"]);
    assert!(first.linked_documents.is_empty());
    assert!(first.substitute_links.contains("u1"));
    assert_eq!(first.path_to_path_links.len(), 2);

    // Serial numbers are unique per workspace and configuration item.
    let err = ProductInstanceOperations::create_product_instance(
        &env.store,
        &env.users,
        "alice",
        WORKSPACE,
        new_instance("S1", &env.baseline_id),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyExists(_)));

    let err = ProductInstanceOperations::create_product_instance(
        &env.store,
        &env.users,
        "alice",
        WORKSPACE,
        new_instance("S1/illegal", &env.baseline_id),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidName(_)));
}

#[tokio::test]
async fn updating_links_replaces_the_previous_set() {
    let env = setup().await;
    create(&env, "S1").await;

    let update_with = |links: Vec<DocumentIterationKey>, comments: Vec<&str>| ProductInstanceUpdate {
        iteration: 1,
        iteration_note: Some("linked".to_string()),
        attributes: Vec::new(),
        links: Some(links),
        link_comments: comments.into_iter().map(|c| c.to_string()).collect(),
    };

    ProductInstanceOperations::update_product_instance(
        &env.store,
        &env.users,
        "alice",
        &master_key("S1"),
        update_with(
            vec![
                DocumentIterationKey::new(WORKSPACE, "doc-a", 1),
                DocumentIterationKey::new(WORKSPACE, "doc-b", 1),
            ],
            vec!["spec", "report"],
        ),
    )
    .await
    .unwrap();

    let master = ProductInstanceOperations::update_product_instance(
        &env.store,
        &env.users,
        "alice",
        &master_key("S1"),
        update_with(
            vec![DocumentIterationKey::new(WORKSPACE, "doc-c", 2)],
            vec!["replacement"],
        ),
    )
    .await
    .unwrap();

    let links = &master.iteration(1).unwrap().linked_documents;
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].target.document_id, "doc-c");
    assert_eq!(links[0].comment, "replacement");

    // Editing metadata never advanced the chain.
    assert_eq!(master.iterations.len(), 1);

    let err = ProductInstanceOperations::update_product_instance(
        &env.store,
        &env.users,
        "alice",
        &master_key("S1"),
        ProductInstanceUpdate {
            iteration: 9,
            iteration_note: None,
            attributes: Vec::new(),
            links: None,
            link_comments: Vec::new(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::IterationNotFound { iteration: 9, .. }));
}

#[tokio::test]
async fn rebase_validates_the_configuration_item_and_advances_the_chain() {
    let env = setup().await;
    create(&env, "S1").await;

    // A baseline frozen for another configuration item is rejected outright.
    store_foreign_item(&env).await;
    let mut foreign = ProductBaseline::new(
        "foreign",
        ConfigurationItemKey::new(WORKSPACE, "scooter"),
    );
    foreign.add_baselined_part(TargetPart::new("X1", "A", 1));
    let foreign_id = foreign.id.clone();
    env.store.upsert_baseline(foreign).await.unwrap();

    let err = ProductInstanceOperations::rebase_product_instance(
        &env.store,
        &env.users,
        "alice",
        &master_key("S1"),
        &foreign_id,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotAllowed(_)));
    let untouched = env
        .store
        .get_product_instance(&master_key("S1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.iterations.len(), 1);

    // A matching baseline produces exactly one new iteration based on it.
    let mut second =
        ProductBaseline::new("release-2", ConfigurationItemKey::new(WORKSPACE, ITEM));
    second.add_baselined_part(TargetPart::new("P1", "B", 1));
    second.add_baselined_part(TargetPart::new("P3", "A", 1));
    let second_id = second.id.clone();
    env.store.upsert_baseline(second).await.unwrap();

    let master = ProductInstanceOperations::rebase_product_instance(
        &env.store,
        &env.users,
        "alice",
        &master_key("S1"),
        &second_id,
    )
    .await
    .unwrap();
    assert_eq!(master.iterations.len(), 2);
    let latest = master.last_iteration().unwrap();
    assert_eq!(latest.based_on.as_deref(), Some(second_id.as_str()));
    // The note of iteration 1 ("Initial") is carried forward.
    assert_eq!(latest.iteration_note.as_deref(), Some("Initial"));
    assert!(latest.part_collection.baselined_parts.contains_key("P3"));
}

async fn store_foreign_item(env: &TestEnv) {
    env.store
        .upsert_configuration_item(ConfigurationItem::new(WORKSPACE, "scooter", None))
        .await
        .unwrap();
}

#[tokio::test]
async fn saving_the_same_file_twice_is_an_upsert() {
    let env = setup().await;
    create(&env, "S1").await;

    let key = piv_db_rust::ProductInstanceIterationKey::new(master_key("S1"), 1);
    let first = ProductInstanceOperations::save_file_in_product_instance(
        &env.store,
        &env.users,
        "alice",
        &key,
        "manual.pdf",
        100,
    )
    .await
    .unwrap();
    let second = ProductInstanceOperations::save_file_in_product_instance(
        &env.store,
        &env.users,
        "alice",
        &key,
        "manual.pdf",
        250,
    )
    .await
    .unwrap();
    assert_eq!(first.full_name, second.full_name);
    assert_eq!(second.content_length, 250);

    let master = env
        .store
        .get_product_instance(&master_key("S1"))
        .await
        .unwrap()
        .unwrap();
    let files = &master.iteration(1).unwrap().attached_files;
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].content_length, 250);

    // The directory row reflects the latest upload too.
    let tracked = env
        .store
        .get_binary_resource(&second.full_name)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tracked.content_length, 250);
}

#[tokio::test]
async fn renaming_a_file_moves_bytes_and_metadata_together() {
    let env = setup().await;
    create(&env, "S1").await;

    let key = piv_db_rust::ProductInstanceIterationKey::new(master_key("S1"), 1);
    let saved = ProductInstanceOperations::save_file_in_product_instance(
        &env.store,
        &env.users,
        "alice",
        &key,
        "draft.txt",
        4,
    )
    .await
    .unwrap();
    env.data.put_data(saved.full_name.clone(), vec![1, 2, 3, 4]);

    let renamed = ProductInstanceOperations::rename_file_in_product_instance(
        &env.store,
        &env.data,
        &env.users,
        "alice",
        &master_key("S1"),
        1,
        &saved.full_name,
        "final.txt",
    )
    .await
    .unwrap();
    assert!(renamed.full_name.ends_with("/final.txt"));
    assert!(env.data.has_data(&renamed.full_name));
    assert!(!env.data.has_data(&saved.full_name));
    assert!(env
        .store
        .get_binary_resource(&saved.full_name)
        .await
        .unwrap()
        .is_none());

    // Renaming onto an already-tracked name is refused.
    let other = ProductInstanceOperations::save_file_in_product_instance(
        &env.store,
        &env.users,
        "alice",
        &key,
        "notes.txt",
        1,
    )
    .await
    .unwrap();
    env.data.put_data(other.full_name.clone(), vec![9]);
    let err = ProductInstanceOperations::rename_file_in_product_instance(
        &env.store,
        &env.data,
        &env.users,
        "alice",
        &master_key("S1"),
        1,
        &other.full_name,
        "final.txt",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::FileAlreadyExists(_)));
    // Fail closed: the old resource is still fully valid.
    assert!(env.data.has_data(&other.full_name));
    assert!(env
        .store
        .get_binary_resource(&other.full_name)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn adding_path_data_twice_advances_the_record_and_copies_files() {
    let env = setup().await;
    create(&env, "S1").await;

    let first = PathDataOperations::add_path_data(
        &env.store,
        &env.data,
        &env.users,
        "alice",
        &master_key("S1"),
        NewPathData {
            path_data_id: None,
            path: Some("root/sub".to_string()),
            attributes: Vec::new(),
            note: Some("first note".to_string()),
            links: None,
            link_comments: Vec::new(),
        },
    )
    .await
    .unwrap();
    let path_data_id = first.path_data.id.clone();
    assert_eq!(first.path_data.iterations.len(), 1);

    // Attach a file to iteration 1 and stage its bytes.
    let saved = PathDataOperations::save_file_in_path_data(
        &env.store,
        &env.users,
        "alice",
        &master_key("S1"),
        &path_data_id,
        1,
        "scan.png",
        64,
    )
    .await
    .unwrap();
    env.data.put_data(saved.full_name.clone(), vec![7; 64]);

    let second = PathDataOperations::add_path_data(
        &env.store,
        &env.data,
        &env.users,
        "alice",
        &master_key("S1"),
        NewPathData {
            path_data_id: Some(path_data_id.clone()),
            path: Some("root/sub".to_string()),
            attributes: Vec::new(),
            note: Some("second note".to_string()),
            links: None,
            link_comments: Vec::new(),
        },
    )
    .await
    .unwrap();

    // Same record, one more iteration, note from the second call.
    assert_eq!(second.path_data.id, path_data_id);
    assert_eq!(second.path_data.iterations.len(), 2);
    assert!(second.warnings.is_empty());
    let latest = second.path_data.last_iteration().unwrap();
    assert_eq!(latest.iteration_note.as_deref(), Some("second note"));

    // The file was copied, not moved, under the new iteration's name.
    assert_eq!(latest.attached_files.len(), 1);
    let copied = &latest.attached_files[0];
    assert!(copied.full_name.contains("/iterations/2/"));
    assert!(env.data.has_data(&copied.full_name));
    assert!(env.data.has_data(&saved.full_name));
}

#[tokio::test]
async fn failed_copies_are_skipped_and_reported() {
    let env = setup().await;
    create(&env, "S1").await;

    let first = PathDataOperations::add_path_data(
        &env.store,
        &env.data,
        &env.users,
        "alice",
        &master_key("S1"),
        NewPathData {
            path_data_id: None,
            path: Some("root/sub".to_string()),
            attributes: Vec::new(),
            note: None,
            links: None,
            link_comments: Vec::new(),
        },
    )
    .await
    .unwrap();
    let path_data_id = first.path_data.id.clone();

    // Metadata exists but the bytes were never staged: the copy must fail.
    PathDataOperations::save_file_in_path_data(
        &env.store,
        &env.users,
        "alice",
        &master_key("S1"),
        &path_data_id,
        1,
        "ghost.bin",
        16,
    )
    .await
    .unwrap();

    let second = PathDataOperations::add_path_data(
        &env.store,
        &env.data,
        &env.users,
        "alice",
        &master_key("S1"),
        NewPathData {
            path_data_id: Some(path_data_id),
            path: Some("root/sub".to_string()),
            attributes: Vec::new(),
            note: None,
            links: None,
            link_comments: Vec::new(),
        },
    )
    .await
    .unwrap();

    assert_eq!(second.warnings.len(), 1);
    let latest = second.path_data.last_iteration().unwrap();
    // The failed file was skipped; the new iteration has a partial set.
    assert!(latest.attached_files.is_empty());
}

#[tokio::test]
async fn unpathed_records_never_collide() {
    let env = setup().await;
    create(&env, "S1").await;

    for note in ["one", "two"] {
        let outcome = PathDataOperations::add_path_data(
            &env.store,
            &env.data,
            &env.users,
            "alice",
            &master_key("S1"),
            NewPathData {
                path_data_id: None,
                path: None,
                attributes: Vec::new(),
                note: Some(note.to_string()),
                links: None,
                link_comments: Vec::new(),
            },
        )
        .await
        .unwrap();
        assert_eq!(outcome.path_data.iterations.len(), 1);
    }

    let master = env
        .store
        .get_product_instance(&master_key("S1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(master.path_data_masters.len(), 2);
}

#[tokio::test]
async fn path_data_operations_enforce_ownership() {
    let env = setup().await;
    create(&env, "S1").await;
    create(&env, "S2").await;

    let outcome = PathDataOperations::add_path_data(
        &env.store,
        &env.data,
        &env.users,
        "alice",
        &master_key("S1"),
        NewPathData {
            path_data_id: None,
            path: Some("root/sub".to_string()),
            attributes: Vec::new(),
            note: Some("owned by S1".to_string()),
            links: None,
            link_comments: Vec::new(),
        },
    )
    .await
    .unwrap();
    let foreign_id = outcome.path_data.id.clone();

    // The record exists, but S2 does not own it: NotAllowed, not NotFound,
    // and nothing is deleted.
    let err = PathDataOperations::delete_path_data(
        &env.store,
        &env.data,
        &env.users,
        "alice",
        &master_key("S2"),
        &foreign_id,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotAllowed(_)));

    let owner = env
        .store
        .get_product_instance(&master_key("S1"))
        .await
        .unwrap()
        .unwrap();
    assert!(owner.owns_path_data(&foreign_id));

    let err = PathDataOperations::update_path_data(
        &env.store,
        &env.users,
        "alice",
        &master_key("S2"),
        &foreign_id,
        PathDataUpdate {
            iteration: 1,
            attributes: Vec::new(),
            note: Some("hijack".to_string()),
            links: None,
            link_comments: Vec::new(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotAllowed(_)));

    // A record that exists nowhere is NotFound.
    let err = PathDataOperations::delete_path_data(
        &env.store,
        &env.data,
        &env.users,
        "alice",
        &master_key("S1"),
        &"missing".to_string(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::PathDataNotFound(_)));
}

#[tokio::test]
async fn acl_precedence_is_applied_by_the_operations() {
    let env = setup().await;
    create(&env, "S1").await;

    // Without an ACL the workspace default applies: bob is read-only.
    let err = ProductInstanceOperations::update_product_instance(
        &env.store,
        &env.users,
        "bob",
        &master_key("S1"),
        ProductInstanceUpdate {
            iteration: 1,
            iteration_note: Some("denied".to_string()),
            attributes: Vec::new(),
            links: None,
            link_comments: Vec::new(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::AccessDenied(_)));

    // Grant alice a read-only ACL entry: she passes the workspace write
    // check, but the ACL now decides, and it holds no write grant for her.
    let mut user_entries = BTreeMap::new();
    user_entries.insert("alice".to_string(), AclPermission::Read);
    ProductInstanceOperations::update_acl(
        &env.store,
        &env.users,
        "root",
        &master_key("S1"),
        user_entries,
        BTreeMap::new(),
    )
    .await
    .unwrap();

    let err = ProductInstanceOperations::update_product_instance(
        &env.store,
        &env.users,
        "alice",
        &master_key("S1"),
        ProductInstanceUpdate {
            iteration: 1,
            iteration_note: Some("denied".to_string()),
            attributes: Vec::new(),
            links: None,
            link_comments: Vec::new(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::AccessDenied(_)));

    // The administrator bypasses the ACL entirely.
    ProductInstanceOperations::update_product_instance(
        &env.store,
        &env.users,
        "root",
        &master_key("S1"),
        ProductInstanceUpdate {
            iteration: 1,
            iteration_note: Some("admin edit".to_string()),
            attributes: Vec::new(),
            links: None,
            link_comments: Vec::new(),
        },
    )
    .await
    .unwrap();

    // Removing the ACL restores the workspace default for alice.
    ProductInstanceOperations::remove_acl(&env.store, &env.users, "root", &master_key("S1"))
        .await
        .unwrap();
    ProductInstanceOperations::update_product_instance(
        &env.store,
        &env.users,
        "alice",
        &master_key("S1"),
        ProductInstanceUpdate {
            iteration: 1,
            iteration_note: Some("alice again".to_string()),
            attributes: Vec::new(),
            links: None,
            link_comments: Vec::new(),
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn deleting_an_instance_cascades_and_reports_missing_bytes() {
    let env = setup().await;
    create(&env, "S1").await;

    let key = piv_db_rust::ProductInstanceIterationKey::new(master_key("S1"), 1);
    let staged = ProductInstanceOperations::save_file_in_product_instance(
        &env.store,
        &env.users,
        "alice",
        &key,
        "present.bin",
        2,
    )
    .await
    .unwrap();
    env.data.put_data(staged.full_name.clone(), vec![1, 2]);

    // A second attachment whose bytes were never staged.
    let ghost = ProductInstanceOperations::save_file_in_product_instance(
        &env.store,
        &env.users,
        "alice",
        &key,
        "ghost.bin",
        2,
    )
    .await
    .unwrap();

    let outcome = ProductInstanceOperations::delete_product_instance(
        &env.store,
        &env.data,
        &env.users,
        "alice",
        &master_key("S1"),
    )
    .await
    .unwrap();

    // One warning for the ghost file; the metadata is gone either way.
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].full_name, ghost.full_name);
    assert!(env
        .store
        .get_product_instance(&master_key("S1"))
        .await
        .unwrap()
        .is_none());
    assert!(env
        .store
        .get_binary_resource(&staged.full_name)
        .await
        .unwrap()
        .is_none());
    assert!(env
        .store
        .get_binary_resource(&ghost.full_name)
        .await
        .unwrap()
        .is_none());
    assert!(!env.data.has_data(&staged.full_name));
}

#[tokio::test]
async fn path_link_queries_read_the_last_iteration() {
    let env = setup().await;
    create(&env, "S1").await;

    let types = PathDataOperations::get_path_to_path_link_types(
        &env.store,
        &env.users,
        "alice",
        &master_key("S1"),
    )
    .await
    .unwrap();
    assert_eq!(types, vec!["routing"]);

    let roots = PathDataOperations::get_root_path_to_path_links(
        &env.store,
        &env.users,
        "alice",
        &master_key("S1"),
        "routing",
    )
    .await
    .unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].source_path, "root");

    let pairs = PathDataOperations::get_path_to_path_links_from_source_and_target(
        &env.store,
        &env.users,
        "alice",
        &master_key("S1"),
        "root",
        "root/sub",
    )
    .await
    .unwrap();
    assert_eq!(pairs.len(), 1);

    let found = PathDataOperations::get_path_to_path_link(
        &env.store,
        &env.users,
        "alice",
        &master_key("S1"),
        &pairs[0].id,
    )
    .await
    .unwrap();
    assert_eq!(found.target_path, "root/sub");

    let err = PathDataOperations::get_path_to_path_link(
        &env.store,
        &env.users,
        "alice",
        &master_key("S1"),
        &"missing-link".to_string(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::LinkNotFound(_)));
}

#[tokio::test]
async fn get_path_data_by_path_resolves_or_reports_not_found() {
    let env = setup().await;
    create(&env, "S1").await;

    PathDataOperations::add_path_data(
        &env.store,
        &env.data,
        &env.users,
        "alice",
        &master_key("S1"),
        NewPathData {
            path_data_id: None,
            path: Some("root/sub".to_string()),
            attributes: vec![InstanceAttribute::new(
                "torque",
                TypedValue::number(42),
            )],
            note: None,
            links: None,
            link_comments: Vec::new(),
        },
    )
    .await
    .unwrap();

    let found = PathDataOperations::get_path_data_by_path(
        &env.store,
        &env.users,
        "bob",
        &master_key("S1"),
        "root/sub",
    )
    .await
    .unwrap();
    assert_eq!(found.path.as_deref(), Some("root/sub"));

    let err = PathDataOperations::get_path_data_by_path(
        &env.store,
        &env.users,
        "bob",
        &master_key("S1"),
        "root/other",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::PathDataNotFound(_)));
}

#[tokio::test]
async fn binary_resource_reads_resolve_the_owner() {
    let env = setup().await;
    create(&env, "S1").await;

    let key = piv_db_rust::ProductInstanceIterationKey::new(master_key("S1"), 1);
    let saved = ProductInstanceOperations::save_file_in_product_instance(
        &env.store,
        &env.users,
        "alice",
        &key,
        "manual.pdf",
        8,
    )
    .await
    .unwrap();

    let fetched = ProductInstanceOperations::get_binary_resource(
        &env.store,
        &env.users,
        "bob",
        &saved.full_name,
    )
    .await
    .unwrap();
    assert_eq!(fetched.content_length, 8);

    let err = ProductInstanceOperations::get_binary_resource(
        &env.store,
        &env.users,
        "bob",
        "wks1/product-instances/S1/iterations/1/absent.pdf",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::FileNotFound(_)));

    let err = ProductInstanceOperations::get_binary_resource(
        &env.store,
        &env.users,
        "bob",
        "not-a-full-name",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidName(_)));
}

#[tokio::test]
async fn acl_from_creation_entries_gates_other_members() {
    let env = setup().await;

    let mut input = new_instance("S1", &env.baseline_id);
    input
        .user_entries
        .insert("alice".to_string(), AclPermission::Write);
    let master = ProductInstanceOperations::create_product_instance(
        &env.store,
        &env.users,
        "alice",
        WORKSPACE,
        input,
    )
    .await
    .unwrap();
    assert_eq!(
        master.acl,
        Some(Acl::new(
            {
                let mut m = BTreeMap::new();
                m.insert("alice".to_string(), AclPermission::Write);
                m
            },
            BTreeMap::new()
        ))
    );

    // bob is not in the table: even reading is denied once an ACL exists.
    let err = PathDataOperations::get_path_data_by_path(
        &env.store,
        &env.users,
        "bob",
        &master_key("S1"),
        "anything",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::AccessDenied(_)));
}

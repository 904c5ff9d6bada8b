use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::ServiceError;
use crate::logic::access::{
    check_product_instance_read_access, check_product_instance_write_access, UserManager,
};
use crate::logic::links::build_document_links;
use crate::logic::rebase::{apply_baseline, check_rebase_target, rebase_onto};
use crate::logic::naming;
use crate::model::{
    keys, Acl, AclPermission, BaselinedPart, BinaryResource, ConfigurationItemKey, Id,
    NewProductInstance, ProductBaseline, ProductInstanceIteration, ProductInstanceIterationKey,
    ProductInstanceMaster, ProductInstanceMasterKey, ProductInstanceUpdate,
};
use crate::store::data::{DataManager, StorageWarning};
use crate::store::traits::Store;

/// Result of a destructive operation whose physical-store failures were
/// swallowed: the metadata change succeeded, the warnings say which bytes
/// were left behind.
#[derive(Debug, Default, Serialize)]
pub struct DeleteOutcome {
    pub warnings: Vec<StorageWarning>,
}

pub struct ProductInstanceOperations;

impl ProductInstanceOperations {
    pub async fn get_product_instances<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        workspace_id: &str,
    ) -> Result<Vec<ProductInstanceMaster>, ServiceError> {
        users.check_workspace_read_access(workspace_id, login).await?;
        Ok(store.list_product_instances(workspace_id).await?)
    }

    pub async fn get_product_instances_for_item<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        item_key: &ConfigurationItemKey,
    ) -> Result<Vec<ProductInstanceMaster>, ServiceError> {
        users
            .check_workspace_read_access(&item_key.workspace_id, login)
            .await?;
        Ok(store.list_product_instances_for_item(item_key).await?)
    }

    pub async fn get_product_instance<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
    ) -> Result<ProductInstanceMaster, ServiceError> {
        users
            .check_workspace_read_access(&key.workspace_id, login)
            .await?;
        load_master(store, key).await
    }

    pub async fn get_product_instance_iterations<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
    ) -> Result<Vec<ProductInstanceIteration>, ServiceError> {
        users
            .check_workspace_read_access(&key.workspace_id, login)
            .await?;
        Ok(load_master(store, key).await?.iterations)
    }

    pub async fn get_product_instance_iteration<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceIterationKey,
    ) -> Result<ProductInstanceIteration, ServiceError> {
        users
            .check_workspace_read_access(&key.master.workspace_id, login)
            .await?;
        let master = load_master(store, &key.master).await?;
        master
            .iteration(key.iteration)
            .cloned()
            .ok_or_else(|| iteration_not_found(&master, key.iteration))
    }

    /// The part snapshot held by one iteration.
    pub async fn get_baselined_parts<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceIterationKey,
    ) -> Result<Vec<BaselinedPart>, ServiceError> {
        let iteration = Self::get_product_instance_iteration(store, users, login, key).await?;
        Ok(iteration.part_collection.baselined_parts.into_values().collect())
    }

    /// Create a serial-numbered instance from a baseline: iteration 1 gets
    /// the baseline's part set and link configuration, the supplied
    /// attributes and document links, and the note "Initial".
    pub async fn create_product_instance<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        workspace_id: &str,
        input: NewProductInstance,
    ) -> Result<ProductInstanceMaster, ServiceError> {
        let user = users.check_workspace_write_access(workspace_id, login).await?;
        naming::check_serial_number(&input.serial_number)?;

        let key = ProductInstanceMasterKey::new(
            workspace_id,
            input.configuration_item_id.clone(),
            input.serial_number.clone(),
        );
        if store.get_product_instance(&key).await?.is_some() {
            return Err(ServiceError::AlreadyExists(input.serial_number));
        }

        let item_key = key.configuration_item();
        let item = store
            .get_configuration_item(&item_key)
            .await?
            .ok_or(ServiceError::ConfigurationItemNotFound(item_key))?;
        let baseline = load_baseline(store, &input.baseline_id).await?;

        let mut master =
            ProductInstanceMaster::new(item.key(), input.serial_number.clone(), &user.login);
        master.acl = Acl::from_entries(input.user_entries, input.group_entries);

        let links = build_document_links(&input.links, &input.link_comments)?;
        let iteration = master.create_next_iteration(&user.login);
        iteration.iteration_note = Some("Initial".to_string());
        apply_baseline(iteration, &baseline, &user.login);
        iteration.instance_attributes = input.attributes;
        iteration.replace_linked_documents(links);

        store.upsert_product_instance(master).await?;
        load_master(store, &key).await
    }

    /// Metadata edit on an explicitly addressed iteration. Never advances
    /// the chain; the addressed snapshot's substitute/optional link sets are
    /// refreshed from the latest iteration.
    pub async fn update_product_instance<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
        update: ProductInstanceUpdate,
    ) -> Result<ProductInstanceMaster, ServiceError> {
        let user = users
            .check_workspace_read_access(&key.workspace_id, login)
            .await?;
        let mut master = load_master(store, key).await?;
        check_product_instance_write_access(users, &key.workspace_id, &master, &user).await?;

        let latest_links = master
            .last_iteration()
            .map(|it| (it.substitute_links.clone(), it.optional_usage_links.clone()))
            .unwrap_or_default();
        let links = match &update.links {
            Some(link_keys) => Some(build_document_links(link_keys, &update.link_comments)?),
            None => None,
        };

        let serial = master.serial_number.clone();
        let iteration = master
            .iteration_mut(update.iteration)
            .ok_or(ServiceError::IterationNotFound {
                serial_number: serial,
                iteration: update.iteration,
            })?;
        iteration.iteration_note = update.iteration_note;
        iteration.instance_attributes = update.attributes;
        iteration.substitute_links = latest_links.0;
        iteration.optional_usage_links = latest_links.1;
        if let Some(links) = links {
            iteration.replace_linked_documents(links);
        }

        master.touch(&user.login);
        store.upsert_product_instance(master).await?;
        load_master(store, key).await
    }

    /// Recompute the instance content from a new baseline of the same
    /// configuration item, as a new iteration.
    pub async fn rebase_product_instance<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
        baseline_id: &Id,
    ) -> Result<ProductInstanceMaster, ServiceError> {
        let user = users
            .check_workspace_read_access(&key.workspace_id, login)
            .await?;
        let mut master = load_master(store, key).await?;
        check_product_instance_write_access(users, &key.workspace_id, &master, &user).await?;

        let baseline = load_baseline(store, baseline_id).await?;
        check_rebase_target(&master, &key.configuration_item(), &baseline)?;

        rebase_onto(&mut master, &baseline, &user.login);
        master.touch(&user.login);
        store.upsert_product_instance(master).await?;
        load_master(store, key).await
    }

    /// Delete the master as a unit: iterations, path data, ACL and tracked
    /// binary resources. Byte deletion is best-effort.
    pub async fn delete_product_instance<S: Store>(
        store: &S,
        data: &dyn DataManager,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
    ) -> Result<DeleteOutcome, ServiceError> {
        let user = users
            .check_workspace_read_access(&key.workspace_id, login)
            .await?;
        let master = load_master(store, key).await?;
        check_product_instance_write_access(users, &key.workspace_id, &master, &user).await?;

        let mut outcome = DeleteOutcome::default();
        let mut attached: Vec<BinaryResource> = Vec::new();
        for iteration in &master.iterations {
            attached.extend(iteration.attached_files.iter().cloned());
        }
        for path_data in &master.path_data_masters {
            for iteration in &path_data.iterations {
                attached.extend(iteration.attached_files.iter().cloned());
            }
        }
        for file in attached {
            if let Err(err) = data.delete_data(&file).await {
                outcome
                    .warnings
                    .push(StorageWarning::new(&file.full_name, &err));
            }
            store.remove_binary_resource(&file.full_name).await?;
        }

        store.delete_product_instance(key).await?;
        Ok(outcome)
    }

    pub async fn update_acl<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
        user_entries: BTreeMap<String, AclPermission>,
        group_entries: BTreeMap<String, AclPermission>,
    ) -> Result<ProductInstanceMaster, ServiceError> {
        let user = users
            .check_workspace_read_access(&key.workspace_id, login)
            .await?;
        let mut master = load_master(store, key).await?;
        check_product_instance_write_access(users, &key.workspace_id, &master, &user).await?;

        match master.acl.as_mut() {
            Some(acl) => acl.replace_entries(user_entries, group_entries),
            None => master.acl = Some(Acl::new(user_entries, group_entries)),
        }

        master.touch(&user.login);
        store.upsert_product_instance(master).await?;
        load_master(store, key).await
    }

    pub async fn remove_acl<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
    ) -> Result<ProductInstanceMaster, ServiceError> {
        let user = users
            .check_workspace_read_access(&key.workspace_id, login)
            .await?;
        let mut master = load_master(store, key).await?;
        check_product_instance_write_access(users, &key.workspace_id, &master, &user).await?;

        master.acl = None;
        master.touch(&user.login);
        store.upsert_product_instance(master).await?;
        load_master(store, key).await
    }

    /// Upsert of a file's metadata within the addressed iteration, keyed by
    /// full logical name: re-uploading a filename never duplicates the row.
    pub async fn save_file_in_product_instance<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceIterationKey,
        file_name: &str,
        size: u64,
    ) -> Result<BinaryResource, ServiceError> {
        let user = users
            .check_workspace_read_access(&key.master.workspace_id, login)
            .await?;
        naming::check_file_name(file_name)?;

        let mut master = load_master(store, &key.master).await?;
        check_product_instance_write_access(users, &key.master.workspace_id, &master, &user)
            .await?;

        let serial = master.serial_number.clone();
        let iteration = master
            .iteration_mut(key.iteration)
            .ok_or(ServiceError::IterationNotFound {
                serial_number: serial.clone(),
                iteration: key.iteration,
            })?;
        let full_name = keys::instance_file_full_name(
            &key.master.workspace_id,
            &serial,
            iteration.iteration,
            file_name,
        );

        // Upsert: re-attaching the same full name replaces the entry.
        let already_attached = iteration.find_file(&full_name).is_some();
        let resource = BinaryResource::new(full_name, size, Utc::now());
        iteration.add_file(resource.clone());
        if already_attached {
            store.update_binary_resource(resource.clone()).await?;
        } else {
            store.create_binary_resource(resource.clone()).await?;
        }

        master.touch(&user.login);
        store.upsert_product_instance(master).await?;
        Ok(resource)
    }

    /// Rename sequencing: validate everything, move the bytes, then swap the
    /// directory row and the attachment. A failed byte rename leaves the old
    /// resource fully valid.
    pub async fn rename_file_in_product_instance<S: Store>(
        store: &S,
        data: &dyn DataManager,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
        iteration_number: u32,
        full_name: &str,
        new_name: &str,
    ) -> Result<BinaryResource, ServiceError> {
        let workspace_id = keys::parse_workspace_id(full_name)?.to_string();
        let user = users.check_workspace_read_access(&workspace_id, login).await?;

        let file = store
            .get_binary_resource(full_name)
            .await?
            .ok_or_else(|| ServiceError::FileNotFound(full_name.to_string()))?;
        let mut master = load_master(store, key).await?;
        naming::check_file_name(new_name)?;

        let new_full_name = file.renamed_full_name(new_name);
        if store.get_binary_resource(&new_full_name).await?.is_some() {
            return Err(ServiceError::FileAlreadyExists(new_name.to_string()));
        }

        check_product_instance_write_access(users, &workspace_id, &master, &user).await?;
        if master.iteration(iteration_number).is_none() {
            return Err(iteration_not_found(&master, iteration_number));
        }

        data.rename_file(&file, new_name).await?;

        let renamed = BinaryResource::new(new_full_name, file.content_length, file.last_modified);
        if let Some(iteration) = master.iteration_mut(iteration_number) {
            iteration.remove_file(&file.full_name);
            iteration.add_file(renamed.clone());
        }
        store.remove_binary_resource(&file.full_name).await?;
        store.create_binary_resource(renamed.clone()).await?;

        master.touch(&user.login);
        store.upsert_product_instance(master).await?;
        Ok(renamed)
    }

    /// Byte deletion is best-effort; the metadata always goes.
    pub async fn remove_file_from_product_instance<S: Store>(
        store: &S,
        data: &dyn DataManager,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
        iteration_number: u32,
        full_name: &str,
    ) -> Result<DeleteOutcome, ServiceError> {
        let user = users
            .check_workspace_read_access(&key.workspace_id, login)
            .await?;
        let file = store
            .get_binary_resource(full_name)
            .await?
            .ok_or_else(|| ServiceError::FileNotFound(full_name.to_string()))?;
        let mut master = load_master(store, key).await?;
        check_product_instance_write_access(users, &key.workspace_id, &master, &user).await?;
        if master.iteration(iteration_number).is_none() {
            return Err(iteration_not_found(&master, iteration_number));
        }

        let mut outcome = DeleteOutcome::default();
        if let Err(err) = data.delete_data(&file).await {
            outcome
                .warnings
                .push(StorageWarning::new(&file.full_name, &err));
        }

        if let Some(iteration) = master.iteration_mut(iteration_number) {
            iteration.remove_file(&file.full_name);
        }
        store.remove_binary_resource(&file.full_name).await?;

        master.touch(&user.login);
        store.upsert_product_instance(master).await?;
        Ok(outcome)
    }

    /// Owner-resolving read: the file must be attached to some iteration of
    /// an instance the caller may read.
    pub async fn get_binary_resource<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        full_name: &str,
    ) -> Result<BinaryResource, ServiceError> {
        let workspace_id = keys::parse_workspace_id(full_name)?.to_string();
        let user = users.check_workspace_read_access(&workspace_id, login).await?;
        let file = store
            .get_binary_resource(full_name)
            .await?
            .ok_or_else(|| ServiceError::FileNotFound(full_name.to_string()))?;

        let masters = store.list_product_instances(&workspace_id).await?;
        let owner = masters.iter().find(|m| {
            m.iterations
                .iter()
                .any(|it| it.find_file(full_name).is_some())
        });
        match owner {
            Some(master) => {
                check_product_instance_read_access(users, &workspace_id, master, &user).await?;
                Ok(file)
            }
            None => Err(ServiceError::FileNotFound(full_name.to_string())),
        }
    }
}

pub(crate) async fn load_master<S: Store>(
    store: &S,
    key: &ProductInstanceMasterKey,
) -> Result<ProductInstanceMaster, ServiceError> {
    store
        .get_product_instance(key)
        .await?
        .ok_or_else(|| ServiceError::MasterNotFound(key.clone()))
}

pub(crate) async fn load_baseline<S: Store>(
    store: &S,
    baseline_id: &Id,
) -> Result<ProductBaseline, ServiceError> {
    store
        .get_baseline(baseline_id)
        .await?
        .ok_or_else(|| ServiceError::BaselineNotFound(baseline_id.clone()))
}

pub(crate) fn iteration_not_found(
    master: &ProductInstanceMaster,
    iteration: u32,
) -> ServiceError {
    ServiceError::IterationNotFound {
        serial_number: master.serial_number.clone(),
        iteration,
    }
}

use chrono::Utc;
use serde::Serialize;

use crate::error::ServiceError;
use crate::logic::access::{
    check_product_instance_read_access, check_product_instance_write_access, UserManager,
};
use crate::logic::instance_ops::{iteration_not_found, load_master, DeleteOutcome};
use crate::logic::links::{
    build_document_links, distinct_link_types, link_by_id, links_from_source_and_target,
    root_links,
};
use crate::logic::naming;
use crate::model::{
    keys, BinaryResource, Id, NewPathData, PathDataMaster, PathDataUpdate, PathToPathLink,
    ProductInstanceMaster, ProductInstanceMasterKey,
};
use crate::store::data::{DataManager, StorageWarning};
use crate::store::traits::Store;

/// Path-data mutation result: the record after the change plus any
/// swallowed storage failures (failed file copies are skipped, not fatal).
#[derive(Debug, Serialize)]
pub struct PathDataOutcome {
    pub path_data: PathDataMaster,
    pub warnings: Vec<StorageWarning>,
}

pub struct PathDataOperations;

impl PathDataOperations {
    /// Attach path data to an instance. When another record already carries
    /// the same non-null path, this is an iteration-advance on the record
    /// addressed by `path_data_id`: the record found by the path scan only
    /// detects the collision, the target is re-resolved by id. Files of the
    /// prior iteration are copied (not moved) under the new iteration's
    /// names.
    pub async fn add_path_data<S: Store>(
        store: &S,
        data: &dyn DataManager,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
        input: NewPathData,
    ) -> Result<PathDataOutcome, ServiceError> {
        let user = users
            .check_workspace_read_access(&key.workspace_id, login)
            .await?;
        let mut master = load_master(store, key).await?;
        check_product_instance_write_access(users, &key.workspace_id, &master, &user).await?;

        let collision = input
            .path
            .as_deref()
            .and_then(|path| master.path_data_by_path(path))
            .is_some();

        if collision {
            let target_id = input.path_data_id.clone().unwrap_or_default();
            let target = master
                .path_data(&target_id)
                .ok_or_else(|| ServiceError::PathDataNotFound(target_id.clone()))?;

            // Copy the previous iteration's files under the next iteration's
            // names before the chain advances. Failed copies are skipped.
            let next_number = target.iterations.len() as u32 + 1;
            let source_files: Vec<BinaryResource> = target
                .last_iteration()
                .map(|it| it.attached_files.clone())
                .unwrap_or_default();

            let mut warnings = Vec::new();
            let mut copied = Vec::new();
            for source in &source_files {
                let full_name = keys::path_data_file_full_name(
                    &key.workspace_id,
                    &key.serial_number,
                    &target_id,
                    next_number,
                    source.name(),
                );
                let target_file =
                    BinaryResource::new(full_name, source.content_length, source.last_modified);
                match data.copy_data(source, &target_file).await {
                    Ok(()) => {
                        store.create_binary_resource(target_file.clone()).await?;
                        copied.push(target_file);
                    }
                    Err(err) => warnings.push(StorageWarning::new(&source.full_name, &err)),
                }
            }

            let links = match &input.links {
                Some(link_keys) => Some(build_document_links(link_keys, &input.link_comments)?),
                None => None,
            };
            let path_data = {
                let target = master
                    .path_data_mut(&target_id)
                    .ok_or(ServiceError::PathDataNotFound(target_id))?;
                let iteration = target.create_next_iteration();
                iteration.instance_attributes = input.attributes;
                iteration.iteration_note = input.note;
                if let Some(links) = links {
                    iteration.replace_linked_documents(links);
                }
                iteration.attached_files = copied;
                target.clone()
            };

            master.touch(&user.login);
            store.upsert_product_instance(master).await?;
            return Ok(PathDataOutcome {
                path_data,
                warnings,
            });
        }

        let mut path_data = PathDataMaster::new(input.path.clone());
        let links = match &input.links {
            Some(link_keys) => Some(build_document_links(link_keys, &input.link_comments)?),
            None => None,
        };
        let iteration = path_data.create_next_iteration();
        iteration.instance_attributes = input.attributes;
        iteration.iteration_note = input.note;
        if let Some(links) = links {
            iteration.replace_linked_documents(links);
        }

        let created = path_data.clone();
        master.path_data_masters.push(path_data);
        master.touch(&user.login);
        store.upsert_product_instance(master).await?;
        Ok(PathDataOutcome {
            path_data: created,
            warnings: Vec::new(),
        })
    }

    /// Metadata edit on an addressed path-data iteration; never advances the
    /// chain.
    pub async fn update_path_data<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
        path_data_id: &Id,
        update: PathDataUpdate,
    ) -> Result<PathDataMaster, ServiceError> {
        let user = users
            .check_workspace_read_access(&key.workspace_id, login)
            .await?;
        let mut master = load_master(store, key).await?;
        check_product_instance_write_access(users, &key.workspace_id, &master, &user).await?;
        Self::check_ownership(store, &master, path_data_id).await?;

        let links = match &update.links {
            Some(link_keys) => Some(build_document_links(link_keys, &update.link_comments)?),
            None => None,
        };

        let serial = master.serial_number.clone();
        let updated = {
            let path_data = master
                .path_data_mut(path_data_id)
                .ok_or_else(|| ServiceError::PathDataNotFound(path_data_id.clone()))?;
            let iteration = path_data.iteration_mut(update.iteration).ok_or(
                ServiceError::IterationNotFound {
                    serial_number: serial,
                    iteration: update.iteration,
                },
            )?;
            iteration.instance_attributes = update.attributes;
            iteration.iteration_note = update.note;
            if let Some(links) = links {
                iteration.replace_linked_documents(links);
            }
            path_data.clone()
        };

        master.touch(&user.login);
        store.upsert_product_instance(master).await?;
        Ok(updated)
    }

    /// Remove the record and request deletion of every attached file's bytes
    /// (best-effort) across all of its iterations.
    pub async fn delete_path_data<S: Store>(
        store: &S,
        data: &dyn DataManager,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
        path_data_id: &Id,
    ) -> Result<DeleteOutcome, ServiceError> {
        let user = users
            .check_workspace_read_access(&key.workspace_id, login)
            .await?;
        let mut master = load_master(store, key).await?;
        check_product_instance_write_access(users, &key.workspace_id, &master, &user).await?;
        Self::check_ownership(store, &master, path_data_id).await?;

        let mut outcome = DeleteOutcome::default();
        let attached: Vec<BinaryResource> = master
            .path_data(path_data_id)
            .map(|pd| {
                pd.iterations
                    .iter()
                    .flat_map(|it| it.attached_files.iter().cloned())
                    .collect()
            })
            .unwrap_or_default();
        for file in attached {
            if let Err(err) = data.delete_data(&file).await {
                outcome
                    .warnings
                    .push(StorageWarning::new(&file.full_name, &err));
            }
            store.remove_binary_resource(&file.full_name).await?;
        }

        master.path_data_masters.retain(|pd| &pd.id != path_data_id);
        master.touch(&user.login);
        store.upsert_product_instance(master).await?;
        Ok(outcome)
    }

    pub async fn get_path_data<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
        path_data_id: &Id,
    ) -> Result<PathDataMaster, ServiceError> {
        let user = users
            .check_workspace_read_access(&key.workspace_id, login)
            .await?;
        let master = load_master(store, key).await?;
        check_product_instance_read_access(users, &key.workspace_id, &master, &user).await?;
        Self::check_ownership(store, &master, path_data_id).await?;

        master
            .path_data(path_data_id)
            .cloned()
            .ok_or_else(|| ServiceError::PathDataNotFound(path_data_id.clone()))
    }

    pub async fn get_path_data_by_path<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
        path: &str,
    ) -> Result<PathDataMaster, ServiceError> {
        let user = users
            .check_workspace_read_access(&key.workspace_id, login)
            .await?;
        let master = load_master(store, key).await?;
        check_product_instance_read_access(users, &key.workspace_id, &master, &user).await?;

        master
            .path_data_by_path(path)
            .cloned()
            .ok_or_else(|| ServiceError::PathDataNotFound(path.to_string()))
    }

    /// Upsert of a file's metadata within the addressed path-data iteration.
    pub async fn save_file_in_path_data<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
        path_data_id: &Id,
        iteration_number: u32,
        file_name: &str,
        size: u64,
    ) -> Result<BinaryResource, ServiceError> {
        let user = users
            .check_workspace_read_access(&key.workspace_id, login)
            .await?;
        naming::check_file_name(file_name)?;
        let mut master = load_master(store, key).await?;
        check_product_instance_write_access(users, &key.workspace_id, &master, &user).await?;
        Self::check_ownership(store, &master, path_data_id).await?;

        let full_name = keys::path_data_file_full_name(
            &key.workspace_id,
            &key.serial_number,
            path_data_id,
            iteration_number,
            file_name,
        );

        let serial = master.serial_number.clone();
        let (resource, already_attached) = {
            let path_data = master
                .path_data_mut(path_data_id)
                .ok_or_else(|| ServiceError::PathDataNotFound(path_data_id.clone()))?;
            let iteration = path_data.iteration_mut(iteration_number).ok_or(
                ServiceError::IterationNotFound {
                    serial_number: serial,
                    iteration: iteration_number,
                },
            )?;
            // Upsert: re-attaching the same full name replaces the entry.
            let already_attached = iteration.find_file(&full_name).is_some();
            let resource = BinaryResource::new(full_name, size, Utc::now());
            iteration.add_file(resource.clone());
            (resource, already_attached)
        };
        if already_attached {
            store.update_binary_resource(resource.clone()).await?;
        } else {
            store.create_binary_resource(resource.clone()).await?;
        }

        master.touch(&user.login);
        store.upsert_product_instance(master).await?;
        Ok(resource)
    }

    /// Same sequencing as the instance-file rename: bytes first, fail
    /// closed, then directory row and attachment.
    pub async fn rename_file_in_path_data<S: Store>(
        store: &S,
        data: &dyn DataManager,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
        path_data_id: &Id,
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
        Self::check_ownership(store, &master, path_data_id).await?;
        let has_iteration = master
            .path_data(path_data_id)
            .and_then(|pd| pd.iteration(iteration_number))
            .is_some();
        if !has_iteration {
            return Err(iteration_not_found(&master, iteration_number));
        }

        data.rename_file(&file, new_name).await?;

        let renamed = BinaryResource::new(new_full_name, file.content_length, file.last_modified);
        if let Some(iteration) = master
            .path_data_mut(path_data_id)
            .and_then(|pd| pd.iteration_mut(iteration_number))
        {
            iteration.remove_file(&file.full_name);
            iteration.add_file(renamed.clone());
        }
        store.remove_binary_resource(&file.full_name).await?;
        store.create_binary_resource(renamed.clone()).await?;

        master.touch(&user.login);
        store.upsert_product_instance(master).await?;
        Ok(renamed)
    }

    pub async fn remove_file_from_path_data<S: Store>(
        store: &S,
        data: &dyn DataManager,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
        path_data_id: &Id,
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
        Self::check_ownership(store, &master, path_data_id).await?;

        let mut outcome = DeleteOutcome::default();
        if let Err(err) = data.delete_data(&file).await {
            outcome
                .warnings
                .push(StorageWarning::new(&file.full_name, &err));
        }

        if let Some(iteration) = master
            .path_data_mut(path_data_id)
            .and_then(|pd| pd.iteration_mut(iteration_number))
        {
            iteration.remove_file(&file.full_name);
        }
        store.remove_binary_resource(&file.full_name).await?;

        master.touch(&user.login);
        store.upsert_product_instance(master).await?;
        Ok(outcome)
    }

    /// Owner-resolving read for a path-data file.
    pub async fn get_path_data_binary_resource<S: Store>(
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
            m.path_data_masters.iter().any(|pd| {
                pd.iterations
                    .iter()
                    .any(|it| it.find_file(full_name).is_some())
            })
        });
        match owner {
            Some(master) => {
                check_product_instance_read_access(users, &workspace_id, master, &user).await?;
                Ok(file)
            }
            None => Err(ServiceError::FileNotFound(full_name.to_string())),
        }
    }

    pub async fn get_path_to_path_link<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
        link_id: &Id,
    ) -> Result<PathToPathLink, ServiceError> {
        let last = Self::read_last_iteration(store, users, login, key).await?;
        last.as_ref()
            .and_then(|it| link_by_id(it, link_id))
            .cloned()
            .ok_or_else(|| ServiceError::LinkNotFound(link_id.clone()))
    }

    pub async fn get_path_to_path_link_types<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
    ) -> Result<Vec<String>, ServiceError> {
        let last = Self::read_last_iteration(store, users, login, key).await?;
        Ok(last.as_ref().map(distinct_link_types).unwrap_or_default())
    }

    pub async fn get_path_to_path_links_from_source_and_target<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
        source_path: &str,
        target_path: &str,
    ) -> Result<Vec<PathToPathLink>, ServiceError> {
        let last = Self::read_last_iteration(store, users, login, key).await?;
        Ok(last
            .as_ref()
            .map(|it| {
                links_from_source_and_target(it, source_path, target_path)
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn get_root_path_to_path_links<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
        link_type: &str,
    ) -> Result<Vec<PathToPathLink>, ServiceError> {
        let last = Self::read_last_iteration(store, users, login, key).await?;
        Ok(last
            .as_ref()
            .map(|it| root_links(it, link_type).into_iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Link queries are read-only and scoped to the master's last iteration.
    async fn read_last_iteration<S: Store>(
        store: &S,
        users: &dyn UserManager,
        login: &str,
        key: &ProductInstanceMasterKey,
    ) -> Result<Option<crate::model::ProductInstanceIteration>, ServiceError> {
        let user = users
            .check_workspace_read_access(&key.workspace_id, login)
            .await?;
        let master = load_master(store, key).await?;
        check_product_instance_read_access(users, &key.workspace_id, &master, &user).await?;
        Ok(master.last_iteration().cloned())
    }

    /// The addressed record must exist somewhere (two lookups: global find,
    /// then containment) and must belong to the claimed master. A record
    /// owned by another instance is `NotAllowed`, not `NotFound`.
    async fn check_ownership<S: Store>(
        store: &S,
        master: &ProductInstanceMaster,
        path_data_id: &Id,
    ) -> Result<(), ServiceError> {
        if store.find_path_data(path_data_id).await?.is_none() {
            return Err(ServiceError::PathDataNotFound(path_data_id.clone()));
        }
        if !master.owns_path_data(path_data_id) {
            return Err(ServiceError::NotAllowed(format!(
                "path data '{}' is not owned by product instance '{}'",
                path_data_id, master.serial_number
            )));
        }
        Ok(())
    }
}

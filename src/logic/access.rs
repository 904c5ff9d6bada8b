use crate::error::ServiceError;
use crate::model::{ProductInstanceMaster, User};

/// Workspace/user identity collaborator. Implementations resolve the caller
/// to an authenticated, active workspace member or fail.
#[async_trait::async_trait]
pub trait UserManager: Send + Sync {
    async fn check_workspace_read_access(
        &self,
        workspace_id: &str,
        login: &str,
    ) -> Result<User, ServiceError>;
    async fn check_workspace_write_access(
        &self,
        workspace_id: &str,
        login: &str,
    ) -> Result<User, ServiceError>;
}

/// Three-tier read resolution, first match wins: workspace administrator,
/// then the workspace default when the master has no ACL, then the ACL.
///
/// Once an ACL exists only a *write* grant satisfies the read check; there
/// is no read-only grant path here. Narrower than the no-ACL case, kept
/// that way deliberately.
pub async fn check_product_instance_read_access(
    users: &dyn UserManager,
    workspace_id: &str,
    master: &ProductInstanceMaster,
    user: &User,
) -> Result<User, ServiceError> {
    if user.administrator {
        return Ok(user.clone());
    }
    match &master.acl {
        None => users.check_workspace_read_access(workspace_id, &user.login).await,
        Some(acl) if acl.has_write_access(user) => Ok(user.clone()),
        Some(_) => Err(ServiceError::AccessDenied(user.login.clone())),
    }
}

/// Write resolution with the same precedence; the no-ACL case defers to the
/// workspace-level *write* check.
pub async fn check_product_instance_write_access(
    users: &dyn UserManager,
    workspace_id: &str,
    master: &ProductInstanceMaster,
    user: &User,
) -> Result<User, ServiceError> {
    if user.administrator {
        return Ok(user.clone());
    }
    match &master.acl {
        None => users.check_workspace_write_access(workspace_id, &user.login).await,
        Some(acl) if acl.has_write_access(user) => Ok(user.clone()),
        Some(_) => Err(ServiceError::AccessDenied(user.login.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Acl, AclPermission, ConfigurationItemKey, ProductInstanceMaster};
    use crate::store::MemoryUserManager;
    use std::collections::BTreeMap;

    async fn directory() -> MemoryUserManager {
        let users = MemoryUserManager::new();
        users.add_member(User::new("writer", "wks1"), true).await;
        users.add_member(User::new("reader", "wks1"), false).await;
        users
            .add_member(User::administrator("root", "wks1"), true)
            .await;
        users
    }

    fn master_without_acl() -> ProductInstanceMaster {
        ProductInstanceMaster::new(ConfigurationItemKey::new("wks1", "bike"), "SN-001", "root")
    }

    fn master_with_acl(entries: &[(&str, AclPermission)]) -> ProductInstanceMaster {
        let mut master = master_without_acl();
        let mut user_entries = BTreeMap::new();
        for (login, permission) in entries {
            user_entries.insert(login.to_string(), *permission);
        }
        master.acl = Some(Acl::new(user_entries, BTreeMap::new()));
        master
    }

    #[tokio::test]
    async fn no_acl_defers_to_workspace_default() {
        let users = directory().await;
        let master = master_without_acl();
        let writer = User::new("writer", "wks1");

        // Workspace write membership is enough when no ACL exists.
        assert!(
            check_product_instance_write_access(&users, "wks1", &master, &writer)
                .await
                .is_ok()
        );

        // Read-only members still read, but cannot write.
        let reader = User::new("reader", "wks1");
        assert!(
            check_product_instance_read_access(&users, "wks1", &master, &reader)
                .await
                .is_ok()
        );
        assert!(matches!(
            check_product_instance_write_access(&users, "wks1", &master, &reader).await,
            Err(ServiceError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn administrator_bypasses_the_acl() {
        let users = directory().await;
        let master = master_with_acl(&[("writer", AclPermission::Write)]);
        let root = User::administrator("root", "wks1");
        assert!(
            check_product_instance_write_access(&users, "wks1", &master, &root)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn acl_read_accepts_only_write_grants() {
        let users = directory().await;
        // "writer" passes the workspace check but holds only a read grant in
        // the ACL: once an ACL exists, the read check demands a write grant.
        let master = master_with_acl(&[("writer", AclPermission::Read)]);
        let writer = User::new("writer", "wks1");

        assert!(matches!(
            check_product_instance_read_access(&users, "wks1", &master, &writer).await,
            Err(ServiceError::AccessDenied(_))
        ));
        assert!(matches!(
            check_product_instance_write_access(&users, "wks1", &master, &writer).await,
            Err(ServiceError::AccessDenied(_))
        ));

        let granted = master_with_acl(&[("writer", AclPermission::Write)]);
        assert!(
            check_product_instance_read_access(&users, "wks1", &granted, &writer)
                .await
                .is_ok()
        );
        assert!(
            check_product_instance_write_access(&users, "wks1", &granted, &writer)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn acl_denies_users_outside_the_table() {
        let users = directory().await;
        let master = master_with_acl(&[("someone-else", AclPermission::Write)]);
        let writer = User::new("writer", "wks1");
        assert!(matches!(
            check_product_instance_write_access(&users, "wks1", &master, &writer).await,
            Err(ServiceError::AccessDenied(_))
        ));
    }
}

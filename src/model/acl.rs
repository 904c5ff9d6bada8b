use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::User;

/// Permission granted by one ACL entry. Write implies read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AclPermission {
    Read,
    Write,
}

/// Explicit per-master permission table. A master without an ACL defers to
/// workspace-level checks instead; the resolver switches on `Option<Acl>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Acl {
    #[serde(default)]
    pub user_entries: BTreeMap<String, AclPermission>,
    #[serde(default)]
    pub group_entries: BTreeMap<String, AclPermission>,
}

impl Acl {
    pub fn new(
        user_entries: BTreeMap<String, AclPermission>,
        group_entries: BTreeMap<String, AclPermission>,
    ) -> Self {
        Self {
            user_entries,
            group_entries,
        }
    }

    /// `None` when no entries were supplied, so the master keeps deferring to
    /// the workspace default.
    pub fn from_entries(
        user_entries: BTreeMap<String, AclPermission>,
        group_entries: BTreeMap<String, AclPermission>,
    ) -> Option<Self> {
        if user_entries.is_empty() && group_entries.is_empty() {
            None
        } else {
            Some(Self::new(user_entries, group_entries))
        }
    }

    /// A user entry, when present, decides alone; group entries are only
    /// consulted for users without one.
    pub fn has_write_access(&self, user: &User) -> bool {
        if let Some(permission) = self.user_entries.get(&user.login) {
            return *permission == AclPermission::Write;
        }
        user.groups
            .iter()
            .any(|group| self.group_entries.get(group) == Some(&AclPermission::Write))
    }

    pub fn has_read_access(&self, user: &User) -> bool {
        if self.user_entries.contains_key(&user.login) {
            return true;
        }
        user.groups
            .iter()
            .any(|group| self.group_entries.contains_key(group))
    }

    pub fn replace_entries(
        &mut self,
        user_entries: BTreeMap<String, AclPermission>,
        group_entries: BTreeMap<String, AclPermission>,
    ) {
        self.user_entries = user_entries;
        self.group_entries = group_entries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(login: &str, groups: &[&str]) -> User {
        User {
            login: login.to_string(),
            workspace_id: "wks1".to_string(),
            administrator: false,
            active: true,
            groups: groups.iter().map(|g| g.to_string()).collect(),
        }
    }

    #[test]
    fn user_entry_overrides_group_entry() {
        let mut acl = Acl::default();
        acl.user_entries
            .insert("alice".to_string(), AclPermission::Read);
        acl.group_entries
            .insert("mechanics".to_string(), AclPermission::Write);

        let alice = member("alice", &["mechanics"]);
        assert!(!acl.has_write_access(&alice));
        assert!(acl.has_read_access(&alice));
    }

    #[test]
    fn group_entry_applies_without_user_entry() {
        let mut acl = Acl::default();
        acl.group_entries
            .insert("mechanics".to_string(), AclPermission::Write);

        assert!(acl.has_write_access(&member("bob", &["mechanics"])));
        assert!(!acl.has_write_access(&member("eve", &["visitors"])));
        assert!(!acl.has_read_access(&member("eve", &["visitors"])));
    }

    #[test]
    fn empty_entry_maps_produce_no_acl() {
        assert!(Acl::from_entries(BTreeMap::new(), BTreeMap::new()).is_none());
    }
}

use serde::{Deserialize, Serialize};

/// A workspace member as resolved by the user-management collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    pub workspace_id: String,
    pub administrator: bool,
    pub active: bool,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl User {
    pub fn new(login: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            workspace_id: workspace_id.into(),
            administrator: false,
            active: true,
            groups: Vec::new(),
        }
    }

    pub fn administrator(login: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        Self {
            administrator: true,
            ..Self::new(login, workspace_id)
        }
    }

    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }
}

/// Caller identity as it arrives with a request, before the user-management
/// collaborator resolves it to a workspace member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
}

impl UserContext {
    pub fn new(user_id: String) -> Self {
        Self {
            user_id,
            user_email: None,
            user_name: None,
        }
    }

    pub fn with_details(user_id: String, email: Option<String>, name: Option<String>) -> Self {
        Self {
            user_id,
            user_email: email,
            user_name: name,
        }
    }

    /// Fallback identity for development and tests.
    pub fn default_user() -> Self {
        Self {
            user_id: "dev-user".to_string(),
            user_email: Some("dev@localhost".to_string()),
            user_name: Some("Development User".to_string()),
        }
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::default_user()
    }
}

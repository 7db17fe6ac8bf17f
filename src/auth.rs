//! Login against the user-record datastore.
//!
//! Records hold a hex SHA-256 password digest and a role. Only `admin` and
//! `student` lead anywhere; every failure is reported as a message for the
//! login page, never as an error status.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{OptsBuilder, Pool};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::MySqlConfig;
use crate::{Error, Result};

pub const INVALID_CREDENTIALS: &str = "Invalid user ID or password";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "student" => Some(Role::Student),
            _ => None,
        }
    }

    /// Landing page after login.
    pub fn landing_page(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Student => "/chatbot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub password_hash: String,
    pub role: String,
}

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Redirect(&'static str),
    Rejected(String),
}

/// Lookup of user records by id.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find(&self, id: &str) -> Result<Option<UserRecord>>;
}

/// Hex SHA-256 of a password.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Check credentials and pick the landing page for the user's role.
pub async fn authenticate(
    directory: &dyn UserDirectory,
    id: &str,
    password: &str,
) -> Result<LoginOutcome> {
    let Some(record) = directory.find(id.trim()).await? else {
        info!(user = %id, "Login failed: unknown user");
        return Ok(LoginOutcome::Rejected(INVALID_CREDENTIALS.to_string()));
    };

    if !record
        .password_hash
        .trim()
        .eq_ignore_ascii_case(&hash_password(password))
    {
        info!(user = %record.id, "Login failed: wrong password");
        return Ok(LoginOutcome::Rejected(INVALID_CREDENTIALS.to_string()));
    }

    match Role::parse(&record.role) {
        Some(role) => {
            info!(user = %record.id, role = %record.role, "Login succeeded");
            Ok(LoginOutcome::Redirect(role.landing_page()))
        }
        None => {
            warn!(user = %record.id, role = %record.role, "Login with unrecognized role");
            Ok(LoginOutcome::Rejected(format!(
                "Unrecognized role: {}",
                record.role
            )))
        }
    }
}

/// `users` table in MySQL.
pub struct MySqlUserDirectory {
    pool: Pool,
}

impl MySqlUserDirectory {
    pub fn new(config: &MySqlConfig) -> Self {
        let opts = OptsBuilder::default()
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port)
            .db_name(Some(config.database.clone()))
            .user(Some(config.user.clone()))
            .pass(Some(config.password.clone()));

        Self {
            pool: Pool::new(opts),
        }
    }
}

#[async_trait]
impl UserDirectory for MySqlUserDirectory {
    async fn find(&self, id: &str) -> Result<Option<UserRecord>> {
        let mut conn = self.pool.get_conn().await?;
        let row: Option<(String, String, String)> = conn
            .exec_first(
                "SELECT id, password_hash, role FROM users WHERE id = :id LIMIT 1",
                params! { "id" => id },
            )
            .await?;

        Ok(row.map(|(id, password_hash, role)| UserRecord {
            id,
            password_hash,
            role,
        }))
    }
}

/// Fixed user list, for development without a database.
#[derive(Debug, Default, Clone)]
pub struct StaticUserDirectory {
    users: HashMap<String, UserRecord>,
}

#[derive(Debug, Deserialize)]
struct UsersFile {
    users: Vec<UserRecord>,
}

impl StaticUserDirectory {
    pub fn new(records: impl IntoIterator<Item = UserRecord>) -> Self {
        Self {
            users: records.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    /// Load `users: [{id, password_hash, role}]` from YAML.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: UsersFile = serde_yaml::from_str(&content).map_err(|e| {
            Error::ConfigError(format!("invalid users file {}: {}", path.display(), e))
        })?;
        Ok(Self::new(file.users))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn find(&self, id: &str) -> Result<Option<UserRecord>> {
        Ok(self.users.get(id).cloned())
    }
}

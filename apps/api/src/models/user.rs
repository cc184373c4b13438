use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "employee" => Ok(Role::Employee),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Identity and profile record. Never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub avatar: String,
    pub department: String,
    pub employment_type: Option<String>,
    pub signed_contract_at: Option<DateTime<Utc>>,
    pub contract_start_date: Option<NaiveDate>,
    pub contract_pdf_url: Option<String>,
    /// Contract version current at signing time.
    pub signed_contract_version: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: Uuid, username: &str, name: &str, role: Role, department: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            email: String::new(),
            name: name.to_string(),
            role,
            avatar: default_avatar(username),
            department: department.to_string(),
            employment_type: None,
            signed_contract_at: None,
            contract_start_date: None,
            contract_pdf_url: None,
            signed_contract_version: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn has_signed_contract(&self) -> bool {
        self.signed_contract_at.is_some()
    }
}

pub fn default_avatar(seed: &str) -> String {
    format!("https://api.dicebear.com/7.x/avataaars/svg?seed={seed}")
}

/// Login-name lookup entry mapping a human-entered identifier to a credential.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub username: String,
    pub name: String,
    pub user_id: Uuid,
    pub password_hash: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub avatar: String,
    pub department: String,
    pub employment_type: Option<String>,
    pub signed_contract_at: Option<DateTime<Utc>>,
    pub contract_start_date: Option<NaiveDate>,
    pub contract_pdf_url: Option<String>,
    pub signed_contract_version: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = String;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            name: row.name,
            role: row.role.parse()?,
            avatar: row.avatar,
            department: row.department,
            employment_type: row.employment_type,
            signed_contract_at: row.signed_contract_at,
            contract_start_date: row.contract_start_date,
            contract_pdf_url: row.contract_pdf_url,
            signed_contract_version: row.signed_contract_version,
            created_at: row.created_at,
        })
    }
}

/// Fields the owning user may change on their own profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

impl ProfilePatch {
    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.trim().to_string();
        }
        if let Some(email) = &self.email {
            user.email = email.trim().to_string();
        }
        if let Some(avatar) = &self.avatar {
            user.avatar = avatar.clone();
        }
    }
}

/// Fields an admin may change on any user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminUserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub department: Option<String>,
    pub employment_type: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
}

impl AdminUserPatch {
    pub fn apply(&self, user: &mut User) {
        if let Some(username) = &self.username {
            user.username = username.trim().to_string();
        }
        if let Some(email) = &self.email {
            user.email = email.trim().to_string();
        }
        if let Some(name) = &self.name {
            user.name = name.trim().to_string();
        }
        if let Some(department) = &self.department {
            user.department = department.clone();
        }
        if let Some(employment_type) = &self.employment_type {
            user.employment_type = Some(employment_type.clone());
        }
        if let Some(role) = self.role {
            user.role = role;
        }
    }
}

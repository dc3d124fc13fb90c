//! Companies (tenants) and user memberships

use serde::{Deserialize, Serialize};

/// Role of a user inside a company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "text", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum CompanyRole {
    Owner,
    Admin,
    Member,
    Technician,
}

impl CompanyRole {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Technician => "technician",
        }
    }

    /// Roles allowed to change the company's subscription
    pub fn can_manage_billing(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Company {
    pub id: String,
    pub name: String,
    /// User who registered the company
    pub owner_id: String,
    pub created_at: i64,
}

/// `(company_id, user_id)` pair granting a user visibility into a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Membership {
    pub company_id: String,
    pub user_id: String,
    pub role: CompanyRole,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
}

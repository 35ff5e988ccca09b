use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Credits every freshly registered member starts with.
pub const INITIAL_CREDITS: i64 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Role::Member),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// A registered member or administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub member_number: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 hash, never exposed
    pub role: Role,
    pub balance: i64,
    pub identity_token: String, // encoded in the member's QR badge
    pub avatar_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Account {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Account fields supplied at registration.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub member_number: String,
    pub password_hash: String,
    pub role: Role,
    pub balance: i64,
    pub identity_token: String,
}

impl NewAccount {
    pub fn member(
        name: String,
        email: String,
        phone: String,
        member_number: String,
        password_hash: String,
    ) -> Self {
        Self {
            name,
            email,
            phone,
            member_number,
            password_hash,
            role: Role::Member,
            balance: INITIAL_CREDITS,
            identity_token: Uuid::new_v4().to_string(),
        }
    }

    /// Administrators carry no meal credits of their own.
    pub fn admin(
        name: String,
        email: String,
        phone: String,
        member_number: String,
        password_hash: String,
    ) -> Self {
        Self {
            role: Role::Admin,
            balance: 0,
            ..Self::member(name, email, phone, member_number, password_hash)
        }
    }
}

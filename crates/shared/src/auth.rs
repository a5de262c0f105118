//! Authentication types for JWT and tokens.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform role carried in tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Shopper placing orders.
    Customer,
    /// Staff member of one franchise.
    FranchiseStaff,
    /// Owner of one franchise.
    FranchiseOwner,
    /// Platform administrator.
    Admin,
}

impl Role {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::FranchiseStaff => "franchise_staff",
            Self::FranchiseOwner => "franchise_owner",
            Self::Admin => "admin",
        }
    }

    /// Returns true for roles scoped to a single franchise.
    #[must_use]
    pub const fn is_franchise_role(&self) -> bool {
        matches!(self, Self::FranchiseStaff | Self::FranchiseOwner)
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
            "customer" => Ok(Self::Customer),
            "franchise_staff" => Ok(Self::FranchiseStaff),
            "franchise_owner" => Ok(Self::FranchiseOwner),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// JWT claims for access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// User's platform role.
    pub role: Role,
    /// Franchise the user works for, when the role is franchise-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub franchise: Option<Uuid>,
    /// Unique token id; keeps consecutive refresh tokens distinct.
    pub jti: Uuid,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(
        user_id: Uuid,
        role: Role,
        franchise: Option<Uuid>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            role,
            franchise,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the franchise ID from claims.
    #[must_use]
    pub const fn franchise_id(&self) -> Option<Uuid> {
        self.franchise
    }
}

/// Token pair returned after successful authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token (short-lived).
    pub access_token: String,
    /// Refresh token (long-lived, rotated on use).
    pub refresh_token: String,
    /// Access token expiration in seconds.
    pub expires_in: i64,
}

impl TokenPair {
    /// Creates a new token pair.
    #[must_use]
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
        }
    }
}

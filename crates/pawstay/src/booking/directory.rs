//! Collaborator seams for the property catalog and the account directory.
//!
//! Both are read-only to the booking core. Listing management, search,
//! credentials, and the admin approval UI all live behind these traits.

use serde::{Deserialize, Serialize};

use super::domain::{AccountId, PropertyId};

/// Admin-driven approval state for a host. There is no automatic reversion;
/// only an `Active` host has bookable listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostApproval {
    Pending,
    Active,
    Suspended,
    Rejected,
}

impl HostApproval {
    pub const fn is_bookable(self) -> bool {
        matches!(self, Self::Active)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Rejected => "rejected",
        }
    }
}

/// Read-only view of a listed property as the catalog currently knows it.
///
/// `max_pets` is the property's capacity and is deliberately distinct from a
/// reservation's pet count; the two must never share a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySnapshot {
    pub id: PropertyId,
    pub host_id: AccountId,
    pub nightly_rate_cents: u32,
    pub max_pets: u32,
    pub approval: HostApproval,
}

impl PropertySnapshot {
    pub fn is_bookable(&self) -> bool {
        self.approval.is_bookable()
    }
}

/// Account roles the directory distinguishes for booking purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Guest,
    Host,
}

/// Authenticated principal as resolved by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: AccountId,
    pub role: AccountRole,
}

impl AccountProfile {
    /// Hosts must never act as the reserving guest.
    pub const fn may_book(&self) -> bool {
        matches!(self.role, AccountRole::Guest)
    }
}

/// Property existence, pricing, and bookability lookup.
pub trait PropertyCatalog: Send + Sync {
    fn property(&self, id: &PropertyId) -> Result<Option<PropertySnapshot>, DirectoryError>;
}

/// Identity and booking-eligibility lookup.
pub trait AccountDirectory: Send + Sync {
    fn account(&self, id: &AccountId) -> Result<Option<AccountProfile>, DirectoryError>;
}

/// Collaborator failures distinct from "not found", which is a normal answer.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

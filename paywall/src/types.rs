//! Common type definitions and permission system types.
//!
//! This module defines:
//! - Type aliases for entity IDs (AccountId, StrategyId)
//! - Permission and authorization types used by the admin console
//!
//! # Permission System
//!
//! Admin console routes are guarded by a [`Permission`] built from a
//! [`Resource`] and an [`Operation`]. Only accounts whose role is `admin` hold
//! the `*All` operations; every authenticated account holds the `*Own`
//! operations on its own data.
//!
//! # Utility Functions
//!
//! - [`abbrev_uuid`]: Abbreviate UUIDs to first 8 chars for logging

use serde::Deserialize;
use std::fmt;
use uuid::Uuid;

// Type aliases for IDs
pub type AccountId = Uuid;
pub type StrategyId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

// Common types for path parameters
#[derive(Debug, Clone, Deserialize)]
pub enum CurrentKeyword {
    #[serde(rename = "current")]
    Current,
}

/// Allows routes like /users/current and /users/{id} to hit the same handler.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AccountIdOrCurrent {
    Current(CurrentKeyword),
    Id(AccountId),
}

impl AccountIdOrCurrent {
    /// Resolve `current` against the caller's own id.
    pub fn resolve(&self, current: AccountId) -> AccountId {
        match self {
            AccountIdOrCurrent::Current(_) => current,
            AccountIdOrCurrent::Id(id) => *id,
        }
    }
}

// *-All means unrestricted access, *-Own means restricted to own resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAll,
    ReadAll,
    ReadOwn,
    UpdateAll,
    UpdateOwn,
    DeleteAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Strategies,
    Usage,
    SavedStrategies,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    /// Simple permission: (Resource, Operation)
    Allow(Resource, Operation),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateAll => write!(f, "Create"),
            Operation::ReadAll | Operation::ReadOwn => write!(f, "Read"),
            Operation::UpdateAll | Operation::UpdateOwn => write!(f, "Update"),
            Operation::DeleteAll => write!(f, "Delete"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Users => write!(f, "users"),
            Resource::Strategies => write!(f, "strategies"),
            Resource::Usage => write!(f, "usage"),
            Resource::SavedStrategies => write!(f, "saved strategies"),
        }
    }
}

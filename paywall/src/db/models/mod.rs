//! Database record models matching table schemas.
//!
//! Each module holds the create/update request structs a repository accepts
//! and the response struct it returns. These are kept apart from the API
//! models in [`crate::api::models`] so storage and wire formats can change
//! independently; conversions live on the API side.
//!
//! - [`accounts`]: accounts, credentials and billing linkage
//! - [`strategies`]: the strategy catalogue
//! - [`usage`]: per-month usage records for metered accounts

pub mod accounts;
pub mod strategies;
pub mod usage;

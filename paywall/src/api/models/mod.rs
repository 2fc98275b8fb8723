//! API request and response data models.
//!
//! API models are kept separate from the database models in [`crate::db::models`] so the
//! public contract can evolve independently of storage. Every model derives `utoipa::ToSchema`
//! for the generated OpenAPI document.
//!
//! - [`users`]: accounts and the verified caller
//! - [`strategies`]: public summaries, full records, admin create/update payloads
//! - [`usage`]: the caller's monthly view allowance
//! - [`auth`]: login and logout payloads
//! - [`pagination`]: shared `skip`/`limit` parameters

pub mod auth;
pub mod pagination;
pub mod strategies;
pub mod usage;
pub mod users;

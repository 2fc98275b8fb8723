//! HTTP request handlers for all API endpoints.
//!
//! Axum route handlers organized by resource type. Each handler deserializes the request,
//! checks the caller through an extractor, and works through the repositories in
//! [`crate::db::handlers`].
//!
//! # Handler Modules
//!
//! - [`auth`]: login and logout
//! - [`strategies`]: the public catalogue, the gated detail view, admin CRUD
//! - [`users`]: account management and the caller's own profile
//! - [`usage`]: the caller's monthly view allowance
//! - [`saved_strategies`]: per-account bookmarks
//! - [`payments`]: payment processor webhooks
//!
//! # Authentication
//!
//! Handlers take [`crate::api::models::users::CurrentUser`] (required),
//! `Option<CurrentUser>` (optional), or
//! [`crate::auth::permissions::RequiresPermission`] (required plus a permission check).
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which converts to the matching HTTP status.

pub mod auth;
pub mod payments;
pub mod saved_strategies;
pub mod strategies;
pub mod usage;
pub mod users;

//! Authentication and authorization.
//!
//! # Authentication
//!
//! Email/password login at `/authentication/login` issues a signed JWT, delivered as an
//! HTTP-only cookie. The same token is accepted as `Authorization: Bearer <token>`. The token
//! identifies the account; it does not carry role or plan.
//!
//! Handlers take [`CurrentUser`](crate::api::models::users::CurrentUser) to require a caller,
//! or `Option<CurrentUser>` where anonymous access is meaningful (gated strategy reads, where
//! the access policy decides).
//!
//! # Authorization
//!
//! [`permissions::RequiresPermission`] reads the caller's role from the database and checks a
//! resource/operation pair. Access to gated content is a separate concern handled by
//! [`crate::entitlements::AccessPolicy`].
//!
//! # Modules
//!
//! - [`current_user`]: request extractors
//! - [`password`]: Argon2 hashing and length checks
//! - [`permissions`]: role checks
//! - [`session`]: session token creation and verification

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod session;

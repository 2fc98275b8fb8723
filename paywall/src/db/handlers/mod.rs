//! Repository implementations for database access.
//!
//! Each repository wraps a borrowed `PgConnection` (which may be a
//! transaction) and exposes typed operations over one table:
//!
//! - [`Accounts`]: accounts, credentials, billing linkage
//! - [`Strategies`]: the strategy catalogue
//! - [`UsagePeriods`]: monthly usage records and the atomic view transaction
//! - [`SavedStrategies`]: per-account bookmarks
//!
//! ```ignore
//! let mut conn = pool.acquire().await?;
//! let account = Accounts::new(&mut conn).get_by_id(id).await?;
//! ```
//!
//! [`accounts::PgAccountDirectory`] and [`usage::PgUsageStore`] adapt these
//! repositories to the pool-owning traits the access policy depends on.

pub mod accounts;
pub mod repository;
pub mod saved_strategies;
pub mod strategies;
pub mod usage;

pub use accounts::Accounts;
pub use repository::Repository;
pub use saved_strategies::SavedStrategies;
pub use strategies::Strategies;
pub use usage::UsagePeriods;

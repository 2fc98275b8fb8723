//! Database layer for data persistence and access.
//!
//! SQLx over PostgreSQL, organised with the Repository pattern.
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers, access policy)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries and transactions)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! Migrations live in `migrations/` and are applied at startup through
//! [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;

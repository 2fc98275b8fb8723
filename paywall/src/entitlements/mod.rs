//! Entitlements: who may open which strategy, and how often.
//!
//! ```text
//! Identity ──► AccountDirectory ──► resolve_tier ──► Tier
//!                                                     │
//!          Admin / Active / Quant ◄───────────────────┤
//!          (granted, no storage)                      │
//!                                                     ▼
//!                                     Curious ──► QuotaGate ──► UsageStore
//!                                                 (one atomic transaction per view)
//! ```
//!
//! - [`tier`]: pure mapping from raw account fields to a [`Tier`]
//! - [`period`]: `YYYY-MM` keys for monthly usage records
//! - [`quota`]: the monthly allowance and the [`UsageStore`] seam
//! - [`decision`]: [`AccessPolicy::decide_access`], the single entry point
//! - [`memory`]: in-process stores
//!
//! PostgreSQL implementations of the store traits live in
//! [`crate::db::handlers::usage`] and [`crate::db::handlers::accounts`].

pub mod decision;
pub mod memory;
pub mod period;
pub mod quota;
pub mod tier;

pub use decision::{AccessDecision, AccessPolicy, AccountDirectory, DenialReason, Identity};
pub use period::PeriodKey;
pub use quota::{QUOTA_LIMIT, QuotaGate, UsageStore, ViewOutcome};
pub use tier::{ADMIN_ROLE, AccountSnapshot, Tier, resolve_tier};

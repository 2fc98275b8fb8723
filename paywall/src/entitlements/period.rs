//! Calendar-month usage periods.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

/// `YYYY-MM` key of the UTC calendar month a usage record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(transparent)]
pub struct PeriodKey(String);

impl PeriodKey {
    pub fn for_instant(now: DateTime<Utc>) -> Self {
        Self(now.format("%Y-%m").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<DateTime<Utc>> for PeriodKey {
    fn from(now: DateTime<Utc>) -> Self {
        Self::for_instant(now)
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

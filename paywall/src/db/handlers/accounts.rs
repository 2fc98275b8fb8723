//! Database repository for accounts.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::accounts::{AccountBillingUpdate, AccountCreateDBRequest, AccountDBResponse, AccountUpdateDBRequest},
};
use crate::entitlements::{AccountDirectory, AccountSnapshot};
use crate::types::{AccountId, abbrev_uuid};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, email, display_name, role, subscription_tier, password_hash, payment_customer_id, \
     payment_subscription_id, payment_status, current_period_end, created_at, updated_at";

/// Filter for listing accounts
#[derive(Debug, Clone)]
pub struct AccountFilter {
    pub skip: i64,
    pub limit: i64,
    /// Case-insensitive match on email or display name
    pub search: Option<String>,
}

impl AccountFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit, search: None }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()))
    }
}

pub struct Accounts<'c> {
    db: &'c mut PgConnection,
}

#[async_trait]
impl<'c> Repository for Accounts<'c> {
    type CreateRequest = AccountCreateDBRequest;
    type UpdateRequest = AccountUpdateDBRequest;
    type Response = AccountDBResponse;
    type Id = AccountId;
    type Filter = AccountFilter;

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let account = sqlx::query_as::<_, AccountDBResponse>(&format!(
            "INSERT INTO accounts (id, email, display_name, role, subscription_tier, password_hash)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&request.email)
        .bind(&request.display_name)
        .bind(&request.role)
        .bind(&request.subscription_tier)
        .bind(&request.password_hash)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(account)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let account = sqlx::query_as::<_, AccountDBResponse>(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(account)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let accounts = sqlx::query_as::<_, AccountDBResponse>(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ANY($1)"))
            .bind(ids.as_slice())
            .fetch_all(&mut *self.db)
            .await?;

        Ok(accounts.into_iter().map(|a| (a.id, a)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let accounts = sqlx::query_as::<_, AccountDBResponse>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts
             WHERE $3::TEXT IS NULL OR lower(email) LIKE $3 OR lower(display_name) LIKE $3
             ORDER BY created_at DESC, id
             LIMIT $1 OFFSET $2"
        ))
        .bind(filter.limit)
        .bind(filter.skip)
        .bind(filter.search_pattern())
        .fetch_all(&mut *self.db)
        .await?;

        Ok(accounts)
    }

    /// Usage records and saved strategies go with the account via `ON DELETE CASCADE`.
    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let account = sqlx::query_as::<_, AccountDBResponse>(&format!(
            "UPDATE accounts SET
                email = COALESCE($2, email),
                display_name = COALESCE($3, display_name),
                role = CASE WHEN $4 THEN $5 ELSE role END,
                subscription_tier = CASE WHEN $6 THEN $7 ELSE subscription_tier END,
                password_hash = COALESCE($8, password_hash),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(&request.email)
        .bind(&request.display_name)
        .bind(request.role.is_some())
        .bind(request.role.clone().flatten())
        .bind(request.subscription_tier.is_some())
        .bind(request.subscription_tier.clone().flatten())
        .bind(&request.password_hash)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(account)
    }
}

impl<'c> Accounts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &AccountFilter) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM accounts
             WHERE $1::TEXT IS NULL OR lower(email) LIKE $1 OR lower(display_name) LIKE $1",
        )
        .bind(filter.search_pattern())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(total)
    }

    #[instrument(skip(self, email), err)]
    pub async fn get_by_email(&mut self, email: &str) -> Result<Option<AccountDBResponse>> {
        let account = sqlx::query_as::<_, AccountDBResponse>(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE lower(email) = lower($1)"))
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(account)
    }

    /// Attach a payment customer (and optionally its subscription) to an account.
    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    pub async fn link_payment_customer(&mut self, id: AccountId, customer_id: &str, subscription_id: Option<&str>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET
                payment_customer_id = $2,
                payment_subscription_id = COALESCE($3, payment_subscription_id),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(customer_id)
        .bind(subscription_id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Apply billing state to every account linked to `customer_id`. Returns the number of accounts updated.
    #[instrument(skip(self, update), err)]
    pub async fn update_billing_by_customer(&mut self, customer_id: &str, update: &AccountBillingUpdate) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE accounts SET
                subscription_tier = $2,
                payment_subscription_id = $3,
                payment_status = $4,
                current_period_end = $5,
                updated_at = NOW()
             WHERE payment_customer_id = $1",
        )
        .bind(customer_id)
        .bind(&update.subscription_tier)
        .bind(&update.payment_subscription_id)
        .bind(&update.payment_status)
        .bind(update.current_period_end)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Apply billing state to one account and link it to `customer_id`.
    #[instrument(skip(self, update), fields(account_id = %abbrev_uuid(&id)), err)]
    pub async fn update_billing_by_id(&mut self, id: AccountId, customer_id: &str, update: &AccountBillingUpdate) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET
                payment_customer_id = $2,
                subscription_tier = $3,
                payment_subscription_id = $4,
                payment_status = $5,
                current_period_end = $6,
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(customer_id)
        .bind(&update.subscription_tier)
        .bind(&update.payment_subscription_id)
        .bind(&update.payment_status)
        .bind(update.current_period_end)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// [`AccountDirectory`] backed by the `accounts` table.
#[derive(Clone)]
pub struct PgAccountDirectory {
    pool: PgPool,
}

impl PgAccountDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountDirectory for PgAccountDirectory {
    async fn snapshot(&self, account_id: AccountId) -> Result<Option<AccountSnapshot>> {
        let mut conn = self.pool.acquire().await?;
        let account = Accounts::new(&mut conn).get_by_id(account_id).await?;
        Ok(account.as_ref().map(AccountDBResponse::snapshot))
    }
}

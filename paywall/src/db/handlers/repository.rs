//! Base repository trait for database operations.
//!
//! A repository is the data access layer for one postgres table. It borrows a
//! connection (or a transaction) for its lifetime and exposes typed CRUD
//! operations over that table.

use crate::db::errors::Result;
use std::collections::HashMap;

/// Common CRUD operations, with separate request types for create and update.
#[async_trait::async_trait]
pub trait Repository {
    type CreateRequest;
    type UpdateRequest;
    type Response;
    type Id: Send + Sync;
    type Filter: Send + Sync;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// Fetch several entities at once, keyed by ID. Missing IDs are left out.
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>>;

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Returns false when nothing matched `id`.
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;

    /// Fails with [`crate::db::errors::DbError::NotFound`] when nothing matched `id`.
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response>;
}

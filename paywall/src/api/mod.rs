//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - **Authentication** (`/authentication/*`): login and logout
//! - **Strategies** (`/api/v1/strategies/*`): public listing, gated detail, admin CRUD
//! - **Users** (`/api/v1/users/*`): account management, usage, saved strategies
//! - **Webhooks** (`/webhooks/payments`): subscription changes from the payment processor
//!
//! # OpenAPI Documentation
//!
//! Endpoints are annotated with `utoipa`. The rendered documentation is served at `/docs`.

pub mod handlers;
pub mod models;

//! Role-based permission checks.
//!
//! There are two kinds of caller: administrators (`role = "admin"`) may do everything, and
//! everyone else may read the public catalogue and manage their own usage and bookmarks. The
//! role is read from the account on every request, never from the session token.
//!
//! Handlers declare what they need with the [`RequiresPermission`] extractor:
//!
//! ```ignore
//! async fn delete_strategy(
//!     State(state): State<AppState>,
//!     Path(id): Path<StrategyId>,
//!     _: RequiresPermission<resource::Strategies, operation::DeleteAll>,
//! ) -> Result<StatusCode> { ... }
//! ```

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::instrument;

use crate::{
    AppState,
    api::models::users::CurrentUser,
    db::handlers::{Accounts, Repository},
    entitlements::ADMIN_ROLE,
    errors::{Error, Result},
    types::{Operation, Permission, Resource},
};

/// Compile-time resource markers for [`RequiresPermission`].
pub mod resource {
    use crate::types::Resource;

    pub trait ResourceType: Send + Sync + 'static {
        const RESOURCE: Resource;
    }

    macro_rules! resources {
        ($($name:ident),* $(,)?) => {
            $(
                pub struct $name;
                impl ResourceType for $name {
                    const RESOURCE: Resource = Resource::$name;
                }
            )*
        };
    }

    resources!(Users, Strategies, Usage, SavedStrategies);
}

/// Compile-time operation markers for [`RequiresPermission`].
pub mod operation {
    use crate::types::Operation;

    pub trait OperationType: Send + Sync + 'static {
        const OPERATION: Operation;
    }

    macro_rules! operations {
        ($($name:ident),* $(,)?) => {
            $(
                pub struct $name;
                impl OperationType for $name {
                    const OPERATION: Operation = Operation::$name;
                }
            )*
        };
    }

    operations!(CreateAll, ReadAll, ReadOwn, UpdateAll, UpdateOwn, DeleteAll);
}

/// A caller whose role has been read from the database.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: CurrentUser,
    pub is_admin: bool,
}

/// Whether a caller with the given role may perform `operation` on `resource`.
pub fn has_permission(is_admin: bool, resource: Resource, operation: Operation) -> bool {
    if is_admin {
        return true;
    }

    matches!(
        (resource, operation),
        (Resource::Strategies, Operation::ReadAll)
            | (Resource::Users, Operation::ReadOwn)
            | (Resource::Usage, Operation::ReadOwn)
            | (Resource::SavedStrategies, Operation::ReadOwn | Operation::UpdateOwn)
    )
}

pub fn can_read_all_resources(caller: &Caller, resource: Resource) -> bool {
    has_permission(caller.is_admin, resource, Operation::ReadAll)
}

/// Look up the caller's role. A session for a deleted account is not authenticated.
#[instrument(skip(state, user), fields(account_id = %user.id), err)]
pub async fn load_caller(state: &AppState, user: CurrentUser) -> Result<Caller> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let account = Accounts::new(&mut conn).get_by_id(user.id).await?.ok_or_else(|| Error::Unauthenticated {
        message: Some("Account no longer exists".to_string()),
    })?;

    Ok(Caller {
        is_admin: account.role.as_deref() == Some(ADMIN_ROLE),
        user,
    })
}

/// Extractor that authenticates the caller and checks one permission.
pub struct RequiresPermission<R, O> {
    pub caller: Caller,
    _marker: PhantomData<(R, O)>,
}

impl<R, O> FromRequestParts<AppState> for RequiresPermission<R, O>
where
    R: resource::ResourceType,
    O: operation::OperationType,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = <CurrentUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await?;
        let caller = load_caller(state, user).await?;

        if !has_permission(caller.is_admin, R::RESOURCE, O::OPERATION) {
            return Err(Error::InsufficientPermissions {
                required: Permission::Allow(R::RESOURCE, O::OPERATION),
                action: O::OPERATION,
                resource: R::RESOURCE.to_string(),
            });
        }

        Ok(Self {
            caller,
            _marker: PhantomData,
        })
    }
}

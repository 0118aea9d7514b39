use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use std::sync::Arc;
use time::UtcDateTime;
use ventwall_common::model::{
    Id,
    auth::AuthToken,
    user::{Role, UserMarker},
};
use ventwall_db::Store;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The user a valid bearer token resolves to. Expired tokens and
/// deactivated accounts are rejected here, so handlers only ever see live
/// users.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
    role: Role,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }

    #[must_use]
    pub fn is_admin(self) -> bool {
        self.role.is_admin()
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<dyn Store>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_token: AuthToken = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?
            .token()
            .parse()?;

        let token_hash = request_token.hash()?;

        let store = Arc::<dyn Store>::from_ref(state);
        let authentication = store
            .fetch_auth(&token_hash)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        assert_eq!(authentication.token_hash, token_hash);

        if authentication.expired_at(UtcDateTime::now()) {
            return Err(ServerError::InvalidToken);
        }

        let user = store
            .fetch_user(authentication.user)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        if !user.is_active {
            return Err(ServerError::Deactivated);
        }

        Ok(Self {
            id: user.id,
            role: user.role,
        })
    }
}

/// An [`AuthenticatedUser`] that additionally holds the admin role.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct AdminUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AdminUser
where
    Arc<dyn Store>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(ServerError::Forbidden);
        }

        Ok(Self(user))
    }
}

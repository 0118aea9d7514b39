use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::{Duration, UtcDateTime};
use ventwall_common::{
    model::{
        Id,
        auth::{self, AuthToken, Authentication},
        user::{AnonymousName, Password, Profile, User, UserMarker},
    },
    util::PositiveDuration,
};
use ventwall_db::{Store, store::NewUser};

/// Balance a fresh account starts out with.
const STARTING_TOKENS: i64 = 10;

const AUTH_TOKEN_TTL: Duration = Duration::days(30);

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(register)
        .typed_post(login)
        .typed_get(me)
        .typed_put(update_profile)
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    user: Profile,
    token: String,
}

async fn open_session(store: &dyn Store, user: User) -> Result<SessionResponse> {
    let token = AuthToken::generate_random(user.id);

    store
        .insert_auth(&Authentication {
            user: user.id,
            token_hash: token.hash()?,
            created_at: UtcDateTime::now(),
            expires_after: Some(PositiveDuration::new_unchecked(AUTH_TOKEN_TTL)),
        })
        .await?;

    Ok(SessionResponse {
        user: user.into(),
        token: token.as_token_str(),
    })
}

async fn assert_name_free(
    store: &dyn Store,
    name: &AnonymousName,
    claimant: Option<Id<UserMarker>>,
) -> Result<()> {
    match store.fetch_user_by_name(name).await? {
        Some(holder) if claimant != Some(holder.id) => {
            Err(ServerError::NameTaken(name.clone()))
        }
        _ => Ok(()),
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/register", rejection(ServerError))]
struct RegisterPath();

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    anonymous_name: AnonymousName,
    password: Password,
}

async fn register(
    RegisterPath(): RegisterPath,
    State(store): State<Arc<dyn Store>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>> {
    assert_name_free(store.as_ref(), &request.anonymous_name, None).await?;

    let user = store
        .insert_user(NewUser {
            anonymous_name: request.anonymous_name,
            password_hash: auth::hash_password(request.password.get())?,
            tokens: STARTING_TOKENS,
        })
        .await?;

    Ok(Json(open_session(store.as_ref(), user).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/login", rejection(ServerError))]
struct LoginPath();

#[derive(Debug, Deserialize)]
struct LoginRequest {
    anonymous_name: AnonymousName,
    password: Password,
}

async fn login(
    LoginPath(): LoginPath,
    State(store): State<Arc<dyn Store>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let user = store
        .fetch_user_by_name(&request.anonymous_name)
        .await?
        .ok_or(ServerError::InvalidCredentials)?;

    if !auth::verify_password(request.password.get(), &user.password_hash)? {
        return Err(ServerError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(ServerError::Deactivated);
    }

    Ok(Json(open_session(store.as_ref(), user).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/me", rejection(ServerError))]
struct MePath();

async fn me(
    MePath(): MePath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
) -> Result<Json<Profile>> {
    let user = store
        .fetch_user(user.user_id())
        .await?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    Ok(Json(user.into()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/profile", rejection(ServerError))]
struct UpdateProfilePath();

#[derive(Debug, Deserialize)]
struct UpdateProfileRequest {
    anonymous_name: Option<AnonymousName>,
    password: Option<Password>,
}

async fn update_profile(
    UpdateProfilePath(): UpdateProfilePath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>> {
    let id = user.user_id();

    if let Some(name) = request.anonymous_name {
        assert_name_free(store.as_ref(), &name, Some(id)).await?;
        store.update_user_name(id, &name).await?;
    }
    if let Some(password) = request.password {
        store
            .update_user_password(id, &auth::hash_password(password.get())?)
            .await?;
    }

    let user = store
        .fetch_user(id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(user.into()))
}

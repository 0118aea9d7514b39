use crate::server::{Result, ServerError, ServerRouter, auth::AdminUser, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ventwall_common::model::{
    Id,
    post::PostMarker,
    user::{Profile, UserMarker},
};
use ventwall_db::{Store, ops, store::Stats};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_users)
        .typed_put(toggle_active)
        .typed_get(stats)
        .typed_delete(delete_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/users", rejection(ServerError))]
struct ListUsersPath();

async fn list_users(
    ListUsersPath(): ListUsersPath,
    State(store): State<Arc<dyn Store>>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<Profile>>> {
    let users = store.list_users().await?;

    Ok(Json(users.into_iter().map(Profile::from).collect()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/users/{id}/toggle-active", rejection(ServerError))]
struct ToggleActivePath {
    id: Id<UserMarker>,
}

async fn toggle_active(
    ToggleActivePath { id }: ToggleActivePath,
    State(store): State<Arc<dyn Store>>,
    AdminUser(_): AdminUser,
) -> Result<Json<Profile>> {
    let user = store
        .fetch_user(id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))?;

    store.set_user_active(id, !user.is_active).await?;

    let user = store
        .fetch_user(id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(user.into()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/stats", rejection(ServerError))]
struct StatsPath();

async fn stats(
    StatsPath(): StatsPath,
    State(store): State<Arc<dyn Store>>,
    AdminUser(_): AdminUser,
) -> Result<Json<Stats>> {
    Ok(Json(store.stats().await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/posts/{id}", rejection(ServerError))]
struct DeletePostPath {
    id: Id<PostMarker>,
}

#[derive(Debug, Serialize)]
struct DeletedResponse {
    deleted: bool,
}

async fn delete_post(
    DeletePostPath { id }: DeletePostPath,
    State(store): State<Arc<dyn Store>>,
    AdminUser(_): AdminUser,
) -> Result<Json<DeletedResponse>> {
    let deleted = ops::delete_post(store.as_ref(), id).await?;

    Ok(Json(DeletedResponse { deleted }))
}

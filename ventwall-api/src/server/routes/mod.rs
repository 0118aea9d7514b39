use crate::server::ServerRouter;
use axum::Router;

mod admin;
mod auth;
mod comments;
mod posts;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(auth::routes())
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(admin::routes())
}

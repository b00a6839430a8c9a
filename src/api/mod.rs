//! All API endpoint setup

use axum::Router;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;

use crate::storage::Storage;

pub use current_user::CurrentUser;
pub use current_user::JwtKeys;
pub use request::Form;
pub use request::PathParameters;
pub use response::Error;
pub use response::Success;

mod current_user;
mod meetings;
mod request;
mod response;
mod users;

/// Get the Axum router for all API routes
pub fn router<S: Storage>() -> Router {
    let users = Router::new()
        .route("/token", post(users::token::<S>))
        .route("/", post(users::create::<S>))
        .route("/me", get(users::me::<S>))
        .route("/{user}", delete(users::delete::<S>));

    let meetings = Router::new()
        .route("/", get(meetings::list::<S>).post(meetings::create::<S>))
        .route("/delete-many", post(meetings::delete_many::<S>))
        .route(
            "/{meeting}",
            get(meetings::single::<S>)
                .put(meetings::update::<S>)
                .delete(meetings::delete::<S>),
        );

    Router::new()
        .nest("/users", users)
        .nest("/meetings", meetings)
}

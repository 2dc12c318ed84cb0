pub mod catalog;
pub mod error;
pub mod films;
pub mod users;

pub use error::*;

use axum::{routing::get, routing::put, Router};

use crate::server::AppState;

pub fn build_api_router() -> Router<AppState> {
    let film_routes = Router::new()
        .route(
            "/films",
            get(films::list_films)
                .post(films::create_film)
                .put(films::update_film)
                .delete(films::clear_films),
        )
        .route("/films/popular", get(films::popular_films))
        .route("/films/:id", get(films::get_film))
        .route(
            "/films/:id/like/:user_id",
            put(films::add_like).delete(films::delete_like),
        );

    let user_routes = Router::new()
        .route(
            "/users",
            get(users::list_users)
                .post(users::create_user)
                .put(users::update_user)
                .delete(users::clear_users),
        )
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/friends", get(users::list_friends))
        .route(
            "/users/:id/friends/:friend_id",
            put(users::add_friend).delete(users::delete_friend),
        )
        .route(
            "/users/:id/friends/common/:other_id",
            get(users::common_friends),
        );

    let catalog_routes = Router::new()
        .route("/genres", get(catalog::list_genres))
        .route("/genres/:id", get(catalog::get_genre))
        .route("/mpa", get(catalog::list_ratings))
        .route("/mpa/:id", get(catalog::get_rating));

    Router::new()
        .merge(film_routes)
        .merge(user_routes)
        .merge(catalog_routes)
}

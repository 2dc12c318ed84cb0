use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use filmorate_rs::db::{MemoryRepository, Repository, SqliteRepository};
use filmorate_rs::server::{build_router, AppState};

fn memory_app() -> Router {
    let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
    build_router(AppState::new(repo))
}

async fn sqlite_app() -> Router {
    let repo: Arc<dyn Repository> =
        Arc::new(SqliteRepository::new("sqlite::memory:").await.unwrap());
    build_router(AppState::new(repo))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn film_json(name: &str) -> Value {
    json!({
        "name": name,
        "description": "Lumière brothers short",
        "releaseDate": "1896-01-25",
        "duration": 50,
        "mpa": { "id": 1 },
        "genres": [{ "id": 5 }, { "id": 5 }]
    })
}

fn user_json(login: &str) -> Value {
    json!({
        "login": login,
        "name": "",
        "email": format!("{}@mail.ru", login),
        "birthday": "1946-08-20"
    })
}

fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_i64().unwrap())
        .collect()
}

async fn film_lifecycle(app: Router) {
    let (status, film) = call(&app, Method::POST, "/films", Some(film_json("Arrival"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(film["id"], 1);
    assert_eq!(film["duration"], 50);
    assert_eq!(film["mpa"]["name"], "G");
    assert_eq!(film["genres"], json!([{ "id": 5, "name": "Документальный" }]));

    let mut changed = film.clone();
    changed["name"] = json!("Arrival of a Train");
    let (status, updated) = call(&app, Method::PUT, "/films", Some(changed)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Arrival of a Train");

    let (status, fetched) = call(&app, Method::GET, "/films/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, updated);

    let (status, body) = call(&app, Method::GET, "/films/9", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Film"));

    let mut unknown = film_json("Ghost");
    unknown["id"] = json!(9);
    let (status, _) = call(&app, Method::PUT, "/films", Some(unknown)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = call(&app, Method::GET, "/films", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&list), vec![1]);

    let (status, _) = call(&app, Method::DELETE, "/films", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, list) = call(&app, Method::GET, "/films", None).await;
    assert_eq!(list, json!([]));
}

async fn film_validation(app: Router) {
    let mut early = film_json("Too early");
    early["releaseDate"] = json!("1895-12-27");
    let (status, body) = call(&app, Method::POST, "/films", Some(early)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let mut negative = film_json("Negative");
    negative["duration"] = json!(-1);
    let (status, _) = call(&app, Method::POST, "/films", Some(negative)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut long = film_json("Long");
    long["description"] = json!("x".repeat(201));
    let (status, _) = call(&app, Method::POST, "/films", Some(long)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_mpa = film_json("Unrated");
    bad_mpa["mpa"] = json!({ "id": 6 });
    let (status, _) = call(&app, Method::POST, "/films", Some(bad_mpa)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::POST, "/films", Some(json!({ "name": 1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

async fn users_and_friends(app: Router) {
    for login in ["common", "first", "second"] {
        let (status, user) = call(&app, Method::POST, "/users", Some(user_json(login))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user["name"], login);
    }

    let (status, _) = call(&app, Method::POST, "/users", Some(user_json("with space"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, user) = call(&app, Method::PUT, "/users/2/friends/3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["friends"], json!({ "3": "UNCONFIRMED" }));

    let (_, friends) = call(&app, Method::GET, "/users/3/friends", None).await;
    assert_eq!(friends, json!([]));

    let (_, user) = call(&app, Method::PUT, "/users/3/friends/2", None).await;
    assert_eq!(user["friends"], json!({ "2": "CONFIRMED" }));
    let (_, user) = call(&app, Method::GET, "/users/2", None).await;
    assert_eq!(user["friends"], json!({ "3": "CONFIRMED" }));

    call(&app, Method::PUT, "/users/2/friends/1", None).await;
    call(&app, Method::PUT, "/users/3/friends/1", None).await;
    let (status, common) = call(&app, Method::GET, "/users/2/friends/common/3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&common), vec![1]);

    let (_, friends) = call(&app, Method::GET, "/users/2/friends", None).await;
    assert_eq!(ids(&friends), vec![1, 3]);

    let (status, _) = call(&app, Method::DELETE, "/users/3/friends/2", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, friends) = call(&app, Method::GET, "/users/2/friends", None).await;
    assert_eq!(ids(&friends), vec![1]);

    let (status, _) = call(&app, Method::PUT, "/users/2/friends/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::GET, "/users/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut update = user_json("first");
    update["id"] = json!(2);
    update["name"] = json!("First User");
    let (status, user) = call(&app, Method::PUT, "/users", Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["name"], "First User");
}

async fn null_optional_fields(app: Router) {
    let body = json!({
        "login": "dolore",
        "name": null,
        "email": "mail@localhost",
        "birthday": "1946-08-20"
    });
    let (status, user) = call(&app, Method::POST, "/users", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["name"], "dolore");
    assert_eq!(user["email"], "mail@localhost");

    let mut film = film_json("Arrival");
    film["description"] = Value::Null;
    let (status, film) = call(&app, Method::POST, "/films", Some(film)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(film["description"], "");
}

async fn likes_and_popular(app: Router) {
    for name in ["one", "two", "three"] {
        call(&app, Method::POST, "/films", Some(film_json(name))).await;
    }
    for login in ["u1", "u2", "u3"] {
        call(&app, Method::POST, "/users", Some(user_json(login))).await;
    }
    for (film, user) in [(2, 1), (2, 2), (2, 3), (1, 1), (1, 2), (3, 1)] {
        let (status, _) = call(&app, Method::PUT, &format!("/films/{}/like/{}", film, user), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, film) = call(&app, Method::PUT, "/films/3/like/1", None).await;
    assert_eq!(film["likes"], json!([1]));

    let (_, popular) = call(&app, Method::GET, "/films/popular?count=5", None).await;
    assert_eq!(ids(&popular), vec![2, 1, 3]);
    let (_, popular) = call(&app, Method::GET, "/films/popular?count=1", None).await;
    assert_eq!(ids(&popular), vec![2]);
    let (_, popular) = call(&app, Method::GET, "/films/popular", None).await;
    assert_eq!(ids(&popular), vec![2, 1, 3]);

    let (status, _) = call(&app, Method::GET, "/films/popular?count=-1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, Method::GET, "/films/popular?count=many", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, film) = call(&app, Method::DELETE, "/films/3/like/1", None).await;
    assert_eq!(film["likes"], json!([]));
    let (status, _) = call(&app, Method::DELETE, "/films/3/like/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn catalog(app: Router) {
    let (status, genres) = call(&app, Method::GET, "/genres", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&genres), vec![1, 2, 3, 4, 5, 6]);

    let (_, genre) = call(&app, Method::GET, "/genres/1", None).await;
    assert_eq!(genre, json!({ "id": 1, "name": "Комедия" }));

    let (_, ratings) = call(&app, Method::GET, "/mpa", None).await;
    assert_eq!(ratings.as_array().unwrap().len(), 5);

    let (_, rating) = call(&app, Method::GET, "/mpa/5", None).await;
    assert_eq!(rating["name"], "NC-17");

    let (status, _) = call(&app, Method::GET, "/mpa/6", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::GET, "/genres/0", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::GET, "/directors", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

macro_rules! api_test {
    ($name:ident) => {
        mod $name {
            use super::*;

            #[tokio::test]
            async fn memory() {
                super::$name(memory_app()).await;
            }

            #[tokio::test]
            async fn sqlite() {
                super::$name(sqlite_app().await).await;
            }
        }
    };
}

api_test!(film_lifecycle);
api_test!(film_validation);
api_test!(users_and_friends);
api_test!(null_optional_fields);
api_test!(likes_and_popular);
api_test!(catalog);

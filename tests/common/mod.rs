#![allow(dead_code)]

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use spark::{Spark, SparkConfig};
use spark_auth::MemoryStorage;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const USER_ID: &str = "user-1";

pub fn spark_for(server: &MockServer) -> (Spark, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let config = SparkConfig::new(&server.uri(), "test_anon_key").unwrap();
    let spark = Spark::with_storage(config, Client::new(), storage.clone());
    (spark, storage)
}

pub fn user_body(username: &str) -> Value {
    json!({
        "id": USER_ID,
        "email": "alice@x.com",
        "user_metadata": { "username": username }
    })
}

pub fn session_body(access_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "refresh_token": "test_refresh_token",
        "expires_in": 3600,
        "token_type": "bearer",
        "user": user_body("alice")
    })
}

pub fn profile_body(username: &str) -> Value {
    json!({
        "id": USER_ID,
        "username": username,
        "email": "alice@x.com",
        "bio": null,
        "created_at": "2024-01-01T00:00:00+00:00"
    })
}

pub fn link_body(id: &str, platform: &str, position: u32) -> Value {
    json!({
        "id": id,
        "profile_id": USER_ID,
        "platform": platform,
        "url": format!("https://{}.com/alice", platform),
        "title": platform,
        "position": position,
        "is_active": true,
        "created_at": "2024-01-01T00:00:00+00:00",
        "updated_at": "2024-01-01T00:00:00+00:00"
    })
}

/// Matches requests whose JSON body satisfies `check`.
pub fn json_body<F>(check: F) -> impl Fn(&Request) -> bool + Send + Sync
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    move |request: &Request| {
        serde_json::from_slice::<Value>(&request.body)
            .map(|body| check(&body))
            .unwrap_or(false)
    }
}

pub async fn mount_sign_in(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("access-1")))
        .mount(server)
        .await;
}

pub async fn mount_user(server: &MockServer, username: &str) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body(username)))
        .mount(server)
        .await;
}

pub async fn mount_profile(server: &MockServer, username: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", format!("eq.{}", USER_ID).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([profile_body(username)])))
        .mount(server)
        .await;
}

/// Everything a password sign-in followed by the user fetch needs.
pub async fn mount_signed_in_backend(server: &MockServer, username: &str) {
    mount_sign_in(server).await;
    mount_user(server, username).await;
    mount_profile(server, username).await;
}

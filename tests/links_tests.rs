mod common;

use common::*;
use serde_json::{json, Value};
use spark::links::{LinkList, NewSocialLink, Platform, SocialLinkPatch};
use spark::prelude::*;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Echoes an inserted row back with an id, the way the table does.
struct InsertEcho;

impl Respond for InsertEcho {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let rows: Vec<Value> = serde_json::from_slice(&request.body).unwrap();
        let created: Vec<Value> = rows
            .into_iter()
            .map(|mut row| {
                let id = format!("link-{}", row["position"]);
                row["id"] = json!(id);
                row
            })
            .collect();
        ResponseTemplate::new(201).set_body_json(created)
    }
}

async fn mount_insert(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/social_links"))
        .respond_with(InsertEcho)
        .mount(server)
        .await;
}

fn github() -> NewSocialLink {
    NewSocialLink::new(Platform::GitHub, "https://github.com/alice", "Code")
}

#[tokio::test]
async fn test_list_orders_by_position() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/social_links"))
        .and(query_param("profile_id", "eq.user-1"))
        .and(query_param("order", "position.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            link_body("b", "twitter", 2),
            link_body("a", "github", 0),
            link_body("c", "website", 1),
            link_body("d", "mastodon", 1),
        ])))
        .mount(&server)
        .await;
    let (spark, _storage) = spark_for(&server);

    let links = spark.links().list(USER_ID).await.unwrap();

    let order: Vec<&str> = links.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(order, ["a", "c", "d", "b"]);
    assert!(links.windows(2).all(|w| w[0].position <= w[1].position));
    assert_eq!(links[2].platform, Platform::Other("mastodon".to_string()));
}

#[tokio::test]
async fn test_list_is_empty_when_nothing_stored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/social_links"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let (spark, _storage) = spark_for(&server);

    assert!(spark.links().list(USER_ID).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_surfaces_transport_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/social_links"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&server)
        .await;
    let (spark, _storage) = spark_for(&server);

    let err = spark.links().list(USER_ID).await.unwrap_err();
    assert!(matches!(err, Error::Remote(_)));
}

#[tokio::test]
async fn test_add_appends_at_list_length() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/social_links"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    mount_insert(&server).await;
    let (spark, _storage) = spark_for(&server);

    let mut list = spark.link_list(USER_ID).await.unwrap();
    let first = list.add(github()).await.unwrap();
    let second = list
        .add(NewSocialLink::new(Platform::LinkedIn, "https://linkedin.com/in/alice", "Work"))
        .await
        .unwrap();

    assert_eq!(first.position, 0);
    assert_eq!(second.position, 1);
    assert!(first.is_active);
    assert_eq!(list.len(), 2);
}

#[tokio::test]
async fn test_stale_list_reuses_position() {
    let server = MockServer::start().await;
    mount_insert(&server).await;
    let (spark, _storage) = spark_for(&server);

    let mut first_view = LinkList::new(spark.links(), USER_ID);
    let mut second_view = LinkList::new(spark.links(), USER_ID);

    let a = first_view.add(github()).await.unwrap();
    let b = second_view.add(github()).await.unwrap();

    assert_eq!(a.position, 0);
    assert_eq!(b.position, 0);
}

#[tokio::test]
async fn test_add_sends_owner_and_platform_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/social_links"))
        .and(json_body(|body| {
            body[0]["profile_id"] == "user-1"
                && body[0]["platform"] == "github"
                && body[0]["position"] == 3
                && body[0]["is_active"] == true
        }))
        .respond_with(InsertEcho)
        .expect(1)
        .mount(&server)
        .await;
    let (spark, _storage) = spark_for(&server);

    spark.links().add(USER_ID, &github(), 3).await.unwrap();
}

#[tokio::test]
async fn test_add_rejects_missing_fields_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(InsertEcho)
        .expect(0)
        .mount(&server)
        .await;
    let (spark, _storage) = spark_for(&server);

    let link = NewSocialLink::new(Platform::GitHub, "https://github.com/alice", "");
    let err = spark.links().add(USER_ID, &link, 0).await.unwrap_err();

    assert_eq!(err.to_string(), "Title is required");
}

#[tokio::test]
async fn test_update_replaces_element_in_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/social_links"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            link_body("a", "github", 0),
            link_body("b", "twitter", 1),
        ])))
        .mount(&server)
        .await;
    let mut renamed = link_body("b", "twitter", 1);
    renamed["title"] = json!("Tweets");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/social_links"))
        .and(query_param("id", "eq.b"))
        .and(json_body(|body| *body == json!({ "title": "Tweets" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([renamed])))
        .expect(1)
        .mount(&server)
        .await;
    let (spark, _storage) = spark_for(&server);

    let mut list = spark.link_list(USER_ID).await.unwrap();
    let patch = SocialLinkPatch {
        title: Some("Tweets".to_string()),
        ..Default::default()
    };
    list.update("b", &patch).await.unwrap();

    assert_eq!(list.links()[1].title, "Tweets");
    assert_eq!(list.links()[0].title, "github");
}

#[tokio::test]
async fn test_empty_patch_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let (spark, _storage) = spark_for(&server);

    let err = spark
        .links()
        .update("a", &SocialLinkPatch::default())
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(err.to_string(), "Nothing to update");
}

#[tokio::test]
async fn test_delete_keeps_other_positions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/social_links"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            link_body("a", "github", 0),
            link_body("b", "twitter", 1),
            link_body("c", "website", 2),
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/social_links"))
        .and(query_param("id", "eq.b"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/social_links"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            link_body("a", "github", 0),
            link_body("c", "website", 2),
        ])))
        .mount(&server)
        .await;
    let (spark, _storage) = spark_for(&server);

    let mut list = spark.link_list(USER_ID).await.unwrap();
    list.delete("b").await.unwrap();

    let local: Vec<(&str, u32)> = list.links().iter().map(|l| (l.id.as_str(), l.position)).collect();
    assert_eq!(local, [("a", 0), ("c", 2)]);

    let remote = list.reload().await.unwrap();
    assert!(remote.iter().all(|l| l.id != "b"));
    assert_eq!(remote[1].position, 2);
}

use serde_json::json;

use super::*;
use crate::test_helpers::FakeBackend;

fn follow_row(follower: &str, following: &str) -> serde_json::Value {
    json!({
        "follower_id": follower,
        "following_id": following,
        "created_at": "2024-05-04T18:00:00+00:00"
    })
}

#[tokio::test]
async fn follow_user_inserts_edge() {
    let fake = FakeBackend::start().await;
    fake.respond("POST", "/rest/v1/follows", 201, json!([follow_row("u1", "u2")]));
    let client = fake.client();

    let follow = follow_user(&client.rest(Some("jwt")), "u1", "u2").await.unwrap();
    assert_eq!(follow.following_id, "u2");
    assert_eq!(fake.last_request().json(), json!({ "follower_id": "u1", "following_id": "u2" }));
}

#[tokio::test]
async fn follow_self_is_rejected() {
    let fake = FakeBackend::start().await;
    let client = fake.client();

    let err = follow_user(&client.rest(Some("jwt")), "u1", "u1").await.unwrap_err();
    assert_eq!(err.to_string(), "invalid input: cannot follow yourself");
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn unfollow_filters_both_ends() {
    let fake = FakeBackend::start().await;
    fake.respond("DELETE", "/rest/v1/follows", 200, json!([]));
    let client = fake.client();

    unfollow_user(&client.rest(Some("jwt")), "u1", "u2").await.unwrap();
    let query = fake.last_request().query;
    assert!(query.contains("follower_id=eq.u1"));
    assert!(query.contains("following_id=eq.u2"));
}

#[tokio::test]
async fn followers_and_following_query_opposite_columns() {
    let fake = FakeBackend::start().await;
    fake.respond("GET", "/rest/v1/follows", 200, json!([follow_row("u2", "u1"), follow_row("u3", "u1")]));
    let client = fake.client();
    let rest = client.rest(None);

    let followers = list_followers(&rest, "u1").await.unwrap();
    assert_eq!(followers.len(), 2);
    assert!(fake.last_request().query.contains("following_id=eq.u1"));

    list_following(&rest, "u1").await.unwrap();
    assert!(fake.last_request().query.contains("follower_id=eq.u1"));
}

#[tokio::test]
async fn is_following_reflects_rows() {
    let fake = FakeBackend::start().await;
    fake.respond("GET", "/rest/v1/follows", 200, json!([]));
    let client = fake.client();
    assert!(!is_following(&client.rest(None), "u1", "u2").await.unwrap());
}

#[tokio::test]
async fn unfollow_requires_session() {
    let fake = FakeBackend::start().await;
    let client = fake.client();
    assert!(matches!(unfollow_user(&client.rest(None), "u1", "u2").await, Err(BackendError::NoSession)));
}

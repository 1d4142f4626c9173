mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use journal_api::database::Collection;

#[tokio::test]
async fn missing_profile_reads_as_null() -> Result<()> {
    let server = common::TestServer::start().await?;

    let res = server
        .client
        .get(server.url("/userProfile/public"))
        .bearer_auth(server.token_for(Uuid::new_v4())?)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?, json!({ "data": null, "success": true }));
    Ok(())
}

#[tokio::test]
async fn upsert_strips_avatar_scheme_and_forces_session_id() -> Result<()> {
    let server = common::TestServer::start().await?;
    let user = Uuid::new_v4();
    let token = server.token_for(user)?;

    let res = server
        .client
        .put(server.url("/userProfile/public"))
        .bearer_auth(&token)
        .json(&json!({
            "id": Uuid::new_v4(),
            "avatar_url": "https://x.com/a.png",
            "display_name": "Kit"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?, json!({ "success": true }));

    let stored = server.store.rows(Collection::Profiles).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["id"], json!(user));
    assert_eq!(stored[0]["avatar_url"], "x.com/a.png");

    // A second upsert merges into the same row
    server
        .client
        .put(server.url("/userProfile/public"))
        .bearer_auth(&token)
        .json(&json!({ "bio": "hello" }))
        .send()
        .await?;

    let body = server
        .client
        .get(server.url("/userProfile/public"))
        .bearer_auth(&token)
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert!(common::success(&body));
    assert_eq!(body["data"]["display_name"], "Kit");
    assert_eq!(body["data"]["bio"], "hello");
    assert_eq!(server.store.rows(Collection::Profiles).await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn empty_update_deletes_profile() -> Result<()> {
    let server = common::TestServer::start().await?;
    let user = Uuid::new_v4();
    let token = server.token_for(user)?;

    let mut other = journal_api::database::Row::new();
    other.insert("id".to_string(), json!(Uuid::new_v4()));
    let mut mine = journal_api::database::Row::new();
    mine.insert("id".to_string(), json!(user));
    server.store.seed(Collection::Profiles, [mine, other]).await;

    let res = server
        .client
        .put(server.url("/userProfile/public"))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?, json!({ "success": true }));

    let stored = server.store.rows(Collection::Profiles).await;
    assert_eq!(stored.len(), 1, "only the caller's profile is removed");
    assert_ne!(stored[0]["id"], json!(user));
    Ok(())
}

#[tokio::test]
async fn non_object_body_is_rejected() -> Result<()> {
    let server = common::TestServer::start().await?;

    let res = server
        .client
        .put(server.url("/userProfile/public"))
        .bearer_auth(server.token_for(Uuid::new_v4())?)
        .json(&json!(["avatar_url"]))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.store.mutation_count(), 0);
    Ok(())
}

#[tokio::test]
async fn profile_store_failure_is_a_500() -> Result<()> {
    let server = common::TestServer::start().await?;
    let token = server.token_for(Uuid::new_v4())?;
    server.store.fail_with("permission denied for table profiles").await;

    let res = server
        .client
        .put(server.url("/userProfile/public"))
        .bearer_auth(&token)
        .json(&json!({ "bio": "x" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], "permission denied for table profiles");

    let res = server
        .client
        .get(server.url("/userProfile/public"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}

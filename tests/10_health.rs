mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn root_describes_service() -> Result<()> {
    let server = common::TestServer::start().await?;

    let res = server.client.get(server.url("/")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<Value>().await?;
    assert!(common::success(&body), "success flag false or missing: {}", body);
    assert!(body["data"]["endpoints"]["journal"].is_string(), "missing journal endpoint: {}", body);
    Ok(())
}

#[tokio::test]
async fn health_reports_store_liveness() -> Result<()> {
    let server = common::TestServer::start().await?;

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["status"], "ok");

    server.store.fail_with("connection refused").await;
    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["status"], "degraded");
    assert_eq!(body["data"]["database_error"], "connection refused");
    Ok(())
}

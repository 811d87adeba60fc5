mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{assert_fail, send, spawn_server, PASSWORD};

#[tokio::test]
async fn register_returns_public_user_and_token() -> Result<()> {
    let server = spawn_server().await?;

    let (status, body) = server
        .post_public("/users/register", json!({ "name": "Ann", "email": "ann@x.com", "password": PASSWORD }))
        .await?;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["name"], "Ann");
    assert_eq!(body["data"]["email"], "ann@x.com");
    assert_eq!(body["data"]["_id"].as_str().map(str::len), Some(24));
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_is_rejected() -> Result<()> {
    let server = spawn_server().await?;
    server.register("Ann", "ann@x.com").await?;

    let (status, body) = server
        .post_public("/users/register", json!({ "name": "Ann", "email": "ann@x.com", "password": PASSWORD }))
        .await?;

    assert_fail(status, &body, StatusCode::BAD_REQUEST, "USER_ALREADY_EXISTS");
    assert_eq!(body["errors"]["email"], "ann@x.com");
    Ok(())
}

#[tokio::test]
async fn registration_reports_each_field_separately() -> Result<()> {
    let server = spawn_server().await?;

    let cases = [
        (json!({ "name": "A", "email": "ann@x.com", "password": PASSWORD }), "INVALID_NAME"),
        (json!({ "email": "ann@x.com", "password": PASSWORD }), "INVALID_NAME"),
        (json!({ "name": "Ann", "email": "not-an-email", "password": PASSWORD }), "INVALID_EMAIL"),
        (json!({ "name": "Ann", "email": "ann@x.com", "password": "short" }), "INVALID_PASSWORD"),
        // first failing check wins
        (json!({ "name": "A", "email": "bad", "password": "short" }), "INVALID_NAME"),
    ];

    for (payload, code) in cases {
        let (status, body) = server.post_public("/users/register", payload).await?;
        assert_fail(status, &body, StatusCode::BAD_REQUEST, code);
    }

    let (_, body) = server
        .post_public("/users/register", json!({ "name": "Ann", "email": "ann@x.com", "password": "short" }))
        .await?;
    assert_eq!(body["errors"]["password"], serde_json::Value::Null);
    Ok(())
}

#[tokio::test]
async fn login_returns_user_and_token() -> Result<()> {
    let server = spawn_server().await?;
    let (id, _) = server.register("Ann", "ann@x.com").await?;

    let (status, body) = server
        .post_public("/users/login", json!({ "email": "ann@x.com", "password": PASSWORD }))
        .await?;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["user"]["_id"], id);
    assert!(body.get("data").is_none());

    let token = body["token"].as_str().unwrap();
    let (status, _) = send(server.get(&format!("/users/{}", id), token)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn login_does_not_reveal_which_credential_failed() -> Result<()> {
    let server = spawn_server().await?;
    server.register("Ann", "ann@x.com").await?;

    for payload in [
        json!({ "email": "ann@x.com", "password": "wrong-password" }),
        json!({ "email": "nobody@x.com", "password": PASSWORD }),
    ] {
        let (status, body) = server.post_public("/users/login", payload).await?;
        assert_fail(status, &body, StatusCode::UNAUTHORIZED, "INVALID_EMAIL_OR_PASSWORD");
        assert_eq!(body["message"], "Invalid email or password");
        assert_eq!(body["errors"], json!({}));
    }

    for payload in [
        json!({ "email": "not-an-email", "password": PASSWORD }),
        json!({ "email": "ann@x.com", "password": "short" }),
    ] {
        let (status, body) = server.post_public("/users/login", payload).await?;
        assert_fail(status, &body, StatusCode::BAD_REQUEST, "INVALID_EMAIL_OR_PASSWORD");
    }
    Ok(())
}

#[tokio::test]
async fn users_can_only_see_themselves() -> Result<()> {
    let server = spawn_server().await?;
    let (ann, ann_token) = server.register("Ann", "ann@x.com").await?;
    let (bob, _) = server.register("Bob", "bob@x.com").await?;

    let (status, body) = send(server.get(&format!("/users/{}", ann), &ann_token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "ann@x.com");

    let (status, body) = send(server.get(&format!("/users/{}", bob), &ann_token)).await?;
    assert_fail(status, &body, StatusCode::NOT_FOUND, "USER_NOT_FOUND");
    assert_eq!(body["errors"]["id"], bob);

    let (status, body) = send(server.delete(&format!("/users/{}", bob), &ann_token)).await?;
    assert_fail(status, &body, StatusCode::NOT_FOUND, "USER_NOT_FOUND");

    let (status, body) = send(server.get("/users/not-an-id", &ann_token)).await?;
    assert_fail(status, &body, StatusCode::BAD_REQUEST, "INVALID_ID");
    Ok(())
}

#[tokio::test]
async fn list_users_is_sorted_and_paged() -> Result<()> {
    let server = spawn_server().await?;
    let (_, token) = server.register("Carol", "carol@x.com").await?;
    server.register("Ann", "ann@x.com").await?;
    server.register("Bob", "bob@x.com").await?;

    let (status, body) = send(server.get("/users?sort=name&direction=asc", &token)).await?;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body["data"].as_array().unwrap().iter().map(|u| u["name"].clone()).collect();
    assert_eq!(names, [json!("Ann"), json!("Bob"), json!("Carol")]);

    let (_, body) = send(server.get("/users?sort=name&direction=asc&pageNumber=2&pageSize=2", &token)).await?;
    let names: Vec<_> = body["data"].as_array().unwrap().iter().map(|u| u["name"].clone()).collect();
    assert_eq!(names, [json!("Carol")]);
    Ok(())
}

#[tokio::test]
async fn update_is_allow_listed() -> Result<()> {
    let server = spawn_server().await?;
    let (id, token) = server.register("Ann", "ann@x.com").await?;

    let (status, body) = send(server.put(
        &format!("/users/{}", id),
        &token,
        json!({ "name": "Annie", "email": "annie@x.com", "active": false, "_id": "000000000000000000000000" }),
    ))
    .await?;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["_id"], id);
    assert_eq!(body["data"]["name"], "Annie");
    assert_eq!(body["data"]["email"], "annie@x.com");
    assert_eq!(body["data"]["active"], true);
    assert!(body["token"].is_string());

    // password untouched when omitted
    let (status, _) = server
        .post_public("/users/login", json!({ "email": "annie@x.com", "password": PASSWORD }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn update_with_password_changes_credentials() -> Result<()> {
    let server = spawn_server().await?;
    let (id, token) = server.register("Ann", "ann@x.com").await?;

    let (status, body) = send(server.put(
        &format!("/users/{}", id),
        &token,
        json!({ "name": "Ann", "email": "ann@x.com", "password": "brand-new-pw" }),
    ))
    .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let fresh = body["token"].as_str().unwrap().to_string();

    let (status, _) = server
        .post_public("/users/login", json!({ "email": "ann@x.com", "password": PASSWORD }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = server
        .post_public("/users/login", json!({ "email": "ann@x.com", "password": "brand-new-pw" }))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(server.get(&format!("/users/{}", id), &fresh)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn update_cannot_take_another_users_email() -> Result<()> {
    let server = spawn_server().await?;
    let (id, token) = server.register("Ann", "ann@x.com").await?;
    server.register("Bob", "bob@x.com").await?;

    let (status, body) = send(server.put(
        &format!("/users/{}", id),
        &token,
        json!({ "name": "Ann", "email": "bob@x.com" }),
    ))
    .await?;
    assert_fail(status, &body, StatusCode::BAD_REQUEST, "USER_ALREADY_EXISTS");
    Ok(())
}

#[tokio::test]
async fn delete_returns_removed_user() -> Result<()> {
    let server = spawn_server().await?;
    let (id, token) = server.register("Ann", "ann@x.com").await?;

    let (status, body) = send(server.delete(&format!("/users/{}", id), &token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["_id"], id);

    let (status, _) = server
        .post_public("/users/login", json!({ "email": "ann@x.com", "password": PASSWORD }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn authenticated_create_registers_another_user() -> Result<()> {
    let server = spawn_server().await?;
    let (_, token) = server.register("Ann", "ann@x.com").await?;

    let (status, body) = send(server.post(
        "/users",
        &token,
        json!({ "name": "Bob", "email": "bob@x.com", "password": PASSWORD }),
    ))
    .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["email"], "bob@x.com");

    let (status, _) = send(server.client.post(server.url("/users")).json(&json!({}))).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

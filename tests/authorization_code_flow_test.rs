// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! End-to-end authorization code flow: login form, credential submission,
//! code exchange and the resulting tokens.

mod common;

use rocket::http::{ContentType, Status};
use serde_json::Value;

use common::{decode_payload, form_body, parse_params, test_client, test_config};

#[rocket::async_test]
async fn authorization_code_flow_end_to_end() {
    let client = test_client(test_config()).await;

    // Step 1: the authorize GET renders the login form with the request
    // preserved as hidden fields.
    let response = client
        .get("/login?response_type=code&client_id=cli1&redirect_uri=https://app/cb&scope=openid%20profile&state=xyz")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let login_html = response.into_string().await.expect("HTML response body");
    assert!(login_html.contains("<form"), "Response should contain a form");

    let action = regex::Regex::new(r#"<form method="post" action="([^"]+)""#)
        .unwrap()
        .captures(&login_html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .expect("Should extract form action from login page");
    assert_eq!(action, "/login");

    let hidden =
        regex::Regex::new(r#"<input type="hidden" name="state" value="([^"]*)""#).unwrap();
    let state_field = hidden
        .captures(&login_html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());
    assert_eq!(state_field.as_deref(), Some("xyz"));

    // Step 2: submit credentials; the response redirects to the client
    // with the code in the query and the state echoed.
    let response = client
        .post(&action)
        .header(ContentType::Form)
        .body(form_body(&[
            ("response_type", "code"),
            ("client_id", "cli1"),
            ("redirect_uri", "https://app/cb"),
            ("scope", "openid profile"),
            ("state", "xyz"),
            ("username", "alice"),
            ("password", "secret"),
        ]))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Found);

    let location = response
        .headers()
        .get_one("Location")
        .expect("Should have location header")
        .to_string();
    assert!(location.starts_with("https://app/cb?"));
    assert!(!location.contains('#'), "code flow must not use the fragment");

    let query = location.split('?').nth(1).unwrap();
    let params = parse_params(query);
    let code = params.get("code").expect("code should be present").clone();
    assert_eq!(params.get("state").map(String::as_str), Some("xyz"));

    let code_payload = decode_payload(&code);
    assert_eq!(code_payload["typ"], "CODE");
    assert_eq!(code_payload["aud"], "cli1");
    assert_eq!(code_payload["redirect_uri"], "https://app/cb");

    // Step 3: exchange the code at the token endpoint.
    let response = client
        .post("/login/token")
        .header(ContentType::Form)
        .body(form_body(&[
            ("grant_type", "authorization_code"),
            ("code", &code),
            ("redirect_uri", "https://app/cb"),
            ("client_id", "cli1"),
        ]))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::JSON));

    let body: Value =
        serde_json::from_str(&response.into_string().await.expect("JSON response body"))
            .expect("Valid JSON response");
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 604_800);
    assert_eq!(body["scope"], "openid profile");

    let access_token = body["access_token"].as_str().expect("access_token");
    let access_payload = decode_payload(access_token);
    assert_eq!(access_payload["typ"], "ACCESS_TOKEN");
    assert_eq!(access_payload["sub"], "alice");

    let id_token = body["id_token"].as_str().expect("id_token");
    let id_payload = decode_payload(id_token);
    assert_eq!(id_payload["iss"], "http://localhost:8000");
    assert_eq!(id_payload["aud"], "cli1");
    assert_eq!(id_payload["sub"], "alice");
    assert_eq!(id_payload["name"], "Alice Adams");
    assert!(id_payload["at_hash"].is_string());

    // The profile scope was granted but email was not requested.
    assert!(id_payload.get("email").is_none());
}

#[rocket::async_test]
async fn wrong_credentials_re_render_the_login_form() {
    let client = test_client(test_config()).await;

    let response = client
        .post("/login")
        .header(ContentType::Form)
        .body(form_body(&[
            ("response_type", "code"),
            ("client_id", "cli1"),
            ("redirect_uri", "https://app/cb"),
            ("scope", "openid"),
            ("username", "alice"),
            ("password", "wrong"),
        ]))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Unauthorized);
    let html = response.into_string().await.expect("HTML response body");
    assert!(html.contains("Invalid username or password"));
    assert!(html.contains("<form"), "the form should be rendered again");
}

#[rocket::async_test]
async fn code_flow_works_with_glob_registered_redirect_uri() {
    let client = test_client(test_config()).await;

    let response = client
        .post("/login")
        .header(ContentType::Form)
        .body(form_body(&[
            ("response_type", "code"),
            ("client_id", "cli1"),
            ("redirect_uri", "https://app/deep/callback"),
            ("scope", "openid"),
            ("username", "alice"),
            ("password", "secret"),
        ]))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Found);
    let location = response.headers().get_one("Location").unwrap();
    assert!(location.starts_with("https://app/deep/callback?"));
}

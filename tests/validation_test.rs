// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Parameter validation discipline: failures before redirect URI
//! verification render directly, everything after redirects to the client
//! with the error code and echoed state.

mod common;

use rocket::http::{Accept, Status};
use serde_json::Value;

use common::{parse_params, test_client, test_config};

#[rocket::async_test]
async fn unregistered_redirect_uri_gets_an_error_page_not_a_redirect() {
    let client = test_client(test_config()).await;

    let response = client
        .get("/login?response_type=code&client_id=cli1&redirect_uri=https://evil/&scope=openid&state=xyz")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
    assert!(
        response.headers().get_one("Location").is_none(),
        "an unverified redirect_uri must never be redirected to"
    );
    let html = response.into_string().await.expect("HTML response body");
    assert!(html.contains("invalid_request"));
}

#[rocket::async_test]
async fn unknown_client_gets_an_error_page_not_a_redirect() {
    let client = test_client(test_config()).await;

    let response = client
        .get("/login?response_type=code&client_id=ghost&redirect_uri=https://app/cb&scope=openid")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
    assert!(response.headers().get_one("Location").is_none());
    let html = response.into_string().await.expect("HTML response body");
    assert!(html.contains("unauthorized_client"));
}

#[rocket::async_test]
async fn direct_errors_render_json_when_asked_for() {
    let client = test_client(test_config()).await;

    let response = client
        .get("/login?response_type=code&client_id=ghost&redirect_uri=https://app/cb&scope=openid")
        .header(Accept::JSON)
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
    let body: Value =
        serde_json::from_str(&response.into_string().await.expect("JSON response body"))
            .expect("Valid JSON response");
    assert_eq!(body["error"], "unauthorized_client");
}

#[rocket::async_test]
async fn post_redirect_errors_echo_state_and_error_code() {
    let client = test_client(test_config()).await;

    // Unknown scope: the redirect URI is already verified, so the error
    // travels back to the client.
    let response = client
        .get("/login?response_type=code&client_id=cli1&redirect_uri=https://app/cb&scope=openid%20wizardry&state=abc")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Found);
    let location = response.headers().get_one("Location").unwrap();
    assert!(location.starts_with("https://app/cb?"));
    let params = parse_params(location.split('?').nth(1).unwrap());
    assert_eq!(params.get("error").map(String::as_str), Some("invalid_scope"));
    assert_eq!(params.get("state").map(String::as_str), Some("abc"));
}

#[rocket::async_test]
async fn scope_without_openid_is_invalid() {
    let client = test_client(test_config()).await;

    let response = client
        .get("/login?response_type=code&client_id=cli1&redirect_uri=https://app/cb&scope=profile")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Found);
    let params = parse_params(
        response
            .headers()
            .get_one("Location")
            .unwrap()
            .split('?')
            .nth(1)
            .unwrap(),
    );
    assert_eq!(params.get("error").map(String::as_str), Some("invalid_scope"));
}

#[rocket::async_test]
async fn unsupported_response_type_redirects_in_the_resolved_mode() {
    let client = test_client(test_config()).await;

    // The bogus set contains id_token, so the error lands in the fragment.
    let response = client
        .get("/login?response_type=id_token%20magic&client_id=cli1&redirect_uri=https://app/cb&scope=openid&state=s")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Found);
    let location = response.headers().get_one("Location").unwrap();
    let fragment = location.split('#').nth(1).expect("fragment expected");
    let params = parse_params(fragment);
    assert_eq!(
        params.get("error").map(String::as_str),
        Some("unsupported_response_type")
    );
    assert_eq!(params.get("state").map(String::as_str), Some("s"));
}

#[rocket::async_test]
async fn empty_response_type_is_unsupported() {
    let client = test_client(test_config()).await;

    let response = client
        .get("/login?client_id=cli1&redirect_uri=https://app/cb&scope=openid")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Found);
    let params = parse_params(
        response
            .headers()
            .get_one("Location")
            .unwrap()
            .split('?')
            .nth(1)
            .unwrap(),
    );
    assert_eq!(
        params.get("error").map(String::as_str),
        Some("unsupported_response_type")
    );
}

#[rocket::async_test]
async fn prompt_none_with_login_is_invalid_request() {
    let client = test_client(test_config()).await;

    let response = client
        .get("/login?response_type=code&client_id=cli1&redirect_uri=https://app/cb&scope=openid&prompt=none%20login")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Found);
    let params = parse_params(
        response
            .headers()
            .get_one("Location")
            .unwrap()
            .split('?')
            .nth(1)
            .unwrap(),
    );
    assert_eq!(
        params.get("error").map(String::as_str),
        Some("invalid_request")
    );
}

#[rocket::async_test]
async fn unsupported_display_is_rejected() {
    let client = test_client(test_config()).await;

    let response = client
        .get("/login?response_type=code&client_id=cli1&redirect_uri=https://app/cb&scope=openid&display=popup")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Found);
    let params = parse_params(
        response
            .headers()
            .get_one("Location")
            .unwrap()
            .split('?')
            .nth(1)
            .unwrap(),
    );
    assert_eq!(
        params.get("error").map(String::as_str),
        Some("invalid_request")
    );
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared fixtures for the integration tests: an in-memory directory with
//! fixed users, a test configuration with two registered clients, and
//! helpers for driving the server and inspecting minted tokens.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rocket::local::asynchronous::Client;

use rust_ldap_oidc::config::{ClientConfig, Config};
use rust_ldap_oidc::directory::{AttributeMap, Directory, DirectoryError};
use rust_ldap_oidc::web::build_rocket;

/// One user of the stub directory.
pub struct StubUser {
    pub password: String,
    pub attributes: AttributeMap,
}

/// In-memory directory standing in for LDAP.
pub struct StubDirectory {
    users: HashMap<String, StubUser>,
}

impl StubDirectory {
    /// Two users: `alice`/`secret` with a full profile and `bob`/`hunter2`
    /// with a minimal one.
    pub fn with_default_users() -> Self {
        let mut users = HashMap::new();
        users.insert(
            "alice".to_string(),
            StubUser {
                password: "secret".to_string(),
                attributes: attributes(&[
                    ("cn", &["Alice Adams"]),
                    ("givenName", &["Alice"]),
                    ("sn", &["Adams"]),
                    ("mail", &["alice@example.com"]),
                    ("memberOf", &["admins", "users"]),
                ]),
            },
        );
        users.insert(
            "bob".to_string(),
            StubUser {
                password: "hunter2".to_string(),
                attributes: attributes(&[("cn", &["Bob Barker"])]),
            },
        );
        Self { users }
    }
}

#[rocket::async_trait]
impl Directory for StubDirectory {
    async fn authenticate(&self, username: &str, password: &str) -> Result<(), DirectoryError> {
        match self.users.get(username) {
            Some(user) if user.password == password && !password.is_empty() => Ok(()),
            Some(_) => Err(DirectoryError::AuthFailure),
            None => Err(DirectoryError::AuthFailure),
        }
    }

    async fn user_attributes(
        &self,
        username: &str,
        attributes: &[String],
    ) -> Result<AttributeMap, DirectoryError> {
        let user = self.users.get(username).ok_or(DirectoryError::NotFound)?;
        Ok(user
            .attributes
            .iter()
            .filter(|(name, _)| attributes.iter().any(|a| a == *name))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect())
    }
}

pub fn attributes(pairs: &[(&str, &[&str])]) -> AttributeMap {
    pairs
        .iter()
        .map(|(name, values)| {
            (
                name.to_string(),
                values.iter().map(|v| v.to_string()).collect(),
            )
        })
        .collect()
}

/// Base test configuration: two clients, default scopes and TTLs.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.oidc.issuer = "http://localhost:8000".to_string();
    config.clients.push(ClientConfig {
        client_id: "cli1".to_string(),
        secret: "s3cret".to_string(),
        redirect_uris: vec!["https://app/cb".to_string(), "https://app/deep/*".to_string()],
        cors_origin: Some("https://app".to_string()),
    });
    config.clients.push(ClientConfig {
        client_id: "cli2".to_string(),
        secret: "0ther".to_string(),
        redirect_uris: vec!["https://other/cb".to_string()],
        cors_origin: None,
    });
    config
}

/// Build a tracked local client over a fresh server instance.
pub async fn test_client(config: Config) -> Client {
    let figment = rocket::Config::figment().merge(("address", "127.0.0.1"));
    let rocket = build_rocket(
        figment,
        config,
        Arc::new(StubDirectory::with_default_users()),
    )
    .expect("valid rocket instance");
    Client::tracked(rocket).await.expect("valid rocket instance")
}

/// Decode a JWT payload without verifying the signature.
pub fn decode_payload(token: &str) -> serde_json::Value {
    let payload = token.split('.').nth(1).expect("JWT should have 3 parts");
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .expect("payload should be base64url");
    serde_json::from_slice(&bytes).expect("payload should be JSON")
}

/// Split the query or fragment parameters of a redirect location.
pub fn parse_params(input: &str) -> HashMap<String, String> {
    serde_urlencoded_parse(input)
}

fn serde_urlencoded_parse(input: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(input.as_bytes())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Form-encode a parameter list for a POST body.
pub fn form_body(params: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in params {
        serializer.append_pair(name, value);
    }
    serializer.finish()
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OpenID Connect discovery and JWKS endpoints
//!
//! This module provides the discovery and key publication surfaces that
//! make the authentication system compliant with the OpenID Connect
//! specification:
//!
//! - `.well-known/openid-configuration` discovery endpoint
//! - JWKS (JSON Web Key Set) endpoint for public key exposure
//!
//! These endpoints allow OIDC clients to automatically discover the
//! server's capabilities and configuration, including supported signing
//! algorithms and endpoints.

use rocket::serde::json::Json;
use rocket::{get, State};
use serde::{Deserialize, Serialize};

use super::server::ServerState;
use crate::token::JwkKeySet;

/// OpenID Connect Discovery Configuration
///
/// This structure represents the OpenID Provider Configuration document
/// returned by the `.well-known/openid-configuration` endpoint, following
/// the OpenID Connect Discovery 1.0 specification.
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenIdConfiguration {
    /// URL the OP asserts as its Issuer Identifier
    pub issuer: String,

    /// URL of the OP's OAuth 2.0 Authorization Endpoint
    pub authorization_endpoint: String,

    /// URL of the OP's OAuth 2.0 Token Endpoint
    pub token_endpoint: String,

    /// URL of the OP's UserInfo Endpoint
    pub userinfo_endpoint: String,

    /// URL of the OP's JSON Web Key Set document
    pub jwks_uri: String,

    /// OAuth 2.0 response_type values this server supports
    pub response_types_supported: Vec<String>,

    /// OAuth 2.0 response_mode values this server supports
    pub response_modes_supported: Vec<String>,

    /// OAuth 2.0 grant type values this server supports
    pub grant_types_supported: Vec<String>,

    /// Subject identifier types this server supports
    pub subject_types_supported: Vec<String>,

    /// JWS signing algorithms supported for the ID Token
    pub id_token_signing_alg_values_supported: Vec<String>,

    /// Display parameter values this server supports
    pub display_values_supported: Vec<String>,

    /// Scopes this server supports
    pub scopes_supported: Vec<String>,

    /// Claim names this server may supply values for
    pub claims_supported: Vec<String>,
}

/// Generate the provider configuration from the server state.
///
/// The document is a pure function of the configuration, so it is stable
/// across requests and across restarts of the same config.
fn generate_openid_configuration(state: &ServerState) -> OpenIdConfiguration {
    let oidc = &state.config.oidc;

    // Claims the provider always asserts, followed by the configured ones.
    let mut claims_supported: Vec<String> = ["iss", "sub", "aud", "exp", "iat", "typ", "auth_time"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    for claim in state.config.scopes.supported_claims() {
        if !claims_supported.contains(&claim) {
            claims_supported.push(claim);
        }
    }

    OpenIdConfiguration {
        issuer: oidc.issuer.clone(),
        authorization_endpoint: oidc.endpoint_url(&oidc.endpoints.authorize),
        token_endpoint: oidc.endpoint_url(&oidc.endpoints.token),
        userinfo_endpoint: oidc.endpoint_url(&oidc.endpoints.userinfo),
        jwks_uri: oidc.endpoint_url(&oidc.endpoints.jwks),
        response_types_supported: vec![
            "code".to_string(),
            "token".to_string(),
            "id_token".to_string(),
            "code token".to_string(),
            "code id_token".to_string(),
            "token id_token".to_string(),
            "code token id_token".to_string(),
        ],
        response_modes_supported: vec!["query".to_string(), "fragment".to_string()],
        grant_types_supported: vec![
            "authorization_code".to_string(),
            "refresh_token".to_string(),
        ],
        subject_types_supported: vec!["public".to_string()],
        id_token_signing_alg_values_supported: vec!["RS256".to_string()],
        display_values_supported: vec!["page".to_string()],
        scopes_supported: state.config.scopes.supported_scopes(),
        claims_supported,
    }
}

/// OpenID Connect discovery endpoint
///
/// # URL
///
/// `GET /.well-known/openid-configuration`
#[get("/openid-configuration")]
pub async fn openid_configuration(state: &State<ServerState>) -> Json<OpenIdConfiguration> {
    Json(generate_openid_configuration(state))
}

/// JSON Web Key Set (JWKS) endpoint
///
/// Exposes the public key used for token verification in JWKS format as
/// defined in RFC 7517, so clients can verify the signatures of tokens
/// issued by this server.
#[get("/")]
pub async fn jwks(state: &State<ServerState>) -> Json<JwkKeySet> {
    Json(state.tokens.jwks())
}

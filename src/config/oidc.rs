// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OpenID Connect provider configuration
//!
//! Issuer identity, endpoint paths and key material location. Endpoint
//! paths are mount points, so they can be relocated without touching the
//! handlers themselves.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// OpenID Connect provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcConfig {
    /// Issuer identifier asserted in every token (`iss` claim) and in the
    /// discovery document. Must be an absolute http(s) URL without query
    /// or fragment.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Path to the RSA private key PEM file. When the file does not exist
    /// a fresh 2048-bit key pair is generated at startup and persisted
    /// there. When unset, an ephemeral key pair is generated in memory.
    #[serde(default)]
    pub key_file: Option<PathBuf>,

    /// When true, the token endpoint requires `client_secret` to match the
    /// client registration.
    #[serde(default)]
    pub enable_client_auth: bool,

    /// HTTP paths the endpoints are mounted at.
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

fn default_issuer() -> String {
    "http://localhost:8000".to_string()
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            key_file: None,
            enable_client_auth: false,
            endpoints: EndpointsConfig::default(),
        }
    }
}

impl OidcConfig {
    /// Path component of the issuer URL, used as the SSO cookie path.
    pub fn issuer_path(&self) -> String {
        url::Url::parse(&self.issuer)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| "/".to_string())
    }

    /// Absolute URL of an endpoint, derived from the issuer and the
    /// configured mount path.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.issuer.trim_end_matches('/'), path)
    }
}

/// HTTP paths for the protocol endpoints.
///
/// Each value is a Rocket mount point; the handlers themselves are routed
/// at `/` inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Authorization endpoint (GET renders the login page, POST submits
    /// credentials).
    #[serde(default = "default_authorize")]
    pub authorize: String,

    /// Token endpoint.
    #[serde(default = "default_token")]
    pub token: String,

    /// Userinfo endpoint.
    #[serde(default = "default_userinfo")]
    pub userinfo: String,

    /// JWKS endpoint.
    #[serde(default = "default_jwks")]
    pub jwks: String,
}

fn default_authorize() -> String {
    "/login".to_string()
}

fn default_token() -> String {
    "/login/token".to_string()
}

fn default_userinfo() -> String {
    "/login/userinfo".to_string()
}

fn default_jwks() -> String {
    "/login/jwks".to_string()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            authorize: default_authorize(),
            token: default_token(),
            userinfo: default_userinfo(),
            jwks: default_jwks(),
        }
    }
}

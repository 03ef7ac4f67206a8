// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Relying party registrations
//!
//! Clients are registered statically in the configuration file. A request's
//! `redirect_uri` must match at least one of the registered glob patterns
//! before the provider emits any redirect to it.

use serde::{Deserialize, Serialize};
use wildmatch::WildMatch;

/// A registered relying party.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Client identifier presented in authorization requests.
    pub client_id: String,

    /// Client secret, verified at the token endpoint when
    /// `oidc.enable_client_auth` is set.
    #[serde(default)]
    pub secret: String,

    /// Allowed redirect URI patterns. `*` matches any run of characters,
    /// `?` a single character; everything else matches literally.
    pub redirect_uris: Vec<String>,

    /// Origin allowed to read userinfo responses from a browser, sent back
    /// as `Access-Control-Allow-Origin`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors_origin: Option<String>,
}

impl ClientConfig {
    /// Check a request's `redirect_uri` against the registered patterns.
    pub fn redirect_uri_matches(&self, redirect_uri: &str) -> bool {
        self.redirect_uris
            .iter()
            .any(|pattern| WildMatch::new(pattern).matches(redirect_uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(patterns: &[&str]) -> ClientConfig {
        ClientConfig {
            client_id: "app".to_string(),
            secret: String::new(),
            redirect_uris: patterns.iter().map(|s| s.to_string()).collect(),
            cors_origin: None,
        }
    }

    #[test]
    fn literal_pattern_matches_exactly() {
        let c = client(&["https://app.example.com/cb"]);
        assert!(c.redirect_uri_matches("https://app.example.com/cb"));
        assert!(!c.redirect_uri_matches("https://app.example.com/cb/extra"));
        assert!(!c.redirect_uri_matches("https://evil.example.com/cb"));
    }

    #[test]
    fn glob_pattern_matches_subpaths() {
        let c = client(&["https://app.example.com/*"]);
        assert!(c.redirect_uri_matches("https://app.example.com/cb"));
        assert!(c.redirect_uri_matches("https://app.example.com/deep/cb"));
        assert!(!c.redirect_uri_matches("https://other.example.com/cb"));
    }

    #[test]
    fn any_of_several_patterns_suffices() {
        let c = client(&["http://localhost:3000/cb", "https://app.example.com/cb"]);
        assert!(c.redirect_uri_matches("http://localhost:3000/cb"));
        assert!(c.redirect_uri_matches("https://app.example.com/cb"));
    }
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Scope-to-claim projection rules
//!
//! Each configured scope carries an ordered list of claim rules. A rule
//! maps one directory attribute to one OIDC claim with an explicit value
//! shape, so the userinfo and ID token payloads stay typed instead of
//! echoing raw attribute strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value shape of a projected claim.
///
/// The YAML type names mirror the shapes: `string`, `[]string`, `number`
/// and `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimKind {
    /// First attribute value as a JSON string.
    #[serde(rename = "string")]
    String,

    /// All attribute values as a JSON array of strings.
    #[serde(rename = "[]string")]
    StringList,

    /// First attribute value parsed as a JSON number.
    #[serde(rename = "number")]
    Number,

    /// First attribute value parsed as a JSON boolean.
    #[serde(rename = "bool")]
    Bool,
}

/// One attribute-to-claim mapping inside a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRule {
    /// Claim name in the OIDC response.
    pub claim: String,

    /// Directory attribute the value is read from.
    pub attribute: String,

    /// Value shape of the claim.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: ClaimKind,
}

fn default_kind() -> ClaimKind {
    ClaimKind::String
}

/// Ordered mapping from scope name to claim rules.
///
/// A `BTreeMap` keeps scope iteration deterministic, which in turn keeps
/// the discovery document and claim projection stable across restarts.
/// The `openid` scope is implicit and must not be declared here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopesConfig(pub BTreeMap<String, Vec<ClaimRule>>);

impl Default for ScopesConfig {
    fn default() -> Self {
        let mut scopes = BTreeMap::new();
        scopes.insert(
            "profile".to_string(),
            vec![
                rule("name", "cn", ClaimKind::String),
                rule("given_name", "givenName", ClaimKind::String),
                rule("family_name", "sn", ClaimKind::String),
            ],
        );
        scopes.insert(
            "email".to_string(),
            vec![rule("email", "mail", ClaimKind::String)],
        );
        scopes.insert(
            "phone".to_string(),
            vec![rule("phone_number", "telephoneNumber", ClaimKind::String)],
        );
        scopes.insert(
            "groups".to_string(),
            vec![rule("groups", "memberOf", ClaimKind::StringList)],
        );
        Self(scopes)
    }
}

fn rule(claim: &str, attribute: &str, kind: ClaimKind) -> ClaimRule {
    ClaimRule {
        claim: claim.to_string(),
        attribute: attribute.to_string(),
        kind,
    }
}

impl ScopesConfig {
    /// True when the scope is configured or is the implicit `openid`.
    pub fn is_supported(&self, scope: &str) -> bool {
        scope == "openid" || self.0.contains_key(scope)
    }

    /// Claim rules of one scope, empty for unknown scopes.
    pub fn rules(&self, scope: &str) -> &[ClaimRule] {
        self.0.get(scope).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All scope names the provider advertises, `openid` first.
    pub fn supported_scopes(&self) -> Vec<String> {
        let mut scopes = vec!["openid".to_string()];
        scopes.extend(self.0.keys().cloned());
        scopes
    }

    /// Every directory attribute referenced by a set of scopes,
    /// deduplicated, in rule declaration order.
    pub fn attributes_for<'a, I>(&self, scopes: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut attributes = Vec::new();
        for scope in scopes {
            for rule in self.rules(scope) {
                if !attributes.contains(&rule.attribute) {
                    attributes.push(rule.attribute.clone());
                }
            }
        }
        attributes
    }

    /// Every claim name the provider can produce, deduplicated and sorted.
    pub fn supported_claims(&self) -> Vec<String> {
        let mut claims: Vec<String> = self
            .0
            .values()
            .flatten()
            .map(|rule| rule.claim.clone())
            .collect();
        claims.sort();
        claims.dedup();
        claims
    }
}

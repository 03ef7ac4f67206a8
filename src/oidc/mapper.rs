// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Scope-to-claim projection
//!
//! Turns a raw directory attribute map into an OIDC claim map by applying
//! the configured claim rules of every granted scope, in declaration
//! order. Values are shaped by the rule's [`ClaimKind`]; anything that
//! cannot be shaped is omitted rather than failing the response. The
//! output is deterministic for a given input and scope configuration.

use serde_json::{Map, Number, Value};

use crate::config::{ClaimKind, ScopesConfig};
use crate::directory::AttributeMap;

/// Claim names owned by the ID token structure itself; scope projection
/// must not override them.
pub const RESERVED_ID_CLAIMS: &[&str] = &[
    "iss", "sub", "aud", "exp", "iat", "typ", "auth_time", "nonce", "at_hash", "c_hash",
];

/// Projects directory attributes into claim maps.
pub struct ClaimMapper {
    scopes: ScopesConfig,
}

impl ClaimMapper {
    pub fn new(scopes: ScopesConfig) -> Self {
        Self { scopes }
    }

    /// Attributes needed to project the given scopes, plus extras the
    /// caller wants fetched regardless.
    pub fn attributes_for<'a, I>(&self, scopes: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        self.scopes.attributes_for(scopes)
    }

    /// Project the granted scopes over an attribute map.
    ///
    /// `sub` is injected after projection and overwrites any mapped
    /// claim of the same name.
    pub fn project(
        &self,
        scopes: &[String],
        subject: &str,
        attributes: &AttributeMap,
    ) -> Map<String, Value> {
        let mut claims = Map::new();
        for scope in scopes {
            for rule in self.scopes.rules(scope) {
                let values = match attributes.get(&rule.attribute) {
                    Some(values) if !values.is_empty() => values,
                    _ => continue,
                };
                if let Some(value) = shape_value(rule.kind, values) {
                    claims.insert(rule.claim.clone(), value);
                }
            }
        }
        claims.insert("sub".to_string(), Value::String(subject.to_string()));
        claims
    }

    /// Like [`project`](Self::project), but shaped for embedding into an
    /// ID token: the structural claim names are stripped, since the token
    /// manager sets those itself.
    pub fn project_id_claims(
        &self,
        scopes: &[String],
        subject: &str,
        attributes: &AttributeMap,
    ) -> Map<String, Value> {
        let mut claims = self.project(scopes, subject, attributes);
        for reserved in RESERVED_ID_CLAIMS {
            claims.remove(*reserved);
        }
        claims
    }
}

/// Shape raw attribute values per the rule's kind; `None` means omit.
fn shape_value(kind: ClaimKind, values: &[String]) -> Option<Value> {
    match kind {
        ClaimKind::String => values.first().map(|v| Value::String(v.clone())),
        ClaimKind::StringList => Some(Value::Array(
            values.iter().map(|v| Value::String(v.clone())).collect(),
        )),
        ClaimKind::Number => {
            let first = values.first()?;
            if let Ok(int) = first.parse::<i64>() {
                return Some(Value::Number(int.into()));
            }
            first
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
        }
        ClaimKind::Bool => {
            let first = values.first()?;
            if first.eq_ignore_ascii_case("true") || first == "1" {
                Some(Value::Bool(true))
            } else if first.eq_ignore_ascii_case("false") || first == "0" {
                Some(Value::Bool(false))
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClaimRule;
    use std::collections::BTreeMap;

    fn mapper() -> ClaimMapper {
        let mut scopes = BTreeMap::new();
        scopes.insert(
            "profile".to_string(),
            vec![
                rule("name", "cn", ClaimKind::String),
                rule("groups", "memberOf", ClaimKind::StringList),
                rule("shoe_size", "shoeSize", ClaimKind::Number),
                rule("active", "active", ClaimKind::Bool),
            ],
        );
        ClaimMapper::new(ScopesConfig(scopes))
    }

    fn rule(claim: &str, attribute: &str, kind: ClaimKind) -> ClaimRule {
        ClaimRule {
            claim: claim.to_string(),
            attribute: attribute.to_string(),
            kind,
        }
    }

    fn attrs(pairs: &[(&str, &[&str])]) -> AttributeMap {
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

    #[test]
    fn string_takes_first_value() {
        let claims = mapper().project(
            &["profile".to_string()],
            "alice",
            &attrs(&[("cn", &["Alice Adams", "Ally"])]),
        );
        assert_eq!(claims["name"], Value::String("Alice Adams".to_string()));
    }

    #[test]
    fn string_list_takes_all_values() {
        let claims = mapper().project(
            &["profile".to_string()],
            "alice",
            &attrs(&[("memberOf", &["admins", "users"])]),
        );
        assert_eq!(
            claims["groups"],
            Value::Array(vec![
                Value::String("admins".to_string()),
                Value::String("users".to_string())
            ])
        );
    }

    #[test]
    fn number_and_bool_parse_or_are_omitted() {
        let claims = mapper().project(
            &["profile".to_string()],
            "alice",
            &attrs(&[("shoeSize", &["42"]), ("active", &["TRUE"])]),
        );
        assert_eq!(claims["shoe_size"], Value::Number(42.into()));
        assert_eq!(claims["active"], Value::Bool(true));

        let claims = mapper().project(
            &["profile".to_string()],
            "alice",
            &attrs(&[("shoeSize", &["forty-two"]), ("active", &["maybe"])]),
        );
        assert!(!claims.contains_key("shoe_size"));
        assert!(!claims.contains_key("active"));
    }

    #[test]
    fn missing_attributes_are_omitted() {
        let claims = mapper().project(&["profile".to_string()], "alice", &attrs(&[]));
        assert!(!claims.contains_key("name"));
        assert_eq!(claims.len(), 1); // only sub
    }

    #[test]
    fn sub_is_always_injected_and_wins() {
        let mut scopes = BTreeMap::new();
        scopes.insert(
            "profile".to_string(),
            vec![rule("sub", "uid", ClaimKind::String)],
        );
        let mapper = ClaimMapper::new(ScopesConfig(scopes));
        let claims = mapper.project(
            &["profile".to_string()],
            "alice",
            &attrs(&[("uid", &["spoofed"])]),
        );
        assert_eq!(claims["sub"], Value::String("alice".to_string()));
    }

    #[test]
    fn unrequested_scopes_are_not_projected() {
        let claims = mapper().project(&[], "alice", &attrs(&[("cn", &["Alice"])]));
        assert!(!claims.contains_key("name"));
    }
}

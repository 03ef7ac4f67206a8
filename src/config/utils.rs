// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! Schema export for tooling and the cross-field checks the JSON schema
//! cannot express.

use anyhow::{Context, Result};
use log::debug;
use url::Url;

use super::Config;

/// Print the embedded configuration schema on stdout.
///
/// Backs the `--show-config-schema` CLI flag, so operators can feed the
/// schema to their editor or CI pipeline:
///
/// ```bash
/// ./rust_ldap_oidc --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(include_str!("../../resources/config.schema.json"))
            .context("Embedded configuration schema is not valid JSON")?;
    let pretty = serde_json::to_string_pretty(&schema)
        .context("Could not format the configuration schema")?;
    println!("{}", pretty);
    Ok(())
}

/// Check that a listen address is plausible.
///
/// Anything that parses as an IPv4 or IPv6 address passes, plus the
/// conventional `localhost` name.
pub fn is_valid_bind_address(addr: &str) -> bool {
    addr == "localhost" || addr.parse::<std::net::IpAddr>().is_ok()
}

/// Cross-field validation applied after schema validation.
///
/// The JSON schema checks shapes and ranges; this function checks the
/// relationships between fields:
///
/// - the issuer is an absolute http(s) URL without query or fragment
/// - the listen port is usable and the address looks like an address
/// - every client has an id and at least one redirect URI pattern, and a
///   secret whenever client authentication is enabled
/// - scope names and claim rules are well formed, and `openid` is not
///   redeclared
/// - the LDAP URL scheme is right and the user filter has its username
///   placeholder
/// - all token lifetimes are positive
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    // Validate the issuer URL
    let issuer = Url::parse(&config.oidc.issuer)
        .with_context(|| format!("Issuer is not a valid URL: {}", config.oidc.issuer))?;
    if issuer.scheme() != "http" && issuer.scheme() != "https" {
        anyhow::bail!("Issuer URL must use http or https: {}", config.oidc.issuer);
    }
    if issuer.query().is_some() || issuer.fragment().is_some() {
        anyhow::bail!("Issuer URL must not carry a query or fragment");
    }

    // Check value ranges for certain fields
    if config.server.port < 1 || config.server.port > 65534 {
        anyhow::bail!("Invalid port number: {}", config.server.port);
    }

    // An odd-looking address is worth a log line but not a refusal; the
    // resolver may still know it.
    if !is_valid_bind_address(&config.server.address) {
        debug!(
            "Listen address {} does not parse as an IP address",
            config.server.address
        );
    }

    // Validate client registrations
    for client in &config.clients {
        if client.client_id.is_empty() {
            anyhow::bail!("Client registration with an empty client_id");
        }
        if client.redirect_uris.is_empty() {
            anyhow::bail!(
                "Client {} has no redirect URI patterns",
                client.client_id
            );
        }
        if client.redirect_uris.iter().any(|p| p.is_empty()) {
            anyhow::bail!(
                "Client {} has an empty redirect URI pattern",
                client.client_id
            );
        }
        if config.oidc.enable_client_auth && client.secret.is_empty() {
            anyhow::bail!(
                "Client authentication is enabled but client {} has no secret",
                client.client_id
            );
        }
    }

    // Validate scope definitions
    for (scope, rules) in &config.scopes.0 {
        if scope.is_empty() || scope.contains(char::is_whitespace) {
            anyhow::bail!("Invalid scope name: {:?}", scope);
        }
        if scope == "openid" {
            anyhow::bail!("The openid scope is implicit and must not be declared");
        }
        for rule in rules {
            if rule.claim.is_empty() || rule.attribute.is_empty() {
                anyhow::bail!("Scope {} has a claim rule with empty fields", scope);
            }
        }
    }

    // Validate LDAP settings
    if !config.ldap.server.starts_with("ldap://") && !config.ldap.server.starts_with("ldaps://") {
        anyhow::bail!(
            "LDAP server URL must start with ldap:// or ldaps://: {}",
            config.ldap.server
        );
    }
    if !config.ldap.user_filter.contains("{}") {
        anyhow::bail!(
            "LDAP user filter must contain the {{}} username placeholder: {}",
            config.ldap.user_filter
        );
    }

    // Validate token lifetimes
    if config.ttl.code == 0 || config.ttl.access == 0 || config.ttl.refresh == 0 || config.ttl.sso == 0
    {
        anyhow::bail!("Token lifetimes must be positive");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    #[test]
    fn default_config_passes_validation() {
        assert!(validate_specific_rules(&Config::default()).is_ok());
    }

    #[test]
    fn issuer_with_fragment_is_rejected() {
        let mut config = Config::default();
        config.oidc.issuer = "https://idp.example.com/#frag".to_string();
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn client_without_redirect_uris_is_rejected() {
        let mut config = Config::default();
        config.clients.push(ClientConfig {
            client_id: "app".to_string(),
            secret: String::new(),
            redirect_uris: vec![],
            cors_origin: None,
        });
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn missing_secret_rejected_when_client_auth_enabled() {
        let mut config = Config::default();
        config.oidc.enable_client_auth = true;
        config.clients.push(ClientConfig {
            client_id: "app".to_string(),
            secret: String::new(),
            redirect_uris: vec!["https://app/cb".to_string()],
            cors_origin: None,
        });
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn user_filter_needs_placeholder() {
        let mut config = Config::default();
        config.ldap.user_filter = "(uid=alice)".to_string();
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn bind_address_check_accepts_ips_and_localhost() {
        assert!(is_valid_bind_address("127.0.0.1"));
        assert!(is_valid_bind_address("::1"));
        assert!(is_valid_bind_address("0.0.0.0"));
        assert!(is_valid_bind_address("localhost"));
        assert!(!is_valid_bind_address("not an address"));
    }
}

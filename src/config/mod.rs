// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the identity provider
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings for the identity provider. The configuration
//! is backed by a YAML file and validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! The configuration is organized as a nested structure with sections:
//! - `server`: Network binding for the HTTP server
//! - `oidc`: Issuer URL, endpoint paths, key material and client authentication
//! - `ttl`: Token lifetimes
//! - `ldap`: Directory connection and user lookup settings
//! - `scopes`: Scope-to-claim projection rules
//! - `clients`: Relying party registrations
//!
//! ## Loading pipeline
//!
//! A config file goes through three gates before it is used: the YAML is
//! checked against the embedded JSON schema, deserialized into [`Config`],
//! and then run through the cross-field rules in [`utils`]. When any gate
//! rejects the file, a default-valued template is written next to it so
//! the operator has a known-good starting point.
//!
//! ## Usage
//!
//! ```no_run
//! use rust_ldap_oidc::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(8081),                                  // Port
//!     Some("0.0.0.0".to_string()),                 // Address
//!     Some("https://idp.example.com".to_string()), // Issuer
//!     None,                                        // Key file
//! );
//!
//! println!("Server port: {}", config.server.port);
//! ```

pub mod clients;
pub mod ldap;
pub mod oidc;
pub mod scopes;
pub mod server;
pub mod ttl;
pub mod utils;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

// Re-export all types for public API
pub use clients::ClientConfig;
pub use ldap::LdapConfig;
pub use oidc::{EndpointsConfig, OidcConfig};
pub use scopes::{ClaimKind, ClaimRule, ScopesConfig};
pub use server::ServerConfig;
pub use ttl::TtlConfig;
pub use utils::{is_valid_bind_address, output_config_schema};

/// Root configuration structure for the identity provider.
///
/// This structure serves as the main container for all configuration sections
/// of the application. It is deserialized from and serialized to YAML using
/// the serde framework, and validated against a JSON schema before
/// deserialization to ensure all required fields are present and have valid
/// values.
///
/// # Default Values
///
/// Each section uses default values when not explicitly specified in the
/// configuration file, allowing for minimal configuration when custom
/// settings are not required.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Network binding for the HTTP server.
    #[serde(default)]
    pub server: ServerConfig,

    /// OpenID Connect provider settings: issuer URL, endpoint paths,
    /// key material location and client authentication.
    #[serde(default)]
    pub oidc: OidcConfig,

    /// Token lifetimes for authorization codes, access tokens, refresh
    /// tokens and the SSO cookie.
    #[serde(default)]
    pub ttl: TtlConfig,

    /// Directory connection and user lookup settings.
    #[serde(default)]
    pub ldap: LdapConfig,

    /// Scope-to-claim projection rules. The `openid` scope is always
    /// supported implicitly and never needs to be declared here.
    #[serde(default)]
    pub scopes: ScopesConfig,

    /// Relying party registrations.
    #[serde(default)]
    pub clients: Vec<ClientConfig>,
}

impl Config {
    /// Load the configuration from a YAML file.
    ///
    /// A missing file is not an error: the defaults are written there and
    /// used. A present-but-invalid file is an error, and a
    /// `<name>.sample.yaml` template is left beside it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(
                "No configuration at {}, writing the defaults there",
                path.display()
            );
            let config = Self::default();
            config.save_to_file(path)?;
            return Ok(config);
        }

        debug!("Loading configuration from {}", path.display());
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Cannot read configuration file {}", path.display()))?;

        match Self::parse(&contents) {
            Ok(config) => Ok(config),
            Err(err) => {
                if let Err(sample_err) = Self::write_sample(path) {
                    warn!("Could not write a sample configuration: {:#}", sample_err);
                }
                Err(err.context(format!("Rejected configuration in {}", path.display())))
            }
        }
    }

    /// Parse and validate configuration text.
    ///
    /// Three gates, in order: the embedded JSON schema (shapes and
    /// ranges), serde deserialization, and the cross-field rules in
    /// [`utils::validate_specific_rules`]. The first rejection wins.
    fn parse(contents: &str) -> Result<Self> {
        let yaml: serde_yml::Value =
            serde_yml::from_str(contents).context("Configuration is not valid YAML")?;
        let json = serde_json::to_value(&yaml)
            .context("Configuration cannot be checked against the schema")?;

        let schema: serde_json::Value =
            serde_json::from_str(include_str!("../../resources/config.schema.json"))
                .context("Embedded configuration schema is not valid JSON")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)
            .context("Embedded configuration schema does not compile")?;
        if let Err(violation) = validator.validate(&json) {
            anyhow::bail!("Configuration violates the schema: {}", violation);
        }

        let config: Config = serde_yml::from_str(contents)
            .context("Configuration does not match the expected structure")?;
        utils::validate_specific_rules(&config)?;
        Ok(config)
    }

    /// Leave a default-valued `<name>.sample.yaml` beside a rejected file.
    fn write_sample(path: &Path) -> Result<()> {
        let sample = path.with_extension("sample.yaml");
        if let Some(parent) = sample.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Cannot create directory for {}", sample.display())
                })?;
            }
        }
        Self::default().save_to_file(&sample)?;
        info!(
            "Wrote a template configuration to {}; adjust and rename it",
            sample.display()
        );
        Ok(())
    }

    /// Serialize the configuration to a YAML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let yaml =
            serde_yml::to_string(self).context("Configuration does not serialize to YAML")?;
        fs::write(path, yaml)
            .with_context(|| format!("Cannot write configuration to {}", path.display()))
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values that are explicitly provided override the existing
    /// configuration.
    ///
    /// # Parameters
    ///
    /// * `port` - TCP port for the HTTP server
    /// * `address` - Network address for the HTTP server to bind to
    /// * `issuer` - Issuer URL the provider asserts in every token
    /// * `key_file` - Path to the RSA private key PEM file
    pub fn apply_args(
        &mut self,
        port: Option<u16>,
        address: Option<String>,
        issuer: Option<String>,
        key_file: Option<PathBuf>,
    ) {
        // Only override if command-line arguments are provided
        if let Some(port) = port {
            debug!("Overriding port from command line: {}", port);
            self.server.port = port;
        }

        if let Some(address) = address {
            debug!("Overriding address from command line: {}", address);
            self.server.address = address;
        }

        if let Some(issuer) = issuer {
            debug!("Overriding issuer from command line: {}", issuer);
            self.oidc.issuer = issuer;
        }

        if let Some(key_file) = key_file {
            debug!("Overriding key file from command line: {:?}", key_file);
            self.oidc.key_file = Some(key_file);
        }
    }

    /// Look up a registered client by its `client_id`
    pub fn find_client(&self, client_id: &str) -> Option<&ClientConfig> {
        self.clients.iter().find(|c| c.client_id == client_id)
    }
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! LDAP directory configuration
//!
//! Connection parameters for the directory the provider delegates
//! authentication and attribute storage to. The service account given by
//! `bind_dn`/`bind_password` is used to locate user entries; end-user
//! credentials are verified by binding as the located DN.

use serde::{Deserialize, Serialize};

/// Directory connection and user lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// Directory server URL (`ldap://` or `ldaps://`).
    #[serde(default = "default_server")]
    pub server: String,

    /// DN of the service account used for user lookups.
    #[serde(default = "default_bind_dn")]
    pub bind_dn: String,

    /// Password of the service account.
    #[serde(default)]
    pub bind_password: String,

    /// Base DN user searches start from.
    #[serde(default = "default_base_dn")]
    pub base_dn: String,

    /// LDAP filter locating a user entry; `{}` is replaced with the
    /// (escaped) username.
    #[serde(default = "default_user_filter")]
    pub user_filter: String,

    /// Attribute holding the stable subject identifier.
    #[serde(default = "default_id_attribute")]
    pub id_attribute: String,
}

fn default_server() -> String {
    "ldap://localhost:389".to_string()
}

fn default_bind_dn() -> String {
    "cn=admin,dc=example,dc=com".to_string()
}

fn default_base_dn() -> String {
    "dc=example,dc=com".to_string()
}

fn default_user_filter() -> String {
    "(uid={})".to_string()
}

fn default_id_attribute() -> String {
    "uid".to_string()
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            bind_dn: default_bind_dn(),
            bind_password: String::new(),
            base_dn: default_base_dn(),
            user_filter: default_user_filter(),
            id_attribute: default_id_attribute(),
        }
    }
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Token lifetime configuration

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Token lifetimes, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtlConfig {
    /// Authorization code lifetime. Codes are single-use by construction
    /// of their embedded binding; this short window bounds replay.
    #[serde(default = "default_code")]
    pub code: u64,

    /// Access token lifetime.
    #[serde(default = "default_access")]
    pub access: u64,

    /// Refresh token lifetime.
    #[serde(default = "default_refresh")]
    pub refresh: u64,

    /// SSO cookie lifetime.
    #[serde(default = "default_sso")]
    pub sso: u64,
}

fn default_code() -> u64 {
    600 // 10 minutes
}

fn default_access() -> u64 {
    604_800 // 7 days
}

fn default_refresh() -> u64 {
    2_592_000 // 30 days
}

fn default_sso() -> u64 {
    1_209_600 // 14 days
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            code: default_code(),
            access: default_access(),
            refresh: default_refresh(),
            sso: default_sso(),
        }
    }
}

impl TtlConfig {
    pub fn code_duration(&self) -> Duration {
        Duration::seconds(self.code as i64)
    }

    pub fn access_duration(&self) -> Duration {
        Duration::seconds(self.access as i64)
    }

    pub fn refresh_duration(&self) -> Duration {
        Duration::seconds(self.refresh as i64)
    }

    pub fn sso_duration(&self) -> Duration {
        Duration::seconds(self.sso as i64)
    }
}

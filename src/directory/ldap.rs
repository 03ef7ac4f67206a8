// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! LDAP implementation of the [`Directory`] trait
//!
//! One connection per operation: connect, service bind, search for the
//! user's DN with the configured filter, then either bind as that DN (to
//! verify credentials) or read its attributes. The connection is unbound
//! on the way out; on error paths the dropped handle tears the transport
//! down.

use ldap3::{ldap_escape, LdapConnAsync, LdapError, Scope, SearchEntry};
use log::{debug, warn};

use super::{AttributeMap, Directory, DirectoryError};
use crate::config::LdapConfig;

/// LDAP result code for invalid credentials.
const INVALID_CREDENTIALS: u32 = 49;

/// Directory backed by an LDAP server.
pub struct LdapDirectory {
    config: LdapConfig,
}

impl LdapDirectory {
    pub fn new(config: LdapConfig) -> Self {
        Self { config }
    }

    /// Open a connection and bind with the service account.
    async fn connect(&self) -> Result<ldap3::Ldap, DirectoryError> {
        let (conn, mut ldap) = LdapConnAsync::new(&self.config.server)
            .await
            .map_err(connect_error)?;
        ldap3::drive!(conn);

        ldap.simple_bind(&self.config.bind_dn, &self.config.bind_password)
            .await
            .map_err(connect_error)?
            .success()
            .map_err(connect_error)?;

        Ok(ldap)
    }

    /// Locate the user's entry.
    ///
    /// Returns the entry DN and its attributes. The username is escaped
    /// before being substituted into the configured filter.
    async fn find_user(
        &self,
        ldap: &mut ldap3::Ldap,
        username: &str,
        attributes: &[String],
    ) -> Result<SearchEntry, DirectoryError> {
        let filter = self
            .config
            .user_filter
            .replace("{}", &ldap_escape(username));
        debug!("Searching {} with filter {}", self.config.base_dn, filter);

        let (entries, _) = ldap
            .search(
                &self.config.base_dn,
                Scope::Subtree,
                &filter,
                attributes.to_vec(),
            )
            .await
            .map_err(connect_error)?
            .success()
            .map_err(connect_error)?;

        let entry = entries.into_iter().next().ok_or(DirectoryError::NotFound)?;
        Ok(SearchEntry::construct(entry))
    }
}

#[rocket::async_trait]
impl Directory for LdapDirectory {
    async fn authenticate(&self, username: &str, password: &str) -> Result<(), DirectoryError> {
        // An empty password would turn the user bind into an anonymous
        // bind, which many directories accept.
        if password.is_empty() {
            return Err(DirectoryError::AuthFailure);
        }

        let mut ldap = self.connect().await?;
        let entry = match self.find_user(&mut ldap, username, &[]).await {
            Ok(entry) => entry,
            Err(DirectoryError::NotFound) => {
                // Wrong username and wrong password are indistinguishable
                // to the caller.
                let _ = ldap.unbind().await;
                return Err(DirectoryError::AuthFailure);
            }
            Err(err) => {
                let _ = ldap.unbind().await;
                return Err(err);
            }
        };

        debug!("Binding as {}", entry.dn);
        let bind = ldap.simple_bind(&entry.dn, password).await;
        let result = match bind {
            Ok(result) if result.rc == INVALID_CREDENTIALS => Err(DirectoryError::AuthFailure),
            Ok(result) => result
                .success()
                .map(|_| ())
                .map_err(connect_error),
            Err(err) => Err(connect_error(err)),
        };

        if let Err(err) = ldap.unbind().await {
            warn!("LDAP unbind failed: {}", err);
        }
        result
    }

    async fn user_attributes(
        &self,
        username: &str,
        attributes: &[String],
    ) -> Result<AttributeMap, DirectoryError> {
        let mut ldap = self.connect().await?;
        let entry = match self.find_user(&mut ldap, username, attributes).await {
            Ok(entry) => entry,
            Err(err) => {
                let _ = ldap.unbind().await;
                return Err(err);
            }
        };

        if let Err(err) = ldap.unbind().await {
            warn!("LDAP unbind failed: {}", err);
        }
        Ok(entry.attrs.into_iter().collect())
    }
}

fn connect_error(err: LdapError) -> DirectoryError {
    DirectoryError::Connect(err.to_string())
}

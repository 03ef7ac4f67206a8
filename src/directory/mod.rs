// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Directory access for authentication and user attributes
//!
//! The provider never stores credentials or user profiles itself; both
//! live in an LDAP directory. This module defines the [`Directory`] trait
//! the protocol core talks to, and the [`LdapDirectory`] implementation
//! backed by `ldap3`.
//!
//! The trait seam keeps the authorization state machine independent of the
//! wire protocol: tests inject an in-memory directory, production wires up
//! [`LdapDirectory`].

pub mod ldap;

use std::collections::HashMap;

use thiserror::Error;

pub use ldap::LdapDirectory;

/// Errors surfaced by directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Transport or directory-side failure. Not retryable by the server;
    /// an operator has to look at the directory.
    #[error("directory connection failed: {0}")]
    Connect(String),

    /// The presented credentials do not match the user entry.
    #[error("invalid credentials")]
    AuthFailure,

    /// No entry matches the subject.
    #[error("user not found")]
    NotFound,
}

/// Attribute map returned by a user lookup: attribute name to its values.
pub type AttributeMap = HashMap<String, Vec<String>>;

/// Authentication and attribute lookups against the user directory.
///
/// Implementations open their own connection per operation and release it
/// on every exit path; nothing is shared across requests.
#[rocket::async_trait]
pub trait Directory: Send + Sync {
    /// Verify a user's credentials.
    ///
    /// Locates the user's entry and binds as it with the supplied
    /// password. `AuthFailure` means the password (or user) is wrong;
    /// `Connect` means the directory itself could not be reached.
    async fn authenticate(&self, username: &str, password: &str) -> Result<(), DirectoryError>;

    /// Fetch the requested attributes of a user entry.
    ///
    /// Attributes missing from the entry are omitted from the result, not
    /// reported as errors. `NotFound` means the entry itself has vanished.
    async fn user_attributes(
        &self,
        username: &str,
        attributes: &[String],
    ) -> Result<AttributeMap, DirectoryError>;
}

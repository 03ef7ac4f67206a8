// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Rust LDAP OIDC Library
//!
//! An OpenID Connect identity provider that delegates user authentication
//! and attribute storage to an LDAP directory. It accepts standard
//! OIDC/OAuth2 flows from relying-party clients, verifies end-user
//! credentials against LDAP, mints RS256-signed tokens, and exposes the
//! discovery, JWKS and userinfo surfaces relying parties depend on.
//!
//! ## Main Components
//!
//! - **Config**: YAML-backed, schema-validated configuration
//! - **Directory**: LDAP credential binding and attribute lookup
//! - **Token**: JWT issuance, parsing and validation with one RSA key pair
//! - **OIDC**: the authorization state machine, claim mapping and the
//!   protocol error taxonomy
//! - **Web**: Rocket endpoint handlers (authorize, token, userinfo, JWKS,
//!   discovery)
//!
//! ## Usage
//!
//! This library can be used either:
//!
//! 1. As a dependency embedding the provider in another Rust service
//! 2. Through the `rust_ldap_oidc` binary for a standalone deployment

/// Configuration handling for the identity provider.
///
/// Provides functionality for loading, validating, and managing settings
/// including client registrations, scope rules and LDAP connection
/// parameters.
pub mod config;

/// Directory access for authentication and user attributes.
///
/// Defines the directory seam used by the protocol core and its LDAP
/// implementation.
pub mod directory;

/// OpenID Connect protocol core.
///
/// Request parsing and validation, the authorization state machine,
/// scope-to-claim projection and the error taxonomy.
pub mod oidc;

/// Token subsystem.
///
/// Claim structures for every token kind, RSA key material with JWKS
/// publication, and the token manager that signs and verifies them.
pub mod token;

/// HTTP endpoint handlers.
///
/// Implements the web server with the authorization, token, userinfo,
/// JWKS and discovery endpoints.
pub mod web;

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP endpoint handlers
//!
//! Thin Rocket handlers over the protocol core: each one parses the
//! request, invokes the state machine or token logic, and translates the
//! result to HTTP. No protocol state lives here.

/// Authorization endpoint (login page, credential submission)
pub mod authorize;

/// Discovery and JWKS endpoints
pub mod discovery;

/// Server assembly and shared state
pub mod server;

/// Token endpoint (code exchange, refresh)
pub mod token;

/// Userinfo endpoint
pub mod userinfo;

pub use server::{build_rocket, ServerState};

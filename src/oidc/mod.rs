// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OpenID Connect protocol core
//!
//! Everything between the HTTP handlers and the token/directory layers:
//! request parsing and validation, the error taxonomy with its
//! redirect-or-render discipline, scope-to-claim projection, and the
//! authorization state machine itself.

/// OAuth 2.0 / OIDC error taxonomy and response rendering
pub mod error;

/// The authorization state machine
pub mod flow;

/// Scope-to-claim projection
pub mod mapper;

/// Authorization request parsing and validation
pub mod request;

pub use error::{AuthError, ErrorBody, ErrorKind, ErrorRedirect};
pub use flow::{AuthorizeOutcome, Authorizer, SSO_COOKIE};
pub use mapper::ClaimMapper;
pub use request::{AuthRequest, AuthorizeParams, Prompts, ResponseMode, ResponseTypes};

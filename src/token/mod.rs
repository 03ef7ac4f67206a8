// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Token subsystem: claims, key material and the manager

/// JWT claim structures for every token kind
pub mod claims;

/// RSA key management and JWKS publication
pub mod keys;

/// Token issuance, parsing and validation
pub mod manager;

pub use claims::{
    AccessClaims, CodeClaims, CommonClaims, IdTokenClaims, RefreshClaims, SsoClaims, TokenType,
};
pub use keys::{Jwk, JwkKeySet, KeyPair};
pub use manager::{CodeGrant, TokenError, TokenManager};

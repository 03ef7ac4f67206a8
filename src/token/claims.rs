// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JWT claim structures for the provider's token kinds
//!
//! Every artifact the provider mints is an RS256-signed JWT; the payload
//! `typ` claim distinguishes the kinds. This module defines one claim
//! structure per kind plus the shared validation applied after parsing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::manager::TokenError;

/// Token kind discriminator carried in the payload `typ` claim.
///
/// A token never validates as a kind other than its own; parsing checks
/// this value before any other claim is inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    #[serde(rename = "CODE")]
    Code,
    #[serde(rename = "ACCESS_TOKEN")]
    Access,
    #[serde(rename = "REFRESH_TOKEN")]
    Refresh,
    #[serde(rename = "SSO_TOKEN")]
    Sso,
    #[serde(rename = "ID_TOKEN")]
    Id,
}

/// Claims shared by every token kind, used by the post-parse validation.
pub trait CommonClaims {
    fn issuer(&self) -> &str;
    fn audience(&self) -> &str;
    fn issued_at(&self) -> i64;
    fn expires_at(&self) -> i64;

    /// Standard claim validation applied after signature verification.
    ///
    /// Checks the issuer, optionally the audience, and that `now` lies
    /// within `[iat, exp)`.
    fn validate(
        &self,
        expected_issuer: &str,
        expected_audience: Option<&str>,
        now: i64,
    ) -> Result<(), TokenError> {
        if self.issuer() != expected_issuer {
            return Err(TokenError::UnexpectedIssuer);
        }
        if let Some(audience) = expected_audience {
            if self.audience() != audience {
                return Err(TokenError::UnexpectedAudience);
            }
        }
        if now < self.issued_at() || now >= self.expires_at() {
            return Err(TokenError::Expired);
        }
        Ok(())
    }
}

macro_rules! impl_common_claims {
    ($ty:ty) => {
        impl CommonClaims for $ty {
            fn issuer(&self) -> &str {
                &self.iss
            }
            fn audience(&self) -> &str {
                &self.aud
            }
            fn issued_at(&self) -> i64 {
                self.iat
            }
            fn expires_at(&self) -> i64 {
                self.exp
            }
        }
    };
}

/// Authorization code claims.
///
/// The code binds the full authorization request so the token endpoint can
/// re-validate the exchange without server-side state: client (audience),
/// scope, nonce, redirect URI and the PKCE challenge all travel inside the
/// signed payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeClaims {
    pub typ: TokenType,

    /// Authenticated subject the code was issued for.
    pub sub: String,

    /// Issuer URL of this provider.
    pub iss: String,

    /// Client the code is bound to.
    pub aud: String,

    pub iat: i64,
    pub exp: i64,

    /// Unique token identifier.
    pub jti: String,

    /// Space-delimited granted scopes.
    pub scope: String,

    /// Redirect URI of the originating request; the exchange must present
    /// the same value byte for byte.
    pub redirect_uri: String,

    /// Time of the interactive authentication this code derives from.
    pub auth_time: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// PKCE challenge recorded at authorization time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// PKCE challenge method, `plain` or `S256`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,
}

impl_common_claims!(CodeClaims);

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub typ: TokenType,
    pub sub: String,
    pub iss: String,

    /// Client the token was issued to.
    pub aud: String,

    pub iat: i64,
    pub exp: i64,
    pub jti: String,

    /// Space-delimited granted scopes; userinfo projects claims from
    /// exactly this set.
    pub scope: String,
}

impl_common_claims!(AccessClaims);

/// Refresh token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub typ: TokenType,
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub scope: String,
}

impl_common_claims!(RefreshClaims);

/// SSO session claims, carried in the browser cookie.
///
/// The audience is the issuer itself; `authorized_parties` records the
/// clients the session may be reused for without a fresh login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsoClaims {
    pub typ: TokenType,
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,

    /// Time of the original interactive authentication, compared against
    /// `max_age` on reuse.
    pub auth_time: i64,

    /// Clients this session has been authorized for.
    pub authorized_parties: Vec<String>,
}

impl_common_claims!(SsoClaims);

impl SsoClaims {
    /// True when the session may be reused for the given client.
    pub fn authorizes(&self, client_id: &str) -> bool {
        self.authorized_parties.iter().any(|c| c == client_id)
    }
}

/// ID token claims.
///
/// Scope-projected profile claims are flattened into the payload next to
/// the standard fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub typ: TokenType,
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,

    /// Time of the interactive authentication being asserted.
    pub auth_time: i64,

    /// Nonce echoed from the authorization request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Left-half SHA-256 hash of the access token issued alongside.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_hash: Option<String>,

    /// Left-half SHA-256 hash of the authorization code issued alongside.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_hash: Option<String>,

    /// Scope-projected claims (name, email, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_common_claims!(IdTokenClaims);

#[cfg(test)]
mod tests {
    use super::*;

    fn access(iat: i64, exp: i64) -> AccessClaims {
        AccessClaims {
            typ: TokenType::Access,
            sub: "alice".to_string(),
            iss: "https://idp.example.com".to_string(),
            aud: "app".to_string(),
            iat,
            exp,
            jti: "1".to_string(),
            scope: "openid".to_string(),
        }
    }

    #[test]
    fn validate_accepts_within_lifetime() {
        let claims = access(100, 200);
        assert!(claims
            .validate("https://idp.example.com", Some("app"), 150)
            .is_ok());
    }

    #[test]
    fn validate_rejects_outside_lifetime() {
        let claims = access(100, 200);
        assert!(matches!(
            claims.validate("https://idp.example.com", None, 200),
            Err(TokenError::Expired)
        ));
        assert!(matches!(
            claims.validate("https://idp.example.com", None, 99),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn validate_rejects_wrong_issuer_and_audience() {
        let claims = access(100, 200);
        assert!(matches!(
            claims.validate("https://other.example.com", None, 150),
            Err(TokenError::UnexpectedIssuer)
        ));
        assert!(matches!(
            claims.validate("https://idp.example.com", Some("other"), 150),
            Err(TokenError::UnexpectedAudience)
        ));
    }

    #[test]
    fn typ_serializes_to_wire_names() {
        assert_eq!(
            serde_json::to_string(&TokenType::Access).unwrap(),
            "\"ACCESS_TOKEN\""
        );
        assert_eq!(serde_json::to_string(&TokenType::Code).unwrap(), "\"CODE\"");
    }
}

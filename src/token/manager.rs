// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Token issuance, parsing and validation
//!
//! The [`TokenManager`] owns the signing key and the lifetime policy. All
//! five token kinds go through the same RS256 signing helper (which stamps
//! the `kid` header) and the same parsing discipline: the header `kid` is
//! checked against the current key, the signature is verified before any
//! claim is inspected, expiry is enforced, and the payload `typ` must
//! match the expected kind.
//!
//! # Example
//!
//! ```no_run
//! use rust_ldap_oidc::config::TtlConfig;
//! use rust_ldap_oidc::token::{KeyPair, TokenManager};
//!
//! let key = KeyPair::load_or_generate(None).unwrap();
//! let manager = TokenManager::new("https://idp.example.com", key, TtlConfig::default());
//!
//! let access = manager
//!     .create_access_token("alice", "my-client", "openid profile")
//!     .unwrap();
//! let claims = manager.parse_access_token(&access).unwrap();
//! assert_eq!(claims.sub, "alice");
//! ```

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{Algorithm, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use super::claims::{
    AccessClaims, CodeClaims, IdTokenClaims, RefreshClaims, SsoClaims, TokenType,
};
use super::keys::{JwkKeySet, KeyPair};
use crate::config::TtlConfig;

/// Errors surfaced by token operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The signature does not verify against the current public key.
    #[error("token signature is invalid")]
    Signature,

    /// The token is not a well-formed JWT of the expected shape.
    #[error("malformed token: {0}")]
    Format(String),

    /// The current time lies outside the token's `[iat, exp)` window.
    #[error("token has expired")]
    Expired,

    /// The `kid` header is missing or names a key this provider does not
    /// hold.
    #[error("token was signed with an unknown key")]
    UnknownKey,

    /// The payload `typ` does not match the expected token kind.
    #[error("unexpected token type")]
    UnexpectedType,

    /// The `iss` claim does not match the configured issuer.
    #[error("unexpected token issuer")]
    UnexpectedIssuer,

    /// The `aud` claim does not match the expected audience.
    #[error("unexpected token audience")]
    UnexpectedAudience,

    /// Signing failed; the key material is unusable.
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Everything an authorization code has to bind for a later exchange.
#[derive(Debug, Clone)]
pub struct CodeGrant {
    pub subject: String,
    pub client_id: String,
    /// Space-delimited granted scopes.
    pub scope: String,
    pub redirect_uri: String,
    pub nonce: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub auth_time: i64,
}

/// Signs and verifies all token kinds with the provider's key pair.
pub struct TokenManager {
    issuer: String,
    key: KeyPair,
    ttl: TtlConfig,
}

impl TokenManager {
    pub fn new(issuer: impl Into<String>, key: KeyPair, ttl: TtlConfig) -> Self {
        Self {
            issuer: issuer.into(),
            key,
            ttl,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn access_ttl_seconds(&self) -> u64 {
        self.ttl.access
    }

    pub fn sso_ttl_seconds(&self) -> u64 {
        self.ttl.sso
    }

    /// The published key set for the JWKS endpoint.
    pub fn jwks(&self) -> JwkKeySet {
        self.key.jwks()
    }

    /// Mint an authorization code binding the full request context.
    pub fn create_code(&self, grant: CodeGrant) -> Result<String, TokenError> {
        let now = Utc::now();
        self.sign(&CodeClaims {
            typ: TokenType::Code,
            sub: grant.subject,
            iss: self.issuer.clone(),
            aud: grant.client_id,
            iat: now.timestamp(),
            exp: (now + self.ttl.code_duration()).timestamp(),
            jti: Uuid::new_v4().to_string(),
            scope: grant.scope,
            redirect_uri: grant.redirect_uri,
            auth_time: grant.auth_time,
            nonce: grant.nonce,
            code_challenge: grant.code_challenge,
            code_challenge_method: grant.code_challenge_method,
        })
    }

    /// Mint an access token for a subject and client.
    pub fn create_access_token(
        &self,
        subject: &str,
        client_id: &str,
        scope: &str,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        self.sign(&AccessClaims {
            typ: TokenType::Access,
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            aud: client_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl.access_duration()).timestamp(),
            jti: Uuid::new_v4().to_string(),
            scope: scope.to_string(),
        })
    }

    /// Mint a refresh token for a subject and client.
    pub fn create_refresh_token(
        &self,
        subject: &str,
        client_id: &str,
        scope: &str,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        self.sign(&RefreshClaims {
            typ: TokenType::Refresh,
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            aud: client_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl.refresh_duration()).timestamp(),
            jti: Uuid::new_v4().to_string(),
            scope: scope.to_string(),
        })
    }

    /// Mint an ID token.
    ///
    /// `extra` carries the scope-projected claims; `at_hash`/`c_hash` are
    /// supplied when an access token or code is issued alongside.
    #[allow(clippy::too_many_arguments)]
    pub fn create_id_token(
        &self,
        subject: &str,
        client_id: &str,
        nonce: Option<String>,
        auth_time: i64,
        extra: Map<String, Value>,
        at_hash: Option<String>,
        c_hash: Option<String>,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        self.sign(&IdTokenClaims {
            typ: TokenType::Id,
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            aud: client_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl.access_duration()).timestamp(),
            auth_time,
            nonce,
            at_hash,
            c_hash,
            extra,
        })
    }

    /// Mint an SSO session token; the audience is the issuer itself.
    pub fn create_sso_token(
        &self,
        subject: &str,
        auth_time: i64,
        authorized_parties: Vec<String>,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        self.sign(&SsoClaims {
            typ: TokenType::Sso,
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            aud: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl.sso_duration()).timestamp(),
            jti: Uuid::new_v4().to_string(),
            auth_time,
            authorized_parties,
        })
    }

    pub fn parse_code_token(&self, raw: &str) -> Result<CodeClaims, TokenError> {
        let claims: CodeClaims = self.decode(raw)?;
        if claims.typ != TokenType::Code {
            return Err(TokenError::UnexpectedType);
        }
        Ok(claims)
    }

    pub fn parse_access_token(&self, raw: &str) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = self.decode(raw)?;
        if claims.typ != TokenType::Access {
            return Err(TokenError::UnexpectedType);
        }
        Ok(claims)
    }

    pub fn parse_refresh_token(&self, raw: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = self.decode(raw)?;
        if claims.typ != TokenType::Refresh {
            return Err(TokenError::UnexpectedType);
        }
        Ok(claims)
    }

    pub fn parse_sso_token(&self, raw: &str) -> Result<SsoClaims, TokenError> {
        let claims: SsoClaims = self.decode(raw)?;
        if claims.typ != TokenType::Sso {
            return Err(TokenError::UnexpectedType);
        }
        Ok(claims)
    }

    pub fn parse_id_token(&self, raw: &str) -> Result<IdTokenClaims, TokenError> {
        let claims: IdTokenClaims = self.decode(raw)?;
        if claims.typ != TokenType::Id {
            return Err(TokenError::UnexpectedType);
        }
        Ok(claims)
    }

    /// RS256-sign a claim set with the `kid` header stamped.
    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key.kid().to_string());
        jsonwebtoken::encode(&header, claims, self.key.encoding_key())
            .map_err(|err| TokenError::Signing(err.to_string()))
    }

    /// Verify and deserialize a token.
    ///
    /// The `kid` header is checked first, then the signature; claims are
    /// only materialized once both hold. Expiry is enforced with no
    /// leeway.
    fn decode<T: DeserializeOwned>(&self, raw: &str) -> Result<T, TokenError> {
        let header =
            jsonwebtoken::decode_header(raw).map_err(|err| TokenError::Format(err.to_string()))?;
        match header.kid.as_deref() {
            Some(kid) if kid == self.key.kid() => {}
            _ => return Err(TokenError::UnknownKey),
        }
        if header.alg != Algorithm::RS256 {
            return Err(TokenError::Format(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        validation.validate_aud = false;

        let data = jsonwebtoken::decode::<T>(raw, self.key.decoding_key(), &validation)
            .map_err(map_decode_error)?;
        Ok(data.claims)
    }

    /// OIDC token hash: left-most 128 bits of SHA-256, base64url without
    /// padding. Used for `at_hash` and `c_hash`.
    pub fn token_hash(token: &str) -> String {
        let digest = Sha256::digest(token.as_bytes());
        URL_SAFE_NO_PAD.encode(&digest[..16])
    }

    /// Check a PKCE verifier against the challenge recorded in the code.
    pub fn verify_code_challenge(verifier: &str, challenge: &str, method: &str) -> bool {
        match method {
            "S256" => {
                let digest = Sha256::digest(verifier.as_bytes());
                URL_SAFE_NO_PAD.encode(digest) == challenge
            }
            _ => verifier == challenge,
        }
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => TokenError::Expired,
        ErrorKind::InvalidSignature => TokenError::Signature,
        _ => TokenError::Format(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::claims::CommonClaims;

    fn manager() -> TokenManager {
        let key = KeyPair::load_or_generate(None).unwrap();
        TokenManager::new("https://idp.example.com", key, TtlConfig::default())
    }

    fn grant() -> CodeGrant {
        CodeGrant {
            subject: "alice".to_string(),
            client_id: "app".to_string(),
            scope: "openid profile".to_string(),
            redirect_uri: "https://app/cb".to_string(),
            nonce: Some("n1".to_string()),
            code_challenge: None,
            code_challenge_method: None,
            auth_time: Utc::now().timestamp(),
        }
    }

    #[test]
    fn code_round_trips_with_identical_claims() {
        let manager = manager();
        let code = manager.create_code(grant()).unwrap();
        let claims = manager.parse_code_token(&code).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.aud, "app");
        assert_eq!(claims.scope, "openid profile");
        assert_eq!(claims.redirect_uri, "https://app/cb");
        assert_eq!(claims.nonce.as_deref(), Some("n1"));
        assert!(claims
            .validate("https://idp.example.com", Some("app"), Utc::now().timestamp())
            .is_ok());
    }

    #[test]
    fn access_token_does_not_parse_as_code() {
        let manager = manager();
        let access = manager
            .create_access_token("alice", "app", "openid")
            .unwrap();
        assert!(matches!(
            manager.parse_code_token(&access),
            Err(TokenError::UnexpectedType)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let manager = manager();
        let now = Utc::now().timestamp();
        let expired = manager
            .sign(&AccessClaims {
                typ: TokenType::Access,
                sub: "alice".to_string(),
                iss: "https://idp.example.com".to_string(),
                aud: "app".to_string(),
                iat: now - 120,
                exp: now - 60,
                jti: "1".to_string(),
                scope: "openid".to_string(),
            })
            .unwrap();
        assert!(matches!(
            manager.parse_access_token(&expired),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn foreign_key_is_rejected() {
        let manager = manager();
        let other = TokenManager::new(
            "https://idp.example.com",
            KeyPair::load_or_generate(None).unwrap(),
            TtlConfig::default(),
        );
        let token = other.create_access_token("alice", "app", "openid").unwrap();
        // A different key pair means a different kid.
        assert!(matches!(
            manager.parse_access_token(&token),
            Err(TokenError::UnknownKey)
        ));
    }

    #[test]
    fn id_token_round_trips_with_flattened_claims() {
        let manager = manager();
        let mut extra = Map::new();
        extra.insert("name".to_string(), "Alice Adams".into());
        extra.insert("groups".to_string(), vec!["admins", "users"].into());

        let auth_time = Utc::now().timestamp();
        let token = manager
            .create_id_token(
                "alice",
                "app",
                Some("n1".to_string()),
                auth_time,
                extra,
                Some("at".to_string()),
                None,
            )
            .unwrap();

        let claims = manager.parse_id_token(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.nonce.as_deref(), Some("n1"));
        assert_eq!(claims.auth_time, auth_time);
        assert_eq!(claims.at_hash.as_deref(), Some("at"));
        assert!(claims.c_hash.is_none());
        assert_eq!(claims.extra["name"], "Alice Adams");
        assert_eq!(claims.extra["groups"][1], "users");
    }

    #[test]
    fn sso_token_tracks_authorized_parties() {
        let manager = manager();
        let token = manager
            .create_sso_token("alice", Utc::now().timestamp(), vec!["app".to_string()])
            .unwrap();
        let claims = manager.parse_sso_token(&token).unwrap();
        assert!(claims.authorizes("app"));
        assert!(!claims.authorizes("other"));
        assert_eq!(claims.aud, "https://idp.example.com");
    }

    #[test]
    fn pkce_s256_verification() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let challenge = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";
        assert!(TokenManager::verify_code_challenge(
            verifier, challenge, "S256"
        ));
        assert!(!TokenManager::verify_code_challenge(
            "wrong-verifier",
            challenge,
            "S256"
        ));
    }

    #[test]
    fn pkce_plain_verification() {
        assert!(TokenManager::verify_code_challenge("abc", "abc", "plain"));
        assert!(!TokenManager::verify_code_challenge("abc", "abd", "plain"));
    }
}

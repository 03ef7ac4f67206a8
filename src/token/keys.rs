// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! RSA key material for token signing
//!
//! The provider signs every token with a single RSA-2048 key pair. The
//! pair is loaded from a PEM file when one is configured and present, and
//! generated (and persisted) otherwise. The public half is published on
//! the JWKS endpoint under a `kid` derived from the key's fingerprint, so
//! the identifier is stable for as long as the key is.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{DecodingKey, EncodingKey};
use log::{debug, info};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Size of generated keys, in bits.
const KEY_BITS: usize = 2048;

/// Length of the derived `kid`, in base64url characters.
const KID_LEN: usize = 16;

/// A single JSON Web Key in its published form (RFC 7517).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always `RSA`.
    pub kty: String,

    /// Intended use, always `sig`.
    #[serde(rename = "use")]
    pub key_use: String,

    /// Signing algorithm, always `RS256`.
    pub alg: String,

    /// Key identifier, matching the `kid` header of every minted token.
    pub kid: String,

    /// Modulus, base64url without padding.
    pub n: String,

    /// Public exponent, base64url without padding.
    pub e: String,
}

/// The JWKS document served on the keys endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwkKeySet {
    pub keys: Vec<Jwk>,
}

/// The provider's signing key pair.
///
/// Read-only after startup; shared across request handlers behind an
/// `Arc`.
pub struct KeyPair {
    kid: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    jwk: Jwk,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("kid", &self.kid)
            .field("encoding_key", &"<EncodingKey>")
            .field("decoding_key", &"<DecodingKey>")
            .finish()
    }
}

impl KeyPair {
    /// Load the key pair from a PEM file, or generate a fresh one.
    ///
    /// When `path` is given and the file exists it is read; when it does
    /// not exist the generated key is persisted there so restarts keep
    /// the same key (and `kid`). Without a path the key is ephemeral.
    pub fn load_or_generate(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => {
                debug!("Loading RSA key pair from {:?}", path);
                let pem = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read key file at {:?}", path))?;
                Self::from_pem(&pem)
            }
            Some(path) => {
                info!("Key file {:?} not found, generating a new RSA key pair", path);
                let private_key = Self::generate_private_key()?;
                let pem = private_key
                    .to_pkcs1_pem(LineEnding::LF)
                    .context("Failed to serialize generated key")?;
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        fs::create_dir_all(parent).with_context(|| {
                            format!("Failed to create key directory at {:?}", parent)
                        })?;
                    }
                }
                fs::write(path, pem.as_bytes())
                    .with_context(|| format!("Failed to write key file at {:?}", path))?;
                Self::from_private_key(private_key)
            }
            None => {
                info!("No key file configured, generating an ephemeral RSA key pair");
                Self::from_private_key(Self::generate_private_key()?)
            }
        }
    }

    /// Build a key pair from a private key PEM (PKCS#1 or PKCS#8).
    pub fn from_pem(pem: &str) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .context("Failed to parse RSA private key PEM")?;
        Self::from_private_key(private_key)
    }

    fn generate_private_key() -> Result<RsaPrivateKey> {
        let mut rng = rsa::rand_core::OsRng;
        RsaPrivateKey::new(&mut rng, KEY_BITS).context("Failed to generate RSA key pair")
    }

    fn from_private_key(private_key: RsaPrivateKey) -> Result<Self> {
        let public_key = RsaPublicKey::from(&private_key);

        let private_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .context("Failed to serialize private key")?;
        let public_pem = public_key
            .to_pkcs1_pem(LineEnding::LF)
            .context("Failed to serialize public key")?;

        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .context("Failed to build signing key")?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .context("Failed to build verification key")?;

        let kid = derive_kid(&public_key)?;
        let jwk = Jwk {
            kty: "RSA".to_string(),
            key_use: "sig".to_string(),
            alg: "RS256".to_string(),
            kid: kid.clone(),
            n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        };

        Ok(Self {
            kid,
            encoding_key,
            decoding_key,
            jwk,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// The published key set: the current public key only.
    pub fn jwks(&self) -> JwkKeySet {
        JwkKeySet {
            keys: vec![self.jwk.clone()],
        }
    }
}

/// Stable key identifier: base64url of the SHA-256 fingerprint of the
/// public key DER, truncated.
fn derive_kid(public_key: &RsaPublicKey) -> Result<String> {
    let der = public_key
        .to_pkcs1_der()
        .context("Failed to serialize public key DER")?;
    let digest = Sha256::digest(der.as_bytes());
    let mut kid = URL_SAFE_NO_PAD.encode(digest);
    kid.truncate(KID_LEN);
    Ok(kid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generated_pair_round_trips_through_pem_with_same_kid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("key.pem");

        let generated = KeyPair::load_or_generate(Some(&path)).unwrap();
        assert!(path.exists());

        let reloaded = KeyPair::load_or_generate(Some(&path)).unwrap();
        assert_eq!(generated.kid(), reloaded.kid());
        assert_eq!(generated.jwks().keys[0].n, reloaded.jwks().keys[0].n);
    }

    #[test]
    fn jwk_has_expected_shape() {
        let pair = KeyPair::load_or_generate(None).unwrap();
        let jwks = pair.jwks();
        assert_eq!(jwks.keys.len(), 1);
        let jwk = &jwks.keys[0];
        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.alg, "RS256");
        assert_eq!(jwk.key_use, "sig");
        assert_eq!(jwk.kid.len(), KID_LEN);
        assert!(!jwk.n.is_empty());
        assert!(!jwk.e.is_empty());
    }
}

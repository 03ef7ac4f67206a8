// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! The authorization state machine
//!
//! One authorize request runs through: parse and validate the parameters,
//! authenticate the user (SSO cookie reuse or LDAP credential bind), then
//! compose the response artifacts and the redirect back to the client.
//! The machine is stateless across HTTP transactions: a GET that needs
//! credentials preserves the request as hidden form fields, and the POST
//! re-enters the same pipeline from scratch.

use chrono::Utc;
use log::{debug, error, warn};
use serde_json::Map;

use super::error::{AuthError, ErrorKind};
use super::mapper::ClaimMapper;
use super::request::{AuthRequest, AuthorizeParams};
use crate::config::Config;
use crate::directory::{Directory, DirectoryError};
use crate::token::{CodeGrant, SsoClaims, TokenManager};
use crate::token::claims::CommonClaims;

/// Name of the SSO session cookie.
pub const SSO_COOKIE: &str = "sso_token";

/// Result of a successfully processed authorize request.
pub enum AuthorizeOutcome {
    /// Redirect to the client with the response artifacts; the SSO cookie
    /// is set or refreshed alongside.
    Redirect { location: String, sso_token: String },

    /// Render the login page, preserving the request. `error` carries the
    /// inline message after a failed credential attempt.
    Login {
        params: AuthorizeParams,
        error: Option<String>,
    },
}

/// The authorization protocol core, independent of HTTP plumbing.
pub struct Authorizer<'a> {
    config: &'a Config,
    tokens: &'a TokenManager,
    mapper: &'a ClaimMapper,
    directory: &'a dyn Directory,
}

impl<'a> Authorizer<'a> {
    pub fn new(
        config: &'a Config,
        tokens: &'a TokenManager,
        mapper: &'a ClaimMapper,
        directory: &'a dyn Directory,
    ) -> Self {
        Self {
            config,
            tokens,
            mapper,
            directory,
        }
    }

    /// Process one authorize transaction (GET or credential POST).
    pub async fn authorize(
        &self,
        params: AuthorizeParams,
        sso_cookie: Option<&str>,
    ) -> Result<AuthorizeOutcome, AuthError> {
        let request = AuthRequest::parse(&params, self.config)?;
        let now = Utc::now().timestamp();

        // A POST carrying credentials is the submitted login form.
        if params.username.is_some() || params.password.is_some() {
            let username = params.username.clone().unwrap_or_default();
            let password = params.password.clone().unwrap_or_default();

            return match self.directory.authenticate(&username, &password).await {
                Ok(()) => {
                    debug!("Credentials verified for {}", username);
                    let parties = self.carried_parties(&username, sso_cookie, now);
                    self.compose(&request, &username, now, parties).await
                }
                Err(DirectoryError::AuthFailure) | Err(DirectoryError::NotFound) => {
                    debug!("Credential verification failed for {}", username);
                    Ok(AuthorizeOutcome::Login {
                        params,
                        error: Some("Invalid username or password".to_string()),
                    })
                }
                Err(DirectoryError::Connect(cause)) => {
                    error!("Directory unavailable during authentication: {}", cause);
                    Err(request.error(ErrorKind::ServerError, "authentication failed"))
                }
            };
        }

        // No credentials: try to reuse the SSO session.
        if let Some(sso) = self.reusable_sso(&request, sso_cookie, now) {
            debug!("SSO session reused for {}", sso.sub);
            let subject = sso.sub.clone();
            return self
                .compose(&request, &subject, sso.auth_time, sso.authorized_parties)
                .await;
        }

        if request.prompt.none {
            return Err(request.error(
                ErrorKind::LoginRequired,
                "no reusable session and prompt=none forbids interaction",
            ));
        }

        Ok(AuthorizeOutcome::Login {
            params,
            error: None,
        })
    }

    /// A valid SSO session the request is allowed to reuse, if any.
    ///
    /// Reuse requires the cookie to verify, the requesting client to be in
    /// the session's authorized-party list, no interactive prompt, and
    /// `max_age` (when given) not exceeded relative to the original
    /// authentication time.
    fn reusable_sso(
        &self,
        request: &AuthRequest,
        sso_cookie: Option<&str>,
        now: i64,
    ) -> Option<SsoClaims> {
        let raw = sso_cookie?;
        let claims = match self.tokens.parse_sso_token(raw) {
            Ok(claims) => claims,
            Err(err) => {
                debug!("Ignoring SSO cookie: {}", err);
                return None;
            }
        };
        let issuer = self.tokens.issuer();
        if let Err(err) = claims.validate(issuer, Some(issuer), now) {
            debug!("Ignoring SSO cookie: {}", err);
            return None;
        }
        if !claims.authorizes(&request.client_id) {
            debug!(
                "SSO session for {} does not cover client {}",
                claims.sub, request.client_id
            );
            return None;
        }
        if request.prompt.requires_interaction() {
            debug!("Request insists on interactive login, skipping SSO reuse");
            return None;
        }
        if let Some(max_age) = request.max_age {
            if now - claims.auth_time > max_age {
                debug!("SSO session older than max_age, skipping reuse");
                return None;
            }
        }
        Some(claims)
    }

    /// Authorized parties a fresh credential login inherits from an
    /// existing SSO session of the same subject.
    fn carried_parties(&self, subject: &str, sso_cookie: Option<&str>, now: i64) -> Vec<String> {
        let issuer = self.tokens.issuer();
        sso_cookie
            .and_then(|raw| self.tokens.parse_sso_token(raw).ok())
            .filter(|sso| sso.sub == subject)
            .filter(|sso| sso.validate(issuer, Some(issuer), now).is_ok())
            .map(|sso| sso.authorized_parties)
            .unwrap_or_default()
    }

    /// Compose the response artifacts and the final redirect.
    async fn compose(
        &self,
        request: &AuthRequest,
        subject: &str,
        auth_time: i64,
        mut parties: Vec<String>,
    ) -> Result<AuthorizeOutcome, AuthError> {
        let scope = request.scope_string();
        let mut response: Vec<(String, String)> = Vec::new();

        let code = if request.response_type.code {
            let code = self
                .tokens
                .create_code(CodeGrant {
                    subject: subject.to_string(),
                    client_id: request.client_id.clone(),
                    scope: scope.clone(),
                    redirect_uri: request.redirect_uri.clone(),
                    nonce: request.nonce.clone(),
                    code_challenge: request.code_challenge.clone(),
                    code_challenge_method: request.code_challenge_method.clone(),
                    auth_time,
                })
                .map_err(|err| self.signing_error(request, err))?;
            response.push(("code".to_string(), code.clone()));
            Some(code)
        } else {
            None
        };

        let access_token = if request.response_type.token {
            let token = self
                .tokens
                .create_access_token(subject, &request.client_id, &scope)
                .map_err(|err| self.signing_error(request, err))?;
            response.push(("access_token".to_string(), token.clone()));
            response.push(("token_type".to_string(), "Bearer".to_string()));
            response.push((
                "expires_in".to_string(),
                self.tokens.access_ttl_seconds().to_string(),
            ));
            response.push(("scope".to_string(), scope.clone()));
            Some(token)
        } else {
            None
        };

        if request.response_type.id_token {
            // Profile claims ride in the ID token only when no access
            // token accompanies it; otherwise the client is expected to
            // ask userinfo.
            let extra = if access_token.is_some() {
                Map::new()
            } else {
                self.projected_claims(request, subject).await?
            };

            let id_token = self
                .tokens
                .create_id_token(
                    subject,
                    &request.client_id,
                    request.nonce.clone(),
                    auth_time,
                    extra,
                    access_token.as_deref().map(TokenManager::token_hash),
                    code.as_deref().map(TokenManager::token_hash),
                )
                .map_err(|err| self.signing_error(request, err))?;
            response.push(("id_token".to_string(), id_token));
        }

        if let Some(state) = &request.state {
            response.push(("state".to_string(), state.clone()));
        }

        if !parties.iter().any(|p| p == &request.client_id) {
            parties.push(request.client_id.clone());
        }
        let sso_token = self
            .tokens
            .create_sso_token(subject, auth_time, parties)
            .map_err(|err| self.signing_error(request, err))?;

        let location = request
            .response_mode
            .compose(&request.redirect_uri, &response);
        Ok(AuthorizeOutcome::Redirect {
            location,
            sso_token,
        })
    }

    /// Scope-projected claims for an ID token, with the structural claim
    /// names stripped.
    async fn projected_claims(
        &self,
        request: &AuthRequest,
        subject: &str,
    ) -> Result<Map<String, serde_json::Value>, AuthError> {
        let wanted = self.mapper.attributes_for(&request.scopes);
        let attributes = match self.directory.user_attributes(subject, &wanted).await {
            Ok(attributes) => attributes,
            Err(DirectoryError::NotFound) => {
                warn!("Authenticated subject {} vanished from the directory", subject);
                return Err(request.error(ErrorKind::ServerError, "failed to load user attributes"));
            }
            Err(err) => {
                error!("Attribute lookup failed for {}: {}", subject, err);
                return Err(request.error(ErrorKind::ServerError, "failed to load user attributes"));
            }
        };
        Ok(self
            .mapper
            .project_id_claims(&request.scopes, subject, &attributes))
    }

    fn signing_error(&self, request: &AuthRequest, err: crate::token::TokenError) -> AuthError {
        error!("Token signing failed: {}", err);
        request.error(ErrorKind::ServerError, "token issuance failed")
    }
}

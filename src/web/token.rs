// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Token endpoint
//!
//! Exchanges authorization codes for tokens and redeems refresh tokens.
//! The code carries its full binding (client, scope, redirect URI, PKCE
//! challenge), so the exchange re-checks everything against the request
//! without server-side state. Errors are JSON bodies with the OAuth error
//! code, 400 for grant problems, 401 for failed client authentication.

use std::io::Cursor;

use log::{debug, error};
use rocket::form::Form;
use rocket::http::{ContentType, Status};
use rocket::response::Responder;
use rocket::serde::json::Json;
use rocket::{post, response, FromForm, Request, Response, State};
use serde::Serialize;
use serde_json::Map;

use super::server::ServerState;
use crate::directory::DirectoryError;
use crate::oidc::{ErrorBody, ErrorKind};
use crate::token::claims::CommonClaims;
use crate::token::{TokenError, TokenManager};

/// Form parameters of a token request.
#[derive(Debug, FromForm)]
pub struct TokenParams {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
}

/// Successful token response body.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// JSON protocol error of the token endpoint.
#[derive(Debug)]
pub struct TokenEndpointError {
    status: Status,
    body: ErrorBody,
}

impl TokenEndpointError {
    fn new(status: Status, kind: ErrorKind, description: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody::new(kind, Some(description.into())),
        }
    }

    fn invalid_request(description: impl Into<String>) -> Self {
        Self::new(Status::BadRequest, ErrorKind::InvalidRequest, description)
    }

    fn invalid_grant(description: impl Into<String>) -> Self {
        Self::new(Status::BadRequest, ErrorKind::InvalidGrant, description)
    }

    fn invalid_client(description: impl Into<String>) -> Self {
        Self::new(Status::Unauthorized, ErrorKind::InvalidClient, description)
    }

    fn server_error(description: impl Into<String>) -> Self {
        Self::new(
            Status::InternalServerError,
            ErrorKind::ServerError,
            description,
        )
    }
}

impl<'r> Responder<'r, 'static> for TokenEndpointError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let body = serde_json::to_string(&self.body)
            .unwrap_or_else(|_| "{\"error\":\"server_error\"}".to_string());
        Response::build()
            .status(self.status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

#[post("/", data = "<form>")]
pub async fn token(
    form: Form<TokenParams>,
    state: &State<ServerState>,
) -> Result<Json<TokenResponse>, TokenEndpointError> {
    let params = form.into_inner();
    match params.grant_type.as_deref() {
        Some("authorization_code") => exchange_code(&params, state).await,
        Some("refresh_token") => redeem_refresh_token(&params, state).await,
        Some(other) => Err(TokenEndpointError::invalid_request(format!(
            "unsupported grant_type {:?}",
            other
        ))),
        None => Err(TokenEndpointError::invalid_request("grant_type is missing")),
    }
}

/// The authorization code grant.
async fn exchange_code(
    params: &TokenParams,
    state: &State<ServerState>,
) -> Result<Json<TokenResponse>, TokenEndpointError> {
    let raw_code = params
        .code
        .as_deref()
        .ok_or_else(|| TokenEndpointError::invalid_request("code is missing"))?;

    let code = state
        .tokens
        .parse_code_token(raw_code)
        .map_err(grant_error)?;
    code.validate(state.tokens.issuer(), None, chrono::Utc::now().timestamp())
        .map_err(grant_error)?;

    // The presenting client must be the one the code was issued to.
    let client_id = params
        .client_id
        .as_deref()
        .ok_or_else(|| TokenEndpointError::invalid_request("client_id is missing"))?;
    if client_id != code.aud {
        return Err(TokenEndpointError::invalid_grant(
            "code was issued to a different client",
        ));
    }

    // The redirect URI must equal the one bound into the code.
    let redirect_uri = params
        .redirect_uri
        .as_deref()
        .ok_or_else(|| TokenEndpointError::invalid_request("redirect_uri is missing"))?;
    if redirect_uri != code.redirect_uri {
        return Err(TokenEndpointError::invalid_grant(
            "redirect_uri does not match the authorization request",
        ));
    }

    // PKCE: the verifier must hash to the recorded challenge.
    if let Some(challenge) = &code.code_challenge {
        let verifier = params
            .code_verifier
            .as_deref()
            .ok_or_else(|| TokenEndpointError::invalid_request("code_verifier is missing"))?;
        let method = code.code_challenge_method.as_deref().unwrap_or("plain");
        if !TokenManager::verify_code_challenge(verifier, challenge, method) {
            return Err(TokenEndpointError::invalid_grant(
                "code_verifier does not match the code_challenge",
            ));
        }
    }

    authenticate_client(params, state, client_id)?;

    debug!("Exchanging code for {} (client {})", code.sub, client_id);

    let access_token = state
        .tokens
        .create_access_token(&code.sub, client_id, &code.scope)
        .map_err(signing_error)?;
    let refresh_token = state
        .tokens
        .create_refresh_token(&code.sub, client_id, &code.scope)
        .map_err(signing_error)?;

    let scopes: Vec<String> = code.scope.split_whitespace().map(String::from).collect();
    let extra = projected_claims(state, &scopes, &code.sub).await?;
    let id_token = state
        .tokens
        .create_id_token(
            &code.sub,
            client_id,
            code.nonce.clone(),
            code.auth_time,
            extra,
            Some(TokenManager::token_hash(&access_token)),
            None,
        )
        .map_err(signing_error)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.access_ttl_seconds(),
        scope: code.scope,
        id_token: Some(id_token),
        refresh_token: Some(refresh_token),
    }))
}

/// The refresh token grant.
async fn redeem_refresh_token(
    params: &TokenParams,
    state: &State<ServerState>,
) -> Result<Json<TokenResponse>, TokenEndpointError> {
    let raw = params
        .refresh_token
        .as_deref()
        .ok_or_else(|| TokenEndpointError::invalid_request("refresh_token is missing"))?;

    let refresh = state.tokens.parse_refresh_token(raw).map_err(grant_error)?;
    refresh
        .validate(state.tokens.issuer(), None, chrono::Utc::now().timestamp())
        .map_err(grant_error)?;

    let client_id = params
        .client_id
        .as_deref()
        .ok_or_else(|| TokenEndpointError::invalid_request("client_id is missing"))?;
    if client_id != refresh.aud {
        return Err(TokenEndpointError::invalid_grant(
            "refresh token was issued to a different client",
        ));
    }

    authenticate_client(params, state, client_id)?;

    debug!("Refreshing tokens for {} (client {})", refresh.sub, client_id);

    let access_token = state
        .tokens
        .create_access_token(&refresh.sub, client_id, &refresh.scope)
        .map_err(signing_error)?;
    let refresh_token = state
        .tokens
        .create_refresh_token(&refresh.sub, client_id, &refresh.scope)
        .map_err(signing_error)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.access_ttl_seconds(),
        scope: refresh.scope,
        id_token: None,
        refresh_token: Some(refresh_token),
    }))
}

/// Verify the client secret when client authentication is enabled.
fn authenticate_client(
    params: &TokenParams,
    state: &State<ServerState>,
    client_id: &str,
) -> Result<(), TokenEndpointError> {
    if !state.config.oidc.enable_client_auth {
        return Ok(());
    }
    let client = state
        .config
        .find_client(client_id)
        .ok_or_else(|| TokenEndpointError::invalid_client("unknown client"))?;
    match params.client_secret.as_deref() {
        Some(secret) if secret == client.secret => Ok(()),
        _ => Err(TokenEndpointError::invalid_client(
            "client authentication failed",
        )),
    }
}

/// Scope-projected claims for the ID token minted at the exchange.
async fn projected_claims(
    state: &State<ServerState>,
    scopes: &[String],
    subject: &str,
) -> Result<Map<String, serde_json::Value>, TokenEndpointError> {
    let wanted = state.mapper.attributes_for(scopes.iter());
    let attributes = match state.directory.user_attributes(subject, &wanted).await {
        Ok(attributes) => attributes,
        Err(DirectoryError::NotFound) => {
            return Err(TokenEndpointError::invalid_grant(
                "subject no longer exists",
            ));
        }
        Err(err) => {
            error!("Attribute lookup failed for {}: {}", subject, err);
            return Err(TokenEndpointError::server_error("attribute lookup failed"));
        }
    };
    Ok(state.mapper.project_id_claims(scopes, subject, &attributes))
}

fn grant_error(err: TokenError) -> TokenEndpointError {
    match err {
        TokenError::Expired => TokenEndpointError::invalid_grant("grant has expired"),
        TokenError::Signing(cause) => {
            error!("Token signing failed: {}", cause);
            TokenEndpointError::server_error("token issuance failed")
        }
        other => TokenEndpointError::invalid_grant(other.to_string()),
    }
}

fn signing_error(err: TokenError) -> TokenEndpointError {
    error!("Token signing failed: {}", err);
    TokenEndpointError::server_error("token issuance failed")
}

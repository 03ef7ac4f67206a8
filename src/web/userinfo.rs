// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Userinfo endpoint
//!
//! Accepts the access token as `Authorization: Bearer`, projects the
//! token's scopes over the subject's directory attributes and returns the
//! claim map. Token problems answer 401 with a `WWW-Authenticate`
//! challenge; when the token's client has a configured CORS origin it is
//! echoed as `Access-Control-Allow-Origin` so browser-side clients can
//! read the response.

use std::io::Cursor;

use log::{debug, error, warn};
use rocket::http::{ContentType, Header, Status};
use rocket::request::{FromRequest, Outcome};
use rocket::response::Responder;
use rocket::{get, post, response, Request, Response, State};
use serde_json::{Map, Value};

use super::server::ServerState;
use crate::directory::DirectoryError;
use crate::oidc::{ErrorBody, ErrorKind};
use crate::token::claims::CommonClaims;
use crate::token::TokenError;

/// Request guard extracting the raw Bearer token, if any.
///
/// Extraction never fails; the handler decides how a missing or invalid
/// token is reported so the response carries the proper challenge header.
pub struct BearerToken(pub Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BearerToken {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = request
            .headers()
            .get_one("Authorization")
            .and_then(|header| header.strip_prefix("Bearer "))
            .map(str::to_string);
        Outcome::Success(BearerToken(token))
    }
}

/// Successful userinfo response: the claim map plus the optional CORS
/// header.
pub struct UserInfoResponse {
    claims: Map<String, Value>,
    cors_origin: Option<String>,
}

impl<'r> Responder<'r, 'static> for UserInfoResponse {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let body = serde_json::to_string(&Value::Object(self.claims))
            .map_err(|_| Status::InternalServerError)?;
        let mut builder = Response::build();
        builder
            .status(Status::Ok)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body));
        if let Some(origin) = self.cors_origin {
            builder.header(Header::new("Access-Control-Allow-Origin", origin));
        }
        builder.ok()
    }
}

/// Userinfo protocol error.
pub struct UserInfoError {
    status: Status,
    body: ErrorBody,
}

impl UserInfoError {
    fn invalid_token(description: impl Into<String>) -> Self {
        Self {
            status: Status::Unauthorized,
            body: ErrorBody::new(ErrorKind::InvalidToken, Some(description.into())),
        }
    }

    fn server_error(description: impl Into<String>) -> Self {
        Self {
            status: Status::InternalServerError,
            body: ErrorBody::new(ErrorKind::ServerError, Some(description.into())),
        }
    }
}

impl<'r> Responder<'r, 'static> for UserInfoError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let body = serde_json::to_string(&self.body)
            .unwrap_or_else(|_| "{\"error\":\"server_error\"}".to_string());
        let mut builder = Response::build();
        builder
            .status(self.status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body));
        if self.status == Status::Unauthorized {
            builder.header(Header::new(
                "WWW-Authenticate",
                format!("Bearer error=\"{}\"", self.body.error),
            ));
        }
        builder.ok()
    }
}

#[get("/")]
pub async fn userinfo_get(
    bearer: BearerToken,
    state: &State<ServerState>,
) -> Result<UserInfoResponse, UserInfoError> {
    userinfo(bearer, state).await
}

#[post("/")]
pub async fn userinfo_post(
    bearer: BearerToken,
    state: &State<ServerState>,
) -> Result<UserInfoResponse, UserInfoError> {
    userinfo(bearer, state).await
}

async fn userinfo(
    bearer: BearerToken,
    state: &State<ServerState>,
) -> Result<UserInfoResponse, UserInfoError> {
    let raw = bearer
        .0
        .ok_or_else(|| UserInfoError::invalid_token("missing bearer token"))?;

    let claims = state
        .tokens
        .parse_access_token(&raw)
        .map_err(token_error)?;
    claims
        .validate(state.tokens.issuer(), None, chrono::Utc::now().timestamp())
        .map_err(token_error)?;

    debug!("Userinfo request for {} (client {})", claims.sub, claims.aud);

    let scopes: Vec<String> = claims.scope.split_whitespace().map(String::from).collect();
    let wanted = state.mapper.attributes_for(scopes.iter());
    let attributes = match state.directory.user_attributes(&claims.sub, &wanted).await {
        Ok(attributes) => attributes,
        Err(DirectoryError::NotFound) => {
            // The token refers to a subject that no longer exists.
            warn!("Subject {} vanished from the directory", claims.sub);
            return Err(UserInfoError::invalid_token("unknown subject"));
        }
        Err(err) => {
            error!("Attribute lookup failed for {}: {}", claims.sub, err);
            return Err(UserInfoError::server_error("attribute lookup failed"));
        }
    };

    let claim_map = state.mapper.project(&scopes, &claims.sub, &attributes);
    let cors_origin = state
        .config
        .find_client(&claims.aud)
        .and_then(|client| client.cors_origin.clone());

    Ok(UserInfoResponse {
        claims: claim_map,
        cors_origin,
    })
}

fn token_error(err: TokenError) -> UserInfoError {
    match err {
        TokenError::Expired => UserInfoError::invalid_token("token has expired"),
        other => UserInfoError::invalid_token(other.to_string()),
    }
}

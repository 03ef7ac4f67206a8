// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OAuth 2.0 / OpenID Connect protocol errors
//!
//! One error type covers the whole taxonomy. What distinguishes errors is
//! not their kind but where they surface: before the redirect URI has been
//! verified the client must never receive a redirect, so the error renders
//! as a direct HTTP response (HTML or JSON depending on `Accept`); after
//! verification the error is delivered to the client in the redirect URI's
//! query or fragment, with `state` echoed.

use std::io::Cursor;

use rocket::http::{ContentType, Status};
use rocket::response::{Redirect, Responder};
use rocket::{response, Request, Response};
use serde::Serialize;

use super::request::ResponseMode;

/// Machine-readable error codes of the OAuth2/OIDC taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    UnauthorizedClient,
    AccessDenied,
    UnsupportedResponseType,
    InvalidScope,
    ServerError,
    InvalidToken,
    InvalidGrant,
    InvalidClient,
    LoginRequired,
    ConsentRequired,
    InteractionRequired,
}

impl ErrorKind {
    /// Wire form of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::UnauthorizedClient => "unauthorized_client",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::UnsupportedResponseType => "unsupported_response_type",
            ErrorKind::InvalidScope => "invalid_scope",
            ErrorKind::ServerError => "server_error",
            ErrorKind::InvalidToken => "invalid_token",
            ErrorKind::InvalidGrant => "invalid_grant",
            ErrorKind::InvalidClient => "invalid_client",
            ErrorKind::LoginRequired => "login_required",
            ErrorKind::ConsentRequired => "consent_required",
            ErrorKind::InteractionRequired => "interaction_required",
        }
    }
}

/// Where an error occurring after redirect URI verification is delivered.
#[derive(Debug, Clone)]
pub struct ErrorRedirect {
    pub redirect_uri: String,
    pub mode: ResponseMode,
    pub state: Option<String>,
}

/// A protocol error raised while processing an authorization request.
#[derive(Debug)]
pub struct AuthError {
    pub kind: ErrorKind,
    pub description: Option<String>,
    /// Present once the redirect URI has been verified; absent errors
    /// render directly and never redirect.
    pub redirect: Option<ErrorRedirect>,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.kind.as_str(), description),
            None => f.write_str(self.kind.as_str()),
        }
    }
}

impl std::error::Error for AuthError {}

impl AuthError {
    /// An error raised before the redirect URI was verified.
    pub fn direct(kind: ErrorKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: Some(description.into()),
            redirect: None,
        }
    }

    /// An error delivered to the client via its verified redirect URI.
    pub fn redirect(
        kind: ErrorKind,
        description: impl Into<String>,
        redirect: ErrorRedirect,
    ) -> Self {
        Self {
            kind,
            description: Some(description.into()),
            redirect: Some(redirect),
        }
    }
}

/// JSON body of error responses on the token and userinfo endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl ErrorBody {
    pub fn new(kind: ErrorKind, description: Option<String>) -> Self {
        Self {
            error: kind.as_str().to_string(),
            error_description: description,
        }
    }
}

impl<'r> Responder<'r, 'static> for AuthError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        match self.redirect {
            Some(redirect) => {
                let mut params: Vec<(String, String)> =
                    vec![("error".to_string(), self.kind.as_str().to_string())];
                if let Some(description) = self.description {
                    params.push(("error_description".to_string(), description));
                }
                if let Some(state) = redirect.state {
                    params.push(("state".to_string(), state));
                }
                let location = redirect.mode.compose(&redirect.redirect_uri, &params);
                Redirect::found(location).respond_to(request)
            }
            None => {
                let wants_json = request
                    .headers()
                    .get_one("Accept")
                    .map(|accept| accept.contains("application/json"))
                    .unwrap_or(false);

                let (content_type, body) = if wants_json {
                    let body = serde_json::to_string(&ErrorBody::new(
                        self.kind,
                        self.description.clone(),
                    ))
                    .unwrap_or_else(|_| format!("{{\"error\":\"{}\"}}", self.kind.as_str()));
                    (ContentType::JSON, body)
                } else {
                    (ContentType::HTML, error_page(self.kind, self.description.as_deref()))
                };

                Response::build()
                    .status(Status::BadRequest)
                    .header(content_type)
                    .sized_body(body.len(), Cursor::new(body))
                    .ok()
            }
        }
    }
}

/// Minimal HTML error page for failures that must not redirect.
fn error_page(kind: ErrorKind, description: Option<&str>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Authorization error</title></head>
<body>
<h1>Authorization error</h1>
<p><strong>{}</strong></p>
<p>{}</p>
</body>
</html>
"#,
        kind.as_str(),
        html_escape(description.unwrap_or("The request could not be processed."))
    )
}

/// Escape text for embedding in the error page.
fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Authorization request parsing and validation
//!
//! The wire parameters arrive as an [`AuthorizeParams`] (query on GET,
//! form on POST, merged with form values winning) and are promoted to a
//! validated [`AuthRequest`] by [`AuthRequest::parse`]. Validation is
//! ordered: failures before the redirect URI is verified render directly
//! and never redirect, failures after it redirect back to the client with
//! the error placed per the resolved response mode.

use rocket::FromForm;
use serde::{Deserialize, Serialize};

use super::error::{AuthError, ErrorKind, ErrorRedirect};
use crate::config::Config;

/// Raw wire parameters of an authorization request.
///
/// Every field is optional at this stage; the same structure doubles as
/// the hidden-field payload that preserves the request across the login
/// form round trip. `username`/`password` only appear on the credential
/// POST.
#[derive(Debug, Clone, Default, FromForm, Serialize, Deserialize)]
pub struct AuthorizeParams {
    pub response_type: Option<String>,
    pub response_mode: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub prompt: Option<String>,
    pub display: Option<String>,
    pub max_age: Option<String>,
    pub ui_locales: Option<String>,
    pub id_token_hint: Option<String>,
    pub login_hint: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AuthorizeParams {
    /// Merge form parameters over query parameters; the form wins.
    pub fn merged_over(self, query: AuthorizeParams) -> AuthorizeParams {
        AuthorizeParams {
            response_type: self.response_type.or(query.response_type),
            response_mode: self.response_mode.or(query.response_mode),
            client_id: self.client_id.or(query.client_id),
            redirect_uri: self.redirect_uri.or(query.redirect_uri),
            scope: self.scope.or(query.scope),
            state: self.state.or(query.state),
            nonce: self.nonce.or(query.nonce),
            prompt: self.prompt.or(query.prompt),
            display: self.display.or(query.display),
            max_age: self.max_age.or(query.max_age),
            ui_locales: self.ui_locales.or(query.ui_locales),
            id_token_hint: self.id_token_hint.or(query.id_token_hint),
            login_hint: self.login_hint.or(query.login_hint),
            code_challenge: self.code_challenge.or(query.code_challenge),
            code_challenge_method: self.code_challenge_method.or(query.code_challenge_method),
            username: self.username.or(query.username),
            password: self.password.or(query.password),
        }
    }

    /// Name/value pairs preserving the request inside the login form.
    ///
    /// Credentials are never echoed back.
    pub fn hidden_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        let mut push = |name: &'static str, value: &Option<String>| {
            if let Some(value) = value {
                fields.push((name, value.clone()));
            }
        };
        push("response_type", &self.response_type);
        push("response_mode", &self.response_mode);
        push("client_id", &self.client_id);
        push("redirect_uri", &self.redirect_uri);
        push("scope", &self.scope);
        push("state", &self.state);
        push("nonce", &self.nonce);
        push("prompt", &self.prompt);
        push("display", &self.display);
        push("max_age", &self.max_age);
        push("ui_locales", &self.ui_locales);
        push("id_token_hint", &self.id_token_hint);
        push("login_hint", &self.login_hint);
        push("code_challenge", &self.code_challenge);
        push("code_challenge_method", &self.code_challenge_method);
        fields
    }
}

/// Where response parameters are placed on the redirect URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Query,
    Fragment,
}

impl ResponseMode {
    /// Append parameters to a redirect URI in this mode.
    pub fn compose(&self, redirect_uri: &str, params: &[(String, String)]) -> String {
        match url::Url::parse(redirect_uri) {
            Ok(mut url) => {
                match self {
                    ResponseMode::Query => {
                        let mut pairs = url.query_pairs_mut();
                        for (name, value) in params {
                            pairs.append_pair(name, value);
                        }
                        drop(pairs);
                    }
                    ResponseMode::Fragment => {
                        let encoded = serde_urlencoded::to_string(params).unwrap_or_default();
                        url.set_fragment(Some(&encoded));
                    }
                }
                url.to_string()
            }
            Err(_) => {
                // The redirect URI was validated against the registration,
                // so this only happens for glob registrations admitting a
                // non-URL; compose textually.
                let encoded = serde_urlencoded::to_string(params).unwrap_or_default();
                match self {
                    ResponseMode::Query if redirect_uri.contains('?') => {
                        format!("{}&{}", redirect_uri, encoded)
                    }
                    ResponseMode::Query => format!("{}?{}", redirect_uri, encoded),
                    ResponseMode::Fragment => format!("{}#{}", redirect_uri, encoded),
                }
            }
        }
    }
}

/// The requested response artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseTypes {
    pub code: bool,
    pub token: bool,
    pub id_token: bool,
}

impl ResponseTypes {
    pub fn is_empty(&self) -> bool {
        !(self.code || self.token || self.id_token)
    }

    /// Fragment is the default placement as soon as a token can appear in
    /// the response.
    pub fn default_mode(&self) -> ResponseMode {
        if self.token || self.id_token {
            ResponseMode::Fragment
        } else {
            ResponseMode::Query
        }
    }
}

/// The requested prompt behaviors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Prompts {
    pub none: bool,
    pub login: bool,
    pub consent: bool,
    pub select_account: bool,
}

impl Prompts {
    /// True when the request insists on interactive authentication,
    /// disabling SSO reuse.
    pub fn requires_interaction(&self) -> bool {
        self.login || self.consent || self.select_account
    }
}

/// A fully validated authorization request.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub response_type: ResponseTypes,
    pub response_mode: ResponseMode,
    /// Requested scopes in request order, deduplicated, `openid` included.
    pub scopes: Vec<String>,
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub prompt: Prompts,
    pub max_age: Option<i64>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

impl AuthRequest {
    /// Validate raw parameters into an [`AuthRequest`].
    ///
    /// The checks run in a fixed order and stop at the first failure.
    /// Client and redirect URI are verified first; any failure up to and
    /// including the redirect URI check yields a direct error, everything
    /// after redirects back to the client.
    pub fn parse(params: &AuthorizeParams, config: &Config) -> Result<Self, AuthError> {
        // 1. The client must be registered.
        let client_id = params
            .client_id
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AuthError::direct(ErrorKind::InvalidRequest, "client_id is missing"))?;
        let client = config.find_client(client_id).ok_or_else(|| {
            AuthError::direct(ErrorKind::UnauthorizedClient, "client_id is not registered")
        })?;

        // 2. The redirect URI must match a registered pattern. Nothing is
        // ever redirected to an unverified URI.
        let redirect_uri = params
            .redirect_uri
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AuthError::direct(ErrorKind::InvalidRequest, "redirect_uri is missing")
            })?;
        if !client.redirect_uri_matches(redirect_uri) {
            return Err(AuthError::direct(
                ErrorKind::InvalidRequest,
                "redirect_uri does not match any registered pattern",
            ));
        }

        // The redirect URI is now trustworthy; resolve the response mode
        // so later failures can be delivered through it.
        let raw_types: Vec<&str> = params
            .response_type
            .as_deref()
            .unwrap_or("")
            .split_whitespace()
            .collect();
        let mut response_type = ResponseTypes::default();
        let mut unknown_type = None;
        for raw in &raw_types {
            match *raw {
                "code" => response_type.code = true,
                "token" => response_type.token = true,
                "id_token" => response_type.id_token = true,
                other => unknown_type = Some(other.to_string()),
            }
        }

        let response_mode = match params.response_mode.as_deref() {
            None => response_type.default_mode(),
            Some("query") => ResponseMode::Query,
            Some("fragment") => ResponseMode::Fragment,
            Some(other) => {
                return Err(Self::redirect_error(
                    ErrorKind::InvalidRequest,
                    format!("unsupported response_mode {:?}", other),
                    redirect_uri,
                    response_type.default_mode(),
                    params.state.clone(),
                ));
            }
        };
        let error = |kind: ErrorKind, description: String| {
            Self::redirect_error(kind, description, redirect_uri, response_mode, params.state.clone())
        };

        // 3. The response type set must be non-empty and known.
        if let Some(unknown) = unknown_type {
            return Err(error(
                ErrorKind::UnsupportedResponseType,
                format!("unsupported response_type {:?}", unknown),
            ));
        }
        if response_type.is_empty() {
            return Err(error(
                ErrorKind::UnsupportedResponseType,
                "response_type is missing".to_string(),
            ));
        }

        // 4. Scopes: openid is mandatory, everything else must be known.
        let mut scopes: Vec<String> = Vec::new();
        for scope in params.scope.as_deref().unwrap_or("").split_whitespace() {
            if !config.scopes.is_supported(scope) {
                return Err(error(
                    ErrorKind::InvalidScope,
                    format!("unknown scope {:?}", scope),
                ));
            }
            if !scopes.iter().any(|s| s == scope) {
                scopes.push(scope.to_string());
            }
        }
        if !scopes.iter().any(|s| s == "openid") {
            return Err(error(
                ErrorKind::InvalidScope,
                "scope must contain openid".to_string(),
            ));
        }

        // 5. Prompt: known values only, none is exclusive.
        let mut prompt = Prompts::default();
        for raw in params.prompt.as_deref().unwrap_or("").split_whitespace() {
            match raw {
                "none" => prompt.none = true,
                "login" => prompt.login = true,
                "consent" => prompt.consent = true,
                "select_account" => prompt.select_account = true,
                other => {
                    return Err(error(
                        ErrorKind::InvalidRequest,
                        format!("unsupported prompt {:?}", other),
                    ));
                }
            }
        }
        if prompt.none && prompt.requires_interaction() {
            return Err(error(
                ErrorKind::InvalidRequest,
                "prompt=none cannot be combined with other prompts".to_string(),
            ));
        }

        // 6. Display: page is the only supported value.
        if let Some(display) = params.display.as_deref() {
            if display != "page" {
                return Err(error(
                    ErrorKind::InvalidRequest,
                    format!("unsupported display {:?}", display),
                ));
            }
        }

        // 7. PKCE: method requires a challenge, defaults to plain.
        let code_challenge = params.code_challenge.clone().filter(|v| !v.is_empty());
        let code_challenge_method = match (&code_challenge, params.code_challenge_method.as_deref())
        {
            (None, Some(_)) => {
                return Err(error(
                    ErrorKind::InvalidRequest,
                    "code_challenge_method without code_challenge".to_string(),
                ));
            }
            (None, None) => None,
            (Some(_), None) => Some("plain".to_string()),
            (Some(_), Some(method)) if method == "S256" || method == "plain" => {
                Some(method.to_string())
            }
            (Some(_), Some(other)) => {
                return Err(error(
                    ErrorKind::InvalidRequest,
                    format!("unsupported code_challenge_method {:?}", other),
                ));
            }
        };

        // 8. max_age must be a non-negative integer when supplied.
        let max_age = match params.max_age.as_deref() {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(value) if value >= 0 => Some(value),
                _ => {
                    return Err(error(
                        ErrorKind::InvalidRequest,
                        format!("invalid max_age {:?}", raw),
                    ));
                }
            },
        };

        Ok(AuthRequest {
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            response_type,
            response_mode,
            scopes,
            state: params.state.clone(),
            nonce: params.nonce.clone().filter(|v| !v.is_empty()),
            prompt,
            max_age,
            code_challenge,
            code_challenge_method,
        })
    }

    fn redirect_error(
        kind: ErrorKind,
        description: String,
        redirect_uri: &str,
        mode: ResponseMode,
        state: Option<String>,
    ) -> AuthError {
        AuthError::redirect(
            kind,
            description,
            ErrorRedirect {
                redirect_uri: redirect_uri.to_string(),
                mode,
                state,
            },
        )
    }

    /// A redirecting error bound to this request's verified redirect URI.
    pub fn error(&self, kind: ErrorKind, description: impl Into<String>) -> AuthError {
        Self::redirect_error(
            kind,
            description.into(),
            &self.redirect_uri,
            self.response_mode,
            self.state.clone(),
        )
    }

    /// The granted scopes as the space-delimited wire form.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

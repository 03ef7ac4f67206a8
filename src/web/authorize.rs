// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Authorization endpoint handlers
//!
//! GET carries the request in the query; POST carries it in the form body
//! (merged over any query parameters, with the form winning) together with
//! the submitted credentials. Both enter the same state machine; the
//! handlers only translate its outcome to HTTP: a 302 with the SSO cookie
//! refreshed, or the rendered login page.

use handlebars::Handlebars;
use log::debug;
use rocket::form::Form;
use rocket::http::Cookie;
use rocket::http::CookieJar;
use rocket::response::content::RawHtml;
use rocket::response::Redirect;
use rocket::{get, post, Responder, State};
use serde_json::json;

use super::server::ServerState;
use crate::oidc::{AuthError, AuthorizeOutcome, AuthorizeParams, Authorizer, SSO_COOKIE};

/// Responses of the authorization endpoint.
#[derive(Responder)]
pub enum AuthorizeResponse {
    Redirect(Redirect),

    /// The login page on first contact.
    #[response(status = 200, content_type = "html")]
    LoginPage(RawHtml<String>),

    /// The login page re-rendered after a failed credential attempt.
    #[response(status = 401, content_type = "html")]
    LoginRetry(RawHtml<String>),
}

#[get("/?<params..>")]
pub async fn authorize_get(
    params: AuthorizeParams,
    state: &State<ServerState>,
    cookies: &CookieJar<'_>,
) -> Result<AuthorizeResponse, AuthError> {
    handle(params, state, cookies).await
}

#[post("/?<query..>", data = "<form>")]
pub async fn authorize_post(
    query: AuthorizeParams,
    form: Form<AuthorizeParams>,
    state: &State<ServerState>,
    cookies: &CookieJar<'_>,
) -> Result<AuthorizeResponse, AuthError> {
    let params = form.into_inner().merged_over(query);
    handle(params, state, cookies).await
}

async fn handle(
    params: AuthorizeParams,
    state: &State<ServerState>,
    cookies: &CookieJar<'_>,
) -> Result<AuthorizeResponse, AuthError> {
    let authorizer = Authorizer::new(
        &state.config,
        &state.tokens,
        &state.mapper,
        state.directory.as_ref(),
    );
    let sso_cookie = cookies.get(SSO_COOKIE).map(|c| c.value().to_string());

    match authorizer.authorize(params, sso_cookie.as_deref()).await? {
        AuthorizeOutcome::Redirect {
            location,
            sso_token,
        } => {
            debug!("Authorization granted, redirecting to client");
            let mut cookie = Cookie::new(SSO_COOKIE, sso_token);
            cookie.set_http_only(true);
            cookie.set_path(state.config.oidc.issuer_path());
            cookie.set_max_age(rocket::time::Duration::seconds(
                state.tokens.sso_ttl_seconds() as i64,
            ));
            cookies.add(cookie);
            Ok(AuthorizeResponse::Redirect(Redirect::found(location)))
        }
        AuthorizeOutcome::Login { params, error } => {
            let page = login_page_html(&state.config.oidc.endpoints.authorize, &params, error.as_deref());
            if error.is_some() {
                Ok(AuthorizeResponse::LoginRetry(RawHtml(page)))
            } else {
                Ok(AuthorizeResponse::LoginPage(RawHtml(page)))
            }
        }
    }
}

/// Render the login form with the in-flight request preserved as hidden
/// fields.
fn login_page_html(action: &str, params: &AuthorizeParams, error_msg: Option<&str>) -> String {
    let mut handlebars = Handlebars::new();

    // Register the template
    handlebars
        .register_template_string("login", include_str!("../../resources/forms/login.hbs"))
        .expect("Failed to register login template");

    let fields: Vec<_> = params
        .hidden_fields()
        .into_iter()
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();

    let data = json!({
        "action": action,
        "client_id": params.client_id,
        "error_msg": error_msg,
        "login_hint": params.login_hint,
        "fields": fields,
    });

    handlebars
        .render("login", &data)
        .expect("Failed to render login template")
}

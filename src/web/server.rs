// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rocket server assembly
//!
//! Builds the Rocket instance from a validated [`Config`] and a
//! [`Directory`] implementation: loads the key material, constructs the
//! token manager and claim mapper, and mounts every endpoint at its
//! configured path. All protocol state lives in [`ServerState`] and is
//! read-only once the server is up.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rust_ldap_oidc::config::Config;
//! use rust_ldap_oidc::directory::LdapDirectory;
//! use rust_ldap_oidc::web::server;
//!
//! async fn start() {
//!     let config = Config::from_file("config.yaml").unwrap();
//!     let directory = Arc::new(LdapDirectory::new(config.ldap.clone()));
//!     let figment = rocket::Config::figment()
//!         .merge(("address", config.server.address.clone()))
//!         .merge(("port", config.server.port));
//!     let rocket = server::build_rocket(figment, config, directory).unwrap();
//!     rocket.launch().await.expect("Failed to launch server");
//! }
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use rocket::figment::Figment;
use rocket::{routes, Build, Rocket};

use super::authorize::{authorize_get, authorize_post};
use super::discovery::{jwks, openid_configuration};
use super::token::token;
use super::userinfo::{userinfo_get, userinfo_post};
use crate::config::Config;
use crate::directory::Directory;
use crate::oidc::ClaimMapper;
use crate::token::{KeyPair, TokenManager};

/// Shared state for every endpoint handler.
///
/// Everything in here is immutable after startup; handlers share it
/// through `Arc`s managed by Rocket.
pub struct ServerState {
    pub config: Arc<Config>,
    pub tokens: Arc<TokenManager>,
    pub mapper: Arc<ClaimMapper>,
    pub directory: Arc<dyn Directory>,
}

impl Clone for ServerState {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            tokens: Arc::clone(&self.tokens),
            mapper: Arc::clone(&self.mapper),
            directory: Arc::clone(&self.directory),
        }
    }
}

/// Assemble the Rocket instance.
///
/// Key material is loaded (or generated) here, so a broken key file fails
/// startup instead of the first request.
pub fn build_rocket(
    figment: Figment,
    config: Config,
    directory: Arc<dyn Directory>,
) -> Result<Rocket<Build>> {
    let key = KeyPair::load_or_generate(config.oidc.key_file.as_deref())
        .context("Failed to prepare signing key material")?;
    info!("Signing key ready, kid={}", key.kid());

    let tokens = TokenManager::new(config.oidc.issuer.clone(), key, config.ttl.clone());
    let mapper = ClaimMapper::new(config.scopes.clone());
    let endpoints = config.oidc.endpoints.clone();

    let state = ServerState {
        config: Arc::new(config),
        tokens: Arc::new(tokens),
        mapper: Arc::new(mapper),
        directory,
    };

    let rocket = rocket::custom(figment)
        .manage(state)
        .mount(endpoints.authorize.as_str(), routes![authorize_get, authorize_post])
        .mount(endpoints.token.as_str(), routes![token])
        .mount(endpoints.userinfo.as_str(), routes![userinfo_get, userinfo_post])
        .mount(endpoints.jwks.as_str(), routes![jwks])
        .mount("/.well-known", routes![openid_configuration]);

    Ok(rocket)
}

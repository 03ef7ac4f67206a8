// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust_ldap_oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the LDAP-backed OpenID Connect identity provider
mod config;
mod directory;
mod oidc;
mod token;
mod web;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use config::Config;
use directory::LdapDirectory;

/// OpenID Connect identity provider backed by an LDAP directory
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// HTTP server port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// HTTP server address
    #[arg(short = 'a', long)]
    address: Option<String>,

    /// Issuer URL asserted in every token
    #[arg(long)]
    issuer: Option<String>,

    /// Path to the RSA private key PEM file
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,
}

#[rocket::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Check if --show-config-schema flag is set
    if args.show_config_schema {
        return config::output_config_schema();
    }

    // Load configuration
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    // Apply command line overrides
    config.apply_args(
        args.port,
        args.address.clone(),
        args.issuer.clone(),
        args.key_file.clone(),
    );

    info!(
        "Starting identity provider for issuer {} on {}:{}",
        config.oidc.issuer, config.server.address, config.server.port
    );

    let directory = Arc::new(LdapDirectory::new(config.ldap.clone()));

    let figment = rocket::Config::figment()
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port));

    let rocket = web::build_rocket(figment, config, directory)?;
    rocket
        .launch()
        .await
        .context("HTTP server failed to launch")?;

    info!("Server shut down cleanly");
    Ok(())
}

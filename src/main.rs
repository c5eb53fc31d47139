//! # WhatsApp Onboarding Service
//!
//! Main entry point for the WhatsApp Business embedded signup backend.
//! Configures SSL, middleware, shared services and route handling.

#![recursion_limit = "256"]

pub mod api;
pub mod config;
pub mod consts;
pub mod front;
pub mod metric;
pub mod models;
pub mod repo;
pub mod services;
pub mod webhook;

use envconfig::Envconfig;
use logfire::config::{MetricsOptions, SendToLogfire};
use ntex::web;
use ntex_cors::Cors;
use openssl::ssl::{SslAcceptor, SslFiletype, SslMethod};
use std::sync::Arc;

#[ntex::main]
async fn main() -> anyhow::Result<()> {
    // Initialize configuration
    let app_config = config::AppConfig::init_from_env()?;
    app_config.validate()?;

    // Initialize logging and metrics
    let mut logfire_builder = logfire::configure()
        .install_panic_handler()
        .with_metrics(Some(MetricsOptions::default()))
        .send_to_logfire(SendToLogfire::IfTokenPresent);
    if let Some(token) = &app_config.logfire_token {
        logfire_builder = logfire_builder.with_token(token);
    }
    let shutdown_handler = logfire_builder.finish()?;

    let app_state = create_app_state(app_config)?;

    configure_and_run_server(app_state).await?;

    shutdown_handler.shutdown()?;

    Ok(())
}

/// Configures SSL acceptor for production environments
fn setup_ssl_acceptor(
    app_config: &config::AppConfig,
) -> anyhow::Result<openssl::ssl::SslAcceptorBuilder> {
    let mut ssl_acceptor = SslAcceptor::mozilla_intermediate(SslMethod::tls_server())
        .map_err(|e| anyhow::anyhow!("Failed to create SSL acceptor: {}", e))?;

    ssl_acceptor
        .set_private_key_file(&app_config.private_key_path, SslFiletype::PEM)
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to load private key from {}: {}",
                app_config.private_key_path,
                e
            )
        })?;

    ssl_acceptor
        .set_certificate_file(&app_config.certificate_path, SslFiletype::PEM)
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to load certificate from {}: {}",
                app_config.certificate_path,
                e
            )
        })?;

    Ok(ssl_acceptor)
}

/// Wires the Graph client, the account registry and the webhook handler
fn create_app_state(app_config: config::AppConfig) -> anyhow::Result<front::AppState> {
    let graph = services::graph::GraphClient::from_config(&app_config)?;

    Ok(front::AppState {
        config: Arc::new(app_config),
        repo: Arc::new(repo::memory::InMemoryAccountRepo::new()),
        graph: Arc::new(graph),
        webhook_handler: Arc::new(webhook::handler::LoggingEventHandler),
    })
}

/// Configures and starts the web server with appropriate SSL settings
async fn configure_and_run_server(app_state: front::AppState) -> anyhow::Result<()> {
    let app_config = app_state.config.clone();
    let server_addr = (app_config.server_host.clone(), app_config.server_port);
    let allowed_origins = app_config.allowed_origins();

    logfire::info!(
        "Starting server on {host}:{port}",
        host = app_config.server_host.clone(),
        port = app_config.server_port as i64
    );

    let server = web::server(move || {
        let cors = allowed_origins.iter().fold(
            Cors::new()
                .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                .allowed_header("content-type"),
            |cors, origin| cors.allowed_origin(origin),
        );

        web::App::new()
            .wrap(cors.finish())
            .wrap(web::middleware::Logger::default())
            .state(app_state.clone())
            .configure(front::routes::health)
            .configure(front::routes::whatsapp)
            .configure(front::routes::business)
            .default_service(web::route().to(front::server::serve_not_found))
    });

    let bound_server = if app_config.is_prod() {
        let ssl_acceptor = setup_ssl_acceptor(&app_config)?;
        server.bind_openssl(server_addr, ssl_acceptor)?
    } else {
        server.bind(server_addr)?
    };

    bound_server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}

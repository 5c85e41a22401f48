//! Backend entry-point: loads settings, wires the stores and serves the API.

mod server;

use std::io;
use std::path::Path;
use std::sync::Arc;

use actix_web::cookie::Key;
use actix_web::web;
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use training_backend::inbound::http::health::HealthState;
use training_backend::settings::ServerSettings;

use server::{ServerConfig, build_http_state, create_server};

fn load_session_key(path: &Path, allow_ephemeral: bool) -> io::Result<Key> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Key::derive_from(&bytes)),
        Err(e) if cfg!(debug_assertions) || allow_ephemeral => {
            warn!(path = %path.display(), error = %e, "using temporary session key (dev only)");
            Ok(Key::generate())
        }
        Err(e) => Err(io::Error::other(format!(
            "failed to read session key at {}: {e}",
            path.display()
        ))),
    }
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load_from_iter(std::env::args_os())
        .map_err(|e| io::Error::other(format!("failed to load settings: {e}")))?;
    let bind_addr = settings
        .bind_addr()
        .map_err(|e| io::Error::other(e.to_string()))?;
    let key = load_session_key(&settings.session_key_file(), settings.allow_ephemeral_key())?;

    let http_state = build_http_state(&settings, Arc::new(DefaultClock)).await?;
    let config = ServerConfig::new(key, bind_addr, http_state)
        .with_cookie_secure(settings.cookie_secure());

    let health_state = web::Data::new(HealthState::new());
    info!(addr = %config.bind_addr(), "starting server");
    create_server(health_state, config)?.await
}

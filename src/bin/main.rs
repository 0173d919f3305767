use std::sync::Arc;

use log::info;
use spendguard::config::{load_config, ServerSettings};
use spendguard::modules::http_authorize::{router, AuthorizeState};
use spendguard::permission::{
    RpcBalanceProber, SignatureVerifier, SpendPermissionValidator, SystemClock, ValidationCache,
};
use tokio::net::TcpListener;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    // Load configuration
    let settings = load_config()?;
    log_settings(&settings);

    // Build the validator once and share it with every request
    let prober = RpcBalanceProber::connect_http(&settings.chain_rpc_url)?;
    let cache = ValidationCache::new(
        settings.cache_max_entries,
        settings.freshness_window_seconds,
    );
    let validator = SpendPermissionValidator::new(
        SignatureVerifier::new(&settings.signing_domain),
        Arc::new(prober),
        Arc::new(cache),
        Arc::new(SystemClock),
        settings.validation_policy(),
    );
    let state = Arc::new(AuthorizeState {
        validator: Arc::new(validator),
    });

    // Bind the server
    let listener = TcpListener::bind(format!("0.0.0.0:{}", settings.port)).await?;
    info!("Listening on: 0.0.0.0:{}", settings.port);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn log_settings(settings: &ServerSettings) {
    info!(
        "Signing domain: {} v{} chain {} contract {}",
        settings.signing_domain.name,
        settings.signing_domain.version,
        settings.signing_domain.chain_id,
        settings.signing_domain.verifying_contract
    );
    info!(
        "Cache: {} entries, {}s window ({}s for denials); RPC timeout {:?}",
        settings.cache_max_entries,
        settings.freshness_window_seconds,
        settings.negative_freshness_window_seconds,
        settings.chain_rpc_timeout
    );
}

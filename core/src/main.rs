// Copyright 2026 Obscura Labs
// Licensed under the Apache License, Version 2.0

//! Obscura Ledger
//!
//! Main entry point for the confidential batch ledger.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Obscura Ledger                               │
//! │                                                                  │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────────┐  │
//! │  │  HTTP API   │  │ LedgerService│  │  Dev Oracle            │  │
//! │  │  (axum)     │  │  (actor)     │  │  (callback task)       │  │
//! │  └──────┬──────┘  └──────┬───────┘  └───────────┬────────────┘  │
//! │         │                │                      │               │
//! │         ▼                ▼                      ▼               │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                    LedgerState                           │   │
//! │  │  • Provider submissions into batches                     │   │
//! │  │  • Threshold analysis via decryption oracle              │   │
//! │  │  • Replay / integrity / cooldown enforcement             │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::info;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::mpsc;

use obscura_account::Address;
use obscura_compute::dev_pair;
use obscura_config::ObscuraConfig;
use obscura_core::api::handlers::ApiState;
use obscura_core::api::routes::create_router;
use obscura_core::ledger::{LedgerConfig, LedgerService, LedgerState};

/// Oracle callback mailbox depth
const CALLBACK_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    // Load configuration
    let config = ObscuraConfig::global();
    let service_cfg = &*obscura_config::SERVICE;
    let oracle_cfg = &*obscura_config::ORACLE;

    // Identities fall back to derived dev defaults when unconfigured
    let owner = service_cfg
        .owner
        .unwrap_or_else(|| Address::derive(b"obscura-dev-owner"));
    let instance = service_cfg
        .instance
        .unwrap_or_else(|| Address::derive(b"obscura-dev-instance"));

    // Wire the in-process engine/oracle pair; callbacks land in the
    // service mailbox after the configured delay
    let (callback_tx, callback_rx) = mpsc::channel(CALLBACK_CHANNEL_CAPACITY);
    let (engine, oracle) = dev_pair(callback_tx, Duration::from_millis(oracle_cfg.delay_ms));
    let trusted_oracle = oracle_cfg.address.unwrap_or_else(|| oracle.address());

    info!("============================================");
    info!(
        "          OBSCURA LEDGER v{}              ",
        env!("CARGO_PKG_VERSION")
    );
    info!("============================================");
    info!("API port          : {}", config.api.port);
    info!("Owner             : {}", owner);
    info!("Instance          : {}", instance);
    info!("Trusted oracle    : {}", trusted_oracle);
    info!("Cooldown          : {}s", service_cfg.cooldown_secs);
    info!("Request TTL       : {}s", service_cfg.request_ttl_secs);
    info!("Sweep interval    : {}s", service_cfg.sweep_interval_secs);
    info!("Oracle delay      : {}ms", oracle_cfg.delay_ms);
    info!("Dev mode          : {}", config.features.dev_mode);
    info!("============================================");

    // Start the ledger service
    let state = LedgerState::new(
        LedgerConfig {
            owner,
            instance,
            trusted_oracle,
            cooldown_secs: service_cfg.cooldown_secs,
            request_ttl_secs: service_cfg.request_ttl_secs,
        },
        Arc::new(engine.clone()),
        oracle,
    );
    let service = Arc::new(LedgerService::start(
        state,
        callback_rx,
        Duration::from_secs(service_cfg.sweep_interval_secs),
    ));
    info!("Ledger service started, batch 1 open");

    // Create API state
    let api_state = ApiState {
        service: service.clone(),
        dev_engine: Some(Arc::new(engine)),
        dev_mode: config.features.dev_mode,
        start_time: std::time::Instant::now(),
    };

    // Create and start HTTP server
    let router = create_router(api_state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP API listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            log::error!("HTTP server stopped: {}", e);
        }
    });

    info!("============================================");
    info!("  Obscura ledger is ready!");
    info!("  API: http://0.0.0.0:{}", config.api.port);
    info!("============================================");

    // Wait for shutdown signal
    signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Graceful shutdown
    if let Err(e) = service.shutdown().await {
        log::error!("Error shutting down ledger service: {}", e);
    }

    info!("Obscura ledger stopped");
    Ok(())
}

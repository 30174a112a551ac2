//! Full lifecycle demo: register a provider, submit sealed values into
//! batch 1, request a threshold analysis, and watch the dev oracle's
//! callback finalize the result.
//!
//! Run with: cargo run -p obscura-core --example full_lifecycle

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

use obscura_account::Address;
use obscura_compute::dev_pair;
use obscura_core::ledger::{LedgerConfig, LedgerService, LedgerState, RequestStatus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    // 1. Identities
    let owner = Address::derive(b"demo-owner");
    let provider = Address::derive(b"demo-provider");
    let analyst = Address::derive(b"demo-analyst");
    println!("👤 Owner    : {owner}");
    println!("👤 Provider : {provider}");
    println!("👤 Analyst  : {analyst}");

    // 2. Wire the ledger with the in-process engine/oracle pair
    let (callback_tx, callback_rx) = mpsc::channel(64);
    let (engine, oracle) = dev_pair(callback_tx, Duration::from_millis(200));
    let trusted_oracle = oracle.address();

    let state = LedgerState::new(
        LedgerConfig {
            owner,
            instance: Address::derive(b"demo-instance"),
            trusted_oracle,
            cooldown_secs: 0,
            request_ttl_secs: 3600,
        },
        Arc::new(engine.clone()),
        oracle,
    );
    let service = LedgerService::start(state, callback_rx, Duration::from_secs(30));

    // 3. Register the provider and submit three sealed readings
    service.add_provider(owner, provider).await??;
    for value in [120u64, 145, 98] {
        let handle = engine.seal_value(value)?;
        let receipt = service.submit(provider, handle).await??;
        println!(
            "📦 Sealed {value} stored at batch {} index {}",
            receipt.batch_id, receipt.index
        );
    }

    // 4. Ask whether record (1, 1) is at least 130
    let threshold = engine.seal_value(130)?;
    let request_id = service.request_analysis(analyst, 1, 1, threshold).await??;
    println!("🔮 Decryption request {request_id} dispatched to the oracle");

    // 5. Wait for the callback to land
    loop {
        sleep(Duration::from_millis(50)).await;
        if let Some(ctx) = service.request_context(request_id).await? {
            if ctx.status == RequestStatus::Processed {
                break;
            }
        }
    }
    println!("✅ Request {request_id} processed");

    // 6. The audit log tells the whole story
    println!("\n📜 Event log:");
    for event in service.events().await? {
        println!("   {}", serde_json::to_string(&event)?);
    }

    service.shutdown().await?;
    Ok(())
}

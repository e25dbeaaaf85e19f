//! Demo purchase flow against the in-memory gateways.
//!
//! Wires a [`PurchaseDispatcher`] over the two memory gateways, runs one
//! backend purchase from URI to receipt, and logs every status update on
//! the way.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p iap-memory --bin iap-demo
//! ```

use std::sync::Arc;

use futures_util::StreamExt;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use iap::dispatcher::PurchaseDispatcher;
use iap::gateway::{BackendGateway, OnChainGateway, PaymentSource};
use iap::payment::TransactionStatus;
use iap_memory::{MemoryBackendGateway, MemoryOnChainGateway};

const DEMO_URI: &str = "appc://buy?domain=com.example.game&product=gems_100&amount=1.50";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("Demo purchase failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let on_chain = Arc::new(
        MemoryOnChainGateway::new(
            "0x00a329c0648769a73afac7f9381e08fb43dbea72",
            Decimal::from(100),
        )
        .with_rate("EUR", Decimal::new(11, 1)),
    );
    let backend = Arc::new(MemoryBackendGateway::new());
    let dispatcher = PurchaseDispatcher::new(
        Arc::clone(&on_chain) as Arc<dyn OnChainGateway>,
        Arc::clone(&backend) as Arc<dyn BackendGateway>,
    );
    dispatcher.start().await;

    let request = dispatcher
        .parse_transaction(DEMO_URI, PaymentSource::Backend)
        .await?;
    tracing::info!(
        package = %request.package_name,
        product = %request.product_name,
        amount = %request.amount,
        "Parsed payment request"
    );

    let fiat = dispatcher.convert_to_fiat(request.amount, "EUR").await?;
    tracing::info!(amount = %fiat.amount, currency = %fiat.currency, "Price in fiat");

    let suggestions = dispatcher.top_up_channel_suggestions(request.amount);
    tracing::info!(?suggestions, "Channel top-up suggestions");

    let mut states = dispatcher.transaction_state(DEMO_URI);
    dispatcher.send(&request, PaymentSource::Backend).await?;

    while let Some(update) = states.next().await {
        let payment = update?;
        tracing::info!(status = ?payment.status, "Payment update");
        if payment.status == TransactionStatus::Completed {
            let receipt = dispatcher
                .completed_purchase(&payment, PaymentSource::Backend)
                .await?;
            tracing::info!(
                uid = receipt.purchase_uid.as_deref().unwrap_or("-"),
                "Purchase complete"
            );
            break;
        }
    }

    Ok(())
}

//! In-memory reference gateways for the purchase dispatcher.
//!
//! These gateways implement the `iap` capability traits over a process-local
//! ledger, so the full purchase flow — parse, send, track, complete,
//! receipt — can run without a blockchain node or a billing service behind
//! it. They back integration tests and the `iap-demo` binary; they are not
//! a payment implementation.
//!
//! # Behavior
//!
//! - Payment URIs use the `appc://buy` form, e.g.
//!   `appc://buy?domain=com.example.game&product=gems_100&amount=1.50`.
//! - `send` accepts a payment and drives it through its waiting statuses to
//!   `COMPLETED` on a background task, emitting a snapshot per step.
//! - The backend gateway records a signed [`Purchase`] when a payment
//!   completes, so the dispatcher's receipt flow works end to end.
//! - Balances and exchange rates are fixtures set at construction; removal
//!   of an untracked URI is a no-op and removals do not produce update
//!   emissions.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use futures_util::stream;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, broadcast};
use url::Url;

use iap::dispatcher::GAS_PRICE_MULTIPLIER;
use iap::error::GatewayError;
use iap::gateway::{
    BackendGateway, OnChainGateway, PaymentListStream, PaymentStream, PurchaseGateway,
};
use iap::payment::{
    FiatValue, GatewayName, Payment, PaymentRequest, Purchase, PurchaseSignature, SignatureData,
    Transaction, TransactionKind, TransactionStatus,
};

/// Delay between simulated status transitions.
const STEP_DELAY: Duration = Duration::from_millis(25);

/// Capacity of the per-ledger update feed.
const UPDATE_CAPACITY: usize = 64;

/// Process-local payment store with a broadcast feed of status updates.
struct PaymentLedger {
    payments: Mutex<HashMap<String, Payment>>,
    updates: broadcast::Sender<Payment>,
}

impl PaymentLedger {
    fn new() -> Arc<Self> {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Arc::new(Self {
            payments: Mutex::new(HashMap::new()),
            updates,
        })
    }

    async fn upsert(&self, payment: Payment) {
        self.payments
            .lock()
            .await
            .insert(payment.uri.clone(), payment.clone());
        // Nobody listening is fine; updates are best-effort.
        let _ = self.updates.send(payment);
    }

    async fn get(&self, uri: &str) -> Option<Payment> {
        self.payments.lock().await.get(uri).cloned()
    }

    async fn remove(&self, uri: &str) -> Option<Payment> {
        self.payments.lock().await.remove(uri)
    }

    async fn find_by_product(&self, package_name: &str, product_name: &str) -> Option<Payment> {
        self.payments
            .lock()
            .await
            .values()
            .find(|p| p.package_name == package_name && p.product_id == product_name)
            .cloned()
    }

    async fn snapshot(&self) -> Vec<Payment> {
        self.payments.lock().await.values().cloned().collect()
    }

    /// Stream of snapshots for one URI: the current state first (when one
    /// exists), then every subsequent update.
    fn watch(self: &Arc<Self>, uri: &str) -> PaymentStream {
        let seed = (
            Arc::clone(self),
            uri.to_owned(),
            None::<broadcast::Receiver<Payment>>,
        );
        Box::pin(stream::unfold(seed, |(ledger, uri, rx)| async move {
            let mut rx = match rx {
                Some(rx) => rx,
                None => {
                    // Subscribe before reading so no update can fall
                    // between the snapshot and the feed.
                    let rx = ledger.updates.subscribe();
                    if let Some(current) = ledger.get(&uri).await {
                        return Some((Ok(current), (ledger, uri, Some(rx))));
                    }
                    rx
                }
            };
            loop {
                match rx.recv().await {
                    Ok(payment) if payment.uri == uri => {
                        return Some((Ok(payment), (ledger, uri, Some(rx))));
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        }))
    }

    /// Stream of full-list snapshots: one at subscription, then one per
    /// update.
    fn watch_all(self: &Arc<Self>) -> PaymentListStream {
        let seed = (Arc::clone(self), None::<broadcast::Receiver<Payment>>);
        Box::pin(stream::unfold(seed, |(ledger, rx)| async move {
            let mut rx = match rx {
                Some(rx) => rx,
                None => {
                    let rx = ledger.updates.subscribe();
                    let snapshot = ledger.snapshot().await;
                    return Some((Ok(snapshot), (ledger, Some(rx))));
                }
            };
            loop {
                match rx.recv().await {
                    Ok(_) => {
                        let snapshot = ledger.snapshot().await;
                        return Some((Ok(snapshot), (ledger, Some(rx))));
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        }))
    }
}

fn ensure_started(started: &AtomicBool) -> Result<(), GatewayError> {
    if started.load(Ordering::Relaxed) {
        Ok(())
    } else {
        Err(GatewayError::Unavailable("gateway not started".into()))
    }
}

/// Parses the `appc://buy` payment URI form both memory gateways accept.
fn parse_payment_uri(uri: &str) -> Result<PaymentRequest, GatewayError> {
    let malformed = |reason: String| GatewayError::MalformedUri {
        uri: uri.to_owned(),
        reason,
    };

    let parsed = Url::parse(uri).map_err(|e| malformed(e.to_string()))?;
    if parsed.scheme() != "appc" || parsed.host_str() != Some("buy") {
        return Err(malformed("expected an appc://buy uri".to_owned()));
    }

    let mut domain = None;
    let mut product = None;
    let mut amount = None;
    let mut kind = TransactionKind::Normal;
    let mut payload = None;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "domain" => domain = Some(value.into_owned()),
            "product" => product = Some(value.into_owned()),
            "amount" => {
                amount = Some(
                    value
                        .parse::<Decimal>()
                        .map_err(|e| malformed(format!("bad amount: {e}")))?,
                );
            }
            "kind" => {
                kind = match value.as_ref() {
                    "normal" => TransactionKind::Normal,
                    "channel" => TransactionKind::Channel,
                    other => return Err(malformed(format!("unrecognized kind '{other}'"))),
                };
            }
            "payload" => payload = Some(value.into_owned()),
            _ => {}
        }
    }

    let package_name = domain.ok_or_else(|| malformed("missing 'domain'".to_owned()))?;
    let product_name = product.ok_or_else(|| malformed("missing 'product'".to_owned()))?;
    let amount = amount.ok_or_else(|| malformed("missing 'amount'".to_owned()))?;

    let mut request = PaymentRequest::new(uri, kind, package_name, product_name, amount);
    request.developer_payload = payload;
    Ok(request)
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// In-memory stand-in for the on-chain billing flow.
///
/// Holds a fixed wallet balance and exchange-rate table; payments it
/// accepts complete with a synthetic buy hash.
pub struct MemoryOnChainGateway {
    ledger: Arc<PaymentLedger>,
    wallet_address: String,
    balance: Mutex<Decimal>,
    rates: HashMap<String, Decimal>,
    started: AtomicBool,
    sequence: AtomicU64,
}

impl std::fmt::Debug for MemoryOnChainGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryOnChainGateway")
            .field("wallet_address", &self.wallet_address)
            .finish_non_exhaustive()
    }
}

impl MemoryOnChainGateway {
    /// Creates a gateway for a wallet with the given APPC balance.
    #[must_use]
    pub fn new(wallet_address: impl Into<String>, balance: Decimal) -> Self {
        Self {
            ledger: PaymentLedger::new(),
            wallet_address: wallet_address.into(),
            balance: Mutex::new(balance),
            rates: HashMap::new(),
            started: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
        }
    }

    /// Registers an APPC exchange rate for a fiat currency.
    #[must_use]
    pub fn with_rate(mut self, currency: impl Into<String>, rate: Decimal) -> Self {
        self.rates.insert(currency.into(), rate);
        self
    }

    async fn covers(&self, request: &PaymentRequest) -> bool {
        *self.balance.lock().await >= request.amount * GAS_PRICE_MULTIPLIER
    }
}

#[async_trait]
impl PurchaseGateway for MemoryOnChainGateway {
    async fn parse_transaction(&self, uri: &str) -> Result<PaymentRequest, GatewayError> {
        parse_payment_uri(uri)
    }

    async fn send(&self, request: &PaymentRequest) -> Result<(), GatewayError> {
        ensure_started(&self.started)?;
        if !self.covers(request).await {
            return Err(GatewayError::Rejected(format!(
                "insufficient funds for {}",
                request.amount
            )));
        }

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let buy_hash = format!("0x{seq:064x}");
        let payment = Payment::new(
            request.uri.as_str(),
            request.package_name.as_str(),
            request.product_name.as_str(),
            TransactionStatus::Pending,
        );
        self.ledger.upsert(payment.clone()).await;
        tracing::debug!(uri = %payment.uri, "on-chain payment accepted");

        let ledger = Arc::clone(&self.ledger);
        tokio::spawn(async move {
            let mut payment = payment;
            for status in [TransactionStatus::Processing, TransactionStatus::Completed] {
                tokio::time::sleep(STEP_DELAY).await;
                if ledger.get(&payment.uri).await.is_none() {
                    return;
                }
                payment.status = status;
                if status == TransactionStatus::Completed {
                    payment.buy_hash = Some(buy_hash.clone());
                }
                ledger.upsert(payment.clone()).await;
            }
        });
        Ok(())
    }

    fn transaction_state(&self, uri: &str) -> PaymentStream {
        self.ledger.watch(uri)
    }

    async fn remove(&self, uri: &str) -> Result<(), GatewayError> {
        let _ = self.ledger.remove(uri).await;
        Ok(())
    }

    async fn start(&self) {
        self.started.store(true, Ordering::Relaxed);
        tracing::info!(gateway = "memory-on-chain", "gateway started");
    }

    fn all(&self) -> PaymentListStream {
        self.ledger.watch_all()
    }
}

#[async_trait]
impl OnChainGateway for MemoryOnChainGateway {
    async fn wallet_address(&self) -> Result<String, GatewayError> {
        Ok(self.wallet_address.clone())
    }

    async fn transaction(
        &self,
        package_name: &str,
        product_name: &str,
    ) -> Result<Transaction, GatewayError> {
        let payment = self
            .ledger
            .find_by_product(package_name, product_name)
            .await
            .ok_or_else(|| GatewayError::TransactionNotFound {
                package_name: package_name.to_owned(),
                product_name: product_name.to_owned(),
            })?;
        Ok(Transaction::new(
            payment.uri.as_str(),
            payment.status,
            GatewayName::Appcoins,
        ))
    }

    async fn is_funds_ready(&self, request: &PaymentRequest) -> Result<bool, GatewayError> {
        Ok(self.covers(request).await)
    }

    async fn convert_to_fiat(
        &self,
        appc_value: Decimal,
        currency: &str,
    ) -> Result<FiatValue, GatewayError> {
        let rate = self.rates.get(currency).ok_or_else(|| {
            GatewayError::Unavailable(format!("no exchange rate for '{currency}'"))
        })?;
        Ok(FiatValue::new(appc_value * *rate, currency))
    }
}

/// In-memory stand-in for the backend billing flow.
///
/// Completed payments produce a signed [`Purchase`] record, so the
/// dispatcher's receipt flow can be exercised end to end.
pub struct MemoryBackendGateway {
    ledger: Arc<PaymentLedger>,
    purchases: Arc<Mutex<HashMap<(String, String), Purchase>>>,
    channel_balance: Mutex<Option<Decimal>>,
    started: AtomicBool,
    sequence: AtomicU64,
}

impl std::fmt::Debug for MemoryBackendGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackendGateway").finish_non_exhaustive()
    }
}

impl Default for MemoryBackendGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackendGateway {
    /// Creates a backend gateway with no open payment channel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ledger: PaymentLedger::new(),
            purchases: Arc::new(Mutex::new(HashMap::new())),
            channel_balance: Mutex::new(None),
            started: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
        }
    }

    /// Opens a payment channel funded with `budget`.
    pub async fn open_channel(&self, budget: Decimal) {
        *self.channel_balance.lock().await = Some(budget);
    }

    /// Drives `payment` through `statuses`, recording a purchase once it
    /// completes. Stops silently if the payment is removed mid-flight.
    fn drive(
        &self,
        payment: Payment,
        statuses: &'static [TransactionStatus],
        developer_payload: Option<String>,
    ) {
        let ledger = Arc::clone(&self.ledger);
        let purchases = Arc::clone(&self.purchases);
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(async move {
            let mut payment = payment;
            for &status in statuses {
                tokio::time::sleep(STEP_DELAY).await;
                if ledger.get(&payment.uri).await.is_none() {
                    return;
                }
                payment.status = status;
                // The purchase record must exist before anyone can observe
                // the completed snapshot.
                if status == TransactionStatus::Completed {
                    let purchase = build_purchase(seq, &payment, developer_payload.clone());
                    purchases.lock().await.insert(
                        (payment.package_name.clone(), payment.product_id.clone()),
                        purchase,
                    );
                }
                ledger.upsert(payment.clone()).await;
            }
        });
    }
}

fn build_purchase(seq: u64, payment: &Payment, developer_payload: Option<String>) -> Purchase {
    Purchase {
        uid: format!("purchase-{seq}"),
        package_name: payment.package_name.clone(),
        product_id: payment.product_id.clone(),
        signature: PurchaseSignature {
            value: format!("sig-{seq:08x}"),
            message: SignatureData {
                order_id: format!("order-{seq}"),
                package_name: payment.package_name.clone(),
                product_id: payment.product_id.clone(),
                purchase_time: unix_millis(),
                purchase_token: format!("token-{seq}"),
                developer_payload,
            },
        },
    }
}

#[async_trait]
impl PurchaseGateway for MemoryBackendGateway {
    async fn parse_transaction(&self, uri: &str) -> Result<PaymentRequest, GatewayError> {
        parse_payment_uri(uri)
    }

    async fn send(&self, request: &PaymentRequest) -> Result<(), GatewayError> {
        ensure_started(&self.started)?;
        let payment = Payment::new(
            request.uri.as_str(),
            request.package_name.as_str(),
            request.product_name.as_str(),
            TransactionStatus::Pending,
        );
        self.ledger.upsert(payment.clone()).await;
        tracing::debug!(uri = %payment.uri, "backend payment accepted");
        self.drive(
            payment,
            &[
                TransactionStatus::PendingServiceAuthorization,
                TransactionStatus::Processing,
                TransactionStatus::Completed,
            ],
            request.developer_payload.clone(),
        );
        Ok(())
    }

    fn transaction_state(&self, uri: &str) -> PaymentStream {
        self.ledger.watch(uri)
    }

    async fn remove(&self, uri: &str) -> Result<(), GatewayError> {
        let _ = self.ledger.remove(uri).await;
        Ok(())
    }

    async fn start(&self) {
        self.started.store(true, Ordering::Relaxed);
        tracing::info!(gateway = "memory-backend", "gateway started");
    }

    fn all(&self) -> PaymentListStream {
        self.ledger.watch_all()
    }
}

#[async_trait]
impl BackendGateway for MemoryBackendGateway {
    async fn resume(&self, request: &PaymentRequest) -> Result<(), GatewayError> {
        ensure_started(&self.started)?;
        // An interrupted payment may no longer be tracked locally; resuming
        // re-registers it before driving it to completion.
        let payment = Payment::new(
            request.uri.as_str(),
            request.package_name.as_str(),
            request.product_name.as_str(),
            TransactionStatus::PendingServiceAuthorization,
        );
        self.ledger.upsert(payment.clone()).await;
        tracing::debug!(uri = %payment.uri, "backend payment resumed");
        self.drive(
            payment,
            &[TransactionStatus::Processing, TransactionStatus::Completed],
            request.developer_payload.clone(),
        );
        Ok(())
    }

    async fn completed_purchase(
        &self,
        package_name: &str,
        product_id: &str,
    ) -> Result<Purchase, GatewayError> {
        self.purchases
            .lock()
            .await
            .get(&(package_name.to_owned(), product_id.to_owned()))
            .cloned()
            .ok_or_else(|| GatewayError::PurchaseNotFound {
                package_name: package_name.to_owned(),
                product_id: product_id.to_owned(),
            })
    }

    fn top_up_channel_suggestions(&self, price: Decimal) -> Vec<Decimal> {
        let base = price.ceil();
        [
            Decimal::ZERO,
            Decimal::from(5),
            Decimal::from(10),
            Decimal::from(25),
            Decimal::from(50),
        ]
        .into_iter()
        .map(|delta| base + delta)
        .collect()
    }

    async fn has_channel(&self) -> Result<bool, GatewayError> {
        Ok(self.channel_balance.lock().await.is_some())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use iap::dispatcher::PurchaseDispatcher;
    use iap::gateway::PaymentSource;

    use super::*;

    const URI: &str =
        "appc://buy?domain=com.example.game&product=gems_100&amount=1.50&payload=order-42";
    const WALLET: &str = "0x00a329c0648769a73afac7f9381e08fb43dbea72";

    fn on_chain() -> MemoryOnChainGateway {
        MemoryOnChainGateway::new(WALLET, Decimal::from(100))
            .with_rate("EUR", Decimal::new(11, 1))
    }

    async fn next_completed(states: &mut PaymentStream) -> Payment {
        while let Some(update) = states.next().await {
            let payment = update.unwrap();
            if payment.status == TransactionStatus::Completed {
                return payment;
            }
        }
        panic!("state stream ended before the payment completed");
    }

    #[tokio::test]
    async fn test_parse_transaction_reads_query() {
        let gateway = on_chain();
        let request = gateway.parse_transaction(URI).await.unwrap();

        assert_eq!(request.package_name, "com.example.game");
        assert_eq!(request.product_name, "gems_100");
        assert_eq!(request.amount, Decimal::new(150, 2));
        assert_eq!(request.kind, TransactionKind::Normal);
        assert_eq!(request.developer_payload.as_deref(), Some("order-42"));
    }

    #[tokio::test]
    async fn test_parse_transaction_rejects_foreign_scheme() {
        let gateway = on_chain();
        let result = gateway
            .parse_transaction("https://example.com/buy?domain=a&product=b&amount=1")
            .await;
        assert!(matches!(result, Err(GatewayError::MalformedUri { .. })));
    }

    #[tokio::test]
    async fn test_parse_transaction_requires_amount() {
        let gateway = on_chain();
        let result = gateway
            .parse_transaction("appc://buy?domain=a&product=b")
            .await;
        assert!(matches!(
            result,
            Err(GatewayError::MalformedUri { reason, .. }) if reason.contains("amount")
        ));
    }

    #[tokio::test]
    async fn test_send_requires_start() {
        let gateway = on_chain();
        let request = gateway.parse_transaction(URI).await.unwrap();
        let result = gateway.send(&request).await;
        assert!(matches!(result, Err(GatewayError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_on_chain_payment_completes_with_buy_hash() {
        let gateway = on_chain();
        gateway.start().await;
        let request = gateway.parse_transaction(URI).await.unwrap();

        let mut states = gateway.transaction_state(URI);
        gateway.send(&request).await.unwrap();

        let done = next_completed(&mut states).await;
        assert!(done.buy_hash.as_deref().unwrap().starts_with("0x"));
    }

    #[tokio::test]
    async fn test_on_chain_send_rejects_insufficient_funds() {
        let gateway = MemoryOnChainGateway::new(WALLET, Decimal::ZERO);
        gateway.start().await;
        let request = gateway.parse_transaction(URI).await.unwrap();

        let result = gateway.send(&request).await;
        assert!(matches!(result, Err(GatewayError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_funds_readiness_includes_gas_margin() {
        // 1.50 APPC needs 1.875 with the gas multiplier applied.
        let tight = MemoryOnChainGateway::new(WALLET, Decimal::new(150, 2));
        let request = tight.parse_transaction(URI).await.unwrap();
        assert!(!tight.is_funds_ready(&request).await.unwrap());

        let funded = MemoryOnChainGateway::new(WALLET, Decimal::from(2));
        assert!(funded.is_funds_ready(&request).await.unwrap());
    }

    #[tokio::test]
    async fn test_transaction_lookup_reflects_payment_status() {
        let gateway = on_chain();
        gateway.start().await;
        let request = gateway.parse_transaction(URI).await.unwrap();
        gateway.send(&request).await.unwrap();

        let transaction = gateway
            .transaction("com.example.game", "gems_100")
            .await
            .unwrap();
        assert_eq!(transaction.gateway, GatewayName::Appcoins);
        assert_eq!(transaction.uid, URI);
    }

    #[tokio::test]
    async fn test_convert_to_fiat_uses_registered_rate() {
        let gateway = on_chain();
        let fiat = gateway
            .convert_to_fiat(Decimal::from(3), "EUR")
            .await
            .unwrap();
        assert_eq!(fiat.amount, Decimal::new(33, 1));
        assert_eq!(fiat.currency, "EUR");

        let missing = gateway.convert_to_fiat(Decimal::from(3), "JPY").await;
        assert!(matches!(missing, Err(GatewayError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_all_emits_snapshot_per_update() {
        let gateway = on_chain();
        gateway.start().await;

        let mut all = gateway.all();
        assert!(all.next().await.unwrap().unwrap().is_empty());

        let request = gateway.parse_transaction(URI).await.unwrap();
        gateway.send(&request).await.unwrap();

        let snapshot = all.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].uri, URI);
    }

    #[tokio::test]
    async fn test_resume_drives_payment_to_completion() {
        let gateway = MemoryBackendGateway::new();
        gateway.start().await;
        let request = gateway.parse_transaction(URI).await.unwrap();

        let mut states = gateway.transaction_state(URI);
        gateway.resume(&request).await.unwrap();

        let done = next_completed(&mut states).await;
        assert_eq!(done.status, TransactionStatus::Completed);
    }

    #[tokio::test]
    async fn test_top_up_suggestions_cover_price() {
        let gateway = MemoryBackendGateway::new();
        let suggestions = gateway.top_up_channel_suggestions(Decimal::new(72, 1));

        assert_eq!(suggestions.len(), 5);
        assert_eq!(suggestions[0], Decimal::from(8));
        assert!(suggestions.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_has_channel_after_open() {
        let gateway = MemoryBackendGateway::new();
        assert!(!gateway.has_channel().await.unwrap());
        gateway.open_channel(Decimal::from(10)).await;
        assert!(gateway.has_channel().await.unwrap());
    }

    #[tokio::test]
    async fn test_backend_purchase_flow_end_to_end() {
        let on_chain = Arc::new(on_chain());
        let backend = Arc::new(MemoryBackendGateway::new());
        let dispatcher = PurchaseDispatcher::new(
            Arc::clone(&on_chain) as Arc<dyn OnChainGateway>,
            Arc::clone(&backend) as Arc<dyn BackendGateway>,
        );
        dispatcher.start().await;

        let request = dispatcher
            .parse_transaction(URI, PaymentSource::Backend)
            .await
            .unwrap();
        let mut states = dispatcher.transaction_state(URI);
        dispatcher
            .send(&request, PaymentSource::Backend)
            .await
            .unwrap();

        let done = next_completed(&mut states).await;
        let receipt = dispatcher
            .completed_purchase(&done, PaymentSource::Backend)
            .await
            .unwrap();

        assert_eq!(receipt.response_code, 0);
        assert!(receipt.purchase_uid.is_some());
        assert!(receipt.purchase_data.unwrap().contains("com.example.game"));

        // The payment is gone from both gateways once the receipt is out.
        let mut backend_all = backend.all();
        assert!(backend_all.next().await.unwrap().unwrap().is_empty());
        let mut on_chain_all = on_chain.all();
        assert!(on_chain_all.next().await.unwrap().unwrap().is_empty());
    }
}

//! Routing of purchase operations across the two billing flows.
//!
//! [`PurchaseDispatcher`] is the single entry point the wallet uses to run
//! an in-app purchase. Every operation is delegated to the gateway selected
//! by an explicit [`PaymentSource`] tag; the two operations that observe
//! both flows at once ([`PurchaseDispatcher::transaction_state`] and
//! [`PurchaseDispatcher::all`]) merge the gateways' streams without
//! imposing any cross-source ordering.
//!
//! The dispatcher owns no payment state. It holds the two gateway handles
//! and two stateless receipt helpers, and composes their results.

use std::fmt;
use std::sync::Arc;

use futures_util::stream;
use rust_decimal::Decimal;

use crate::error::DispatchError;
use crate::gateway::{
    BackendGateway, OnChainGateway, PaymentListStream, PaymentSource, PaymentStream,
    PurchaseGateway,
};
use crate::payment::{FiatValue, Payment, PaymentRequest, Transaction};
use crate::receipt::{PurchaseReceipt, ReceiptMapper, SignatureSerializer};
use crate::step::{PaymentStep, payment_step};

/// Multiplier applied to the network gas price when funding on-chain
/// purchases, so a fee spike between quote and submission does not strand
/// the transaction.
pub const GAS_PRICE_MULTIPLIER: Decimal = Decimal::from_parts(125, 0, 0, false, 2);

/// Routes purchase operations to the on-chain or backend billing flow.
pub struct PurchaseDispatcher {
    on_chain: Arc<dyn OnChainGateway>,
    backend: Arc<dyn BackendGateway>,
    receipts: ReceiptMapper,
    signatures: SignatureSerializer,
}

impl fmt::Debug for PurchaseDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurchaseDispatcher").finish_non_exhaustive()
    }
}

impl PurchaseDispatcher {
    /// Creates a dispatcher over the two billing gateways.
    #[must_use]
    pub fn new(on_chain: Arc<dyn OnChainGateway>, backend: Arc<dyn BackendGateway>) -> Self {
        Self {
            on_chain,
            backend,
            receipts: ReceiptMapper,
            signatures: SignatureSerializer,
        }
    }

    /// Parses a payment URI on the selected gateway only.
    ///
    /// # Errors
    ///
    /// Surfaces the selected gateway's parse failure unchanged.
    pub async fn parse_transaction(
        &self,
        uri: &str,
        source: PaymentSource,
    ) -> Result<PaymentRequest, DispatchError> {
        tracing::debug!(uri = %uri, source = %source, "parsing payment uri");
        let request = match source {
            PaymentSource::OnChain => self.on_chain.parse_transaction(uri).await?,
            PaymentSource::Backend => self.backend.parse_transaction(uri).await?,
        };
        Ok(request)
    }

    /// Fires the purchase on the selected gateway.
    ///
    /// There is no cross-gateway fallback: a failure on the selected flow
    /// is the operation's failure.
    ///
    /// # Errors
    ///
    /// Surfaces the selected gateway's failure unchanged.
    pub async fn send(
        &self,
        request: &PaymentRequest,
        source: PaymentSource,
    ) -> Result<(), DispatchError> {
        tracing::debug!(uri = %request.uri, source = %source, "sending purchase");
        match source {
            PaymentSource::OnChain => self.on_chain.send(request).await?,
            PaymentSource::Backend => self.backend.send(request).await?,
        }
        Ok(())
    }

    /// Resumes an interrupted purchase on the backend flow.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ResumeUnsupported`] when `source` is
    /// [`PaymentSource::OnChain`], before either gateway is touched; the
    /// on-chain flow never supports resuming. Backend failures surface
    /// unchanged.
    pub async fn resume(
        &self,
        request: &PaymentRequest,
        source: PaymentSource,
    ) -> Result<(), DispatchError> {
        match source {
            PaymentSource::Backend => {
                tracing::debug!(uri = %request.uri, "resuming purchase on backend");
                Ok(self.backend.resume(request).await?)
            }
            PaymentSource::OnChain => {
                tracing::warn!(uri = %request.uri, "resume requested for the on-chain flow");
                Err(DispatchError::ResumeUnsupported)
            }
        }
    }

    /// Status snapshots for the payment at `uri`, from both gateways.
    ///
    /// The two source streams are merged by arrival time. Emissions are
    /// independent updates: neither source waits for the other, and either
    /// may emit zero or many times.
    pub fn transaction_state(&self, uri: &str) -> PaymentStream {
        Box::pin(stream::select(
            self.on_chain.transaction_state(uri),
            self.backend.transaction_state(uri),
        ))
    }

    /// Forgets the payment at `uri` on both gateways, on-chain first.
    ///
    /// The backend removal only starts once the on-chain removal has
    /// succeeded.
    ///
    /// # Errors
    ///
    /// Reports the on-chain failure if that step fails, in which case the
    /// backend gateway is never called; otherwise reports any backend
    /// failure.
    pub async fn remove_payment(&self, uri: &str) -> Result<(), DispatchError> {
        self.on_chain.remove(uri).await?;
        self.backend.remove(uri).await?;
        Ok(())
    }

    /// Initializes both gateways unconditionally.
    pub async fn start(&self) {
        tracing::info!("starting billing gateways");
        self.on_chain.start().await;
        self.backend.start().await;
    }

    /// Payment-list snapshots from both gateways, merged.
    ///
    /// Lists are not deduplicated across sources; a purchase both flows
    /// track appears in both gateways' snapshots.
    pub fn all(&self) -> PaymentListStream {
        Box::pin(stream::select(self.on_chain.all(), self.backend.all()))
    }

    /// Where the purchase described by `request` currently stands.
    ///
    /// Fetches the on-chain gateway's transaction record and the wallet's
    /// funds-readiness, then applies [`payment_step`].
    ///
    /// # Errors
    ///
    /// Surfaces gateway lookup failures unchanged, and
    /// [`DispatchError::UnknownGateway`] from the step policy.
    pub async fn current_payment_step(
        &self,
        package_name: &str,
        request: &PaymentRequest,
    ) -> Result<PaymentStep, DispatchError> {
        let transaction = self
            .on_chain
            .transaction(package_name, &request.product_name)
            .await?;
        let funds_ready = self.on_chain.is_funds_ready(request).await?;
        payment_step(&transaction, funds_ready)
    }

    /// Address of the wallet funding on-chain purchases.
    ///
    /// # Errors
    ///
    /// Surfaces the on-chain gateway's failure unchanged.
    pub async fn wallet_address(&self) -> Result<String, DispatchError> {
        Ok(self.on_chain.wallet_address().await?)
    }

    /// The on-chain transaction record for a product purchase.
    ///
    /// # Errors
    ///
    /// Surfaces the on-chain gateway's failure unchanged.
    pub async fn transaction(
        &self,
        package_name: &str,
        product_name: &str,
    ) -> Result<Transaction, DispatchError> {
        Ok(self.on_chain.transaction(package_name, product_name).await?)
    }

    /// Converts an APPC amount into fiat via the on-chain gateway.
    ///
    /// # Errors
    ///
    /// Surfaces the on-chain gateway's failure unchanged.
    pub async fn convert_to_fiat(
        &self,
        appc_value: Decimal,
        currency: &str,
    ) -> Result<FiatValue, DispatchError> {
        Ok(self.on_chain.convert_to_fiat(appc_value, currency).await?)
    }

    /// Suggested channel top-up values covering `price`.
    #[must_use]
    pub fn top_up_channel_suggestions(&self, price: Decimal) -> Vec<Decimal> {
        self.backend.top_up_channel_suggestions(price)
    }

    /// Whether the wallet has an open payment channel.
    ///
    /// # Errors
    ///
    /// Surfaces the backend gateway's failure unchanged.
    pub async fn has_channel(&self) -> Result<bool, DispatchError> {
        Ok(self.backend.has_channel().await?)
    }

    /// Builds the result payload for a completed purchase, then removes the
    /// payment from both gateways.
    ///
    /// For [`PaymentSource::Backend`] the completed purchase record is
    /// fetched and mapped into a receipt carrying its identifier, signature
    /// and serialized signed payload; for [`PaymentSource::OnChain`] the
    /// receipt is built directly from the payment's buy hash. In both
    /// branches the receipt is built first and the removal runs second; a
    /// removal failure discards the receipt and becomes the operation's
    /// failure.
    ///
    /// # Errors
    ///
    /// Surfaces purchase-lookup and removal failures unchanged, and
    /// [`DispatchError::Receipt`] if the signed payload cannot be
    /// serialized.
    pub async fn completed_purchase(
        &self,
        payment: &Payment,
        source: PaymentSource,
    ) -> Result<PurchaseReceipt, DispatchError> {
        let receipt = match source {
            PaymentSource::Backend => {
                let purchase = self
                    .backend
                    .completed_purchase(&payment.package_name, &payment.product_id)
                    .await?;
                let purchase_data = self.signatures.serialize_signature_data(&purchase)?;
                self.receipts.purchase_receipt(
                    purchase.uid.as_str(),
                    purchase.signature.value.as_str(),
                    purchase_data,
                )
            }
            PaymentSource::OnChain => self.receipts.transaction_receipt(payment.buy_hash.as_deref()),
        };
        self.remove_payment(&payment.uri).await?;
        tracing::debug!(uri = %payment.uri, source = %source, "purchase receipt delivered");
        Ok(receipt)
    }
}

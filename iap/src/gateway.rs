//! Billing gateway capabilities.
//!
//! A purchase can be carried by one of two independent backends: the
//! on-chain flow, which settles directly against the blockchain, and the
//! backend flow, which settles through the billing service. Both expose the
//! shared [`PurchaseGateway`] capability; the operations only one side
//! supports live on the [`OnChainGateway`] and [`BackendGateway`]
//! extension traits.
//!
//! The dispatcher selects between the two by an explicit [`PaymentSource`]
//! tag rather than inspecting the payment itself, so adding a third flow
//! means adding a variant, not rewiring call sites.

use std::fmt;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::payment::{FiatValue, Payment, PaymentRequest, Purchase, Transaction};

/// Which billing flow a purchase operation is routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSource {
    /// Settle directly on-chain.
    OnChain,
    /// Settle through the billing backend.
    Backend,
}

impl fmt::Display for PaymentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnChain => f.write_str("on-chain"),
            Self::Backend => f.write_str("backend"),
        }
    }
}

/// Stream of payment snapshots for a single purchase.
///
/// Each item is an independent update; emissions carry no ordering
/// guarantee relative to other streams observing the same purchase.
pub type PaymentStream = BoxStream<'static, Result<Payment, GatewayError>>;

/// Stream of full payment-list snapshots.
pub type PaymentListStream = BoxStream<'static, Result<Vec<Payment>, GatewayError>>;

/// Operations both billing flows support.
///
/// Implementations own all payment state for their flow; the dispatcher
/// holds them behind [`Arc`](std::sync::Arc) and never caches anything
/// they report.
#[async_trait]
pub trait PurchaseGateway: Send + Sync {
    /// Parses an opaque payment URI into a transaction descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedUri`] if the URI is not one this
    /// gateway understands.
    async fn parse_transaction(&self, uri: &str) -> Result<PaymentRequest, GatewayError>;

    /// Fires the purchase described by `request` on this gateway.
    ///
    /// Completion means the gateway accepted the payment for processing,
    /// not that it settled; track settlement via [`Self::transaction_state`].
    ///
    /// # Errors
    ///
    /// Surfaces whatever the gateway reports; the dispatcher never retries.
    async fn send(&self, request: &PaymentRequest) -> Result<(), GatewayError>;

    /// Subscribes to status snapshots for the payment at `uri`.
    ///
    /// May emit zero, one, or many times. A gateway that does not know the
    /// URI simply never emits.
    fn transaction_state(&self, uri: &str) -> PaymentStream;

    /// Forgets the payment tracked at `uri`.
    ///
    /// Removing a URI the gateway does not track is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway failed to drop its record.
    async fn remove(&self, uri: &str) -> Result<(), GatewayError>;

    /// Initializes the gateway. Idempotent.
    async fn start(&self);

    /// Subscribes to snapshots of every payment this gateway tracks.
    fn all(&self) -> PaymentListStream;
}

/// Operations only the on-chain flow supports.
#[async_trait]
pub trait OnChainGateway: PurchaseGateway {
    /// Address of the wallet funding on-chain purchases.
    ///
    /// # Errors
    ///
    /// Returns an error if no wallet is available.
    async fn wallet_address(&self) -> Result<String, GatewayError>;

    /// Looks up the transaction record for a product purchase.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PaymentNotFound`] if no transaction exists
    /// for the product.
    async fn transaction(
        &self,
        package_name: &str,
        product_name: &str,
    ) -> Result<Transaction, GatewayError>;

    /// Whether the wallet balance covers `request`, gas included.
    ///
    /// # Errors
    ///
    /// Returns an error if the balance could not be read.
    async fn is_funds_ready(&self, request: &PaymentRequest) -> Result<bool, GatewayError>;

    /// Converts an APPC amount into the given fiat currency.
    ///
    /// # Errors
    ///
    /// Returns an error if no exchange rate is known for `currency`.
    async fn convert_to_fiat(
        &self,
        appc_value: Decimal,
        currency: &str,
    ) -> Result<FiatValue, GatewayError>;
}

/// Operations only the backend flow supports.
#[async_trait]
pub trait BackendGateway: PurchaseGateway {
    /// Resumes a previously interrupted purchase.
    ///
    /// # Errors
    ///
    /// Surfaces whatever the backend reports for the resumed payment.
    async fn resume(&self, request: &PaymentRequest) -> Result<(), GatewayError>;

    /// Fetches the completed purchase record for a product.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PurchaseNotFound`] if the product has no
    /// completed purchase.
    async fn completed_purchase(
        &self,
        package_name: &str,
        product_id: &str,
    ) -> Result<Purchase, GatewayError>;

    /// Suggested top-up values for funding a payment channel able to cover
    /// `price`.
    fn top_up_channel_suggestions(&self, price: Decimal) -> Vec<Decimal>;

    /// Whether the wallet currently has an open payment channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel state could not be read.
    async fn has_channel(&self) -> Result<bool, GatewayError>;
}

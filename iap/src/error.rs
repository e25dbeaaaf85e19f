//! Error types for purchase dispatch.
//!
//! Two layers of failure exist: [`GatewayError`] is produced by a billing
//! gateway and passes through the dispatcher untouched, while
//! [`DispatchError`] adds the few failures the dispatcher itself can
//! originate (routing policy violations and receipt serialization).

/// Errors produced by a billing gateway while servicing a delegated call.
///
/// The dispatcher never retries or rewraps these; whatever the selected
/// gateway reports is what the caller sees.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// No payment is tracked for the given URI.
    #[error("no payment tracked for uri '{0}'")]
    PaymentNotFound(String),

    /// No transaction exists for the given product purchase.
    #[error("no transaction for '{product_name}' in '{package_name}'")]
    TransactionNotFound {
        /// Application package the transaction was looked up for.
        package_name: String,
        /// Product the transaction was looked up for.
        product_name: String,
    },

    /// No completed purchase exists for the given product.
    #[error("no completed purchase for '{product_id}' in '{package_name}'")]
    PurchaseNotFound {
        /// Application package the purchase was looked up for.
        package_name: String,
        /// Product identifier the purchase was looked up for.
        product_id: String,
    },

    /// The payment URI could not be parsed into a transaction descriptor.
    #[error("malformed payment uri '{uri}': {reason}")]
    MalformedUri {
        /// The URI as received.
        uri: String,
        /// Why parsing failed.
        reason: String,
    },

    /// The gateway refused the payment.
    #[error("payment rejected: {0}")]
    Rejected(String),

    /// The gateway cannot service requests right now.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by [`PurchaseDispatcher`](crate::dispatcher::PurchaseDispatcher)
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Resume was requested for the on-chain flow, which never supports it.
    ///
    /// This is a fixed routing policy, not a transient condition; retrying
    /// the call will always fail.
    #[error("the on-chain gateway does not support resuming payments")]
    ResumeUnsupported,

    /// A transaction carried a gateway identity the step policy cannot
    /// interpret. Signals inconsistent data upstream, not caller misuse.
    #[error("unknown gateway for transaction '{uid}'")]
    UnknownGateway {
        /// Identifier of the offending transaction.
        uid: String,
    },

    /// A delegated gateway call failed; surfaced unchanged.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The purchase receipt payload could not be serialized.
    #[error("failed to serialize purchase receipt: {0}")]
    Receipt(#[from] serde_json::Error),
}

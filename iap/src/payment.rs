//! Value types shared by the billing gateways and the dispatcher.
//!
//! - [`PaymentRequest`] - A transaction descriptor parsed from a payment URI
//! - [`Payment`] - A snapshot of an in-flight or completed purchase
//! - [`Transaction`] - A gateway-side transaction record with its status
//! - [`TransactionStatus`] / [`GatewayName`] - The raw state a gateway reports
//! - [`Purchase`] - A completed backend purchase with its signature
//! - [`FiatValue`] - An amount converted into a fiat currency
//!
//! All of these are immutable value types; gateways emit fresh snapshots
//! rather than mutating previously emitted ones.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a purchase transaction is funded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// A one-shot purchase paid directly from the wallet.
    Normal,
    /// A purchase paid from a pre-funded payment channel.
    Channel,
}

/// A transaction descriptor parsed from an opaque payment URI.
///
/// Created by a gateway's parse step and consumed once per dispatch call.
/// The `amount` doubles as the channel budget for [`TransactionKind::Channel`]
/// purchases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// The payment URI this descriptor was parsed from.
    pub uri: String,
    /// How the purchase is funded.
    pub kind: TransactionKind,
    /// Package name of the application requesting the purchase.
    pub package_name: String,
    /// Product being purchased.
    pub product_name: String,
    /// Purchase amount, in APPC.
    pub amount: Decimal,
    /// Opaque payload echoed back to the developer on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub developer_payload: Option<String>,
}

impl PaymentRequest {
    /// Creates a descriptor with no developer payload.
    #[must_use]
    pub fn new(
        uri: impl Into<String>,
        kind: TransactionKind,
        package_name: impl Into<String>,
        product_name: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            uri: uri.into(),
            kind,
            package_name: package_name.into(),
            product_name: product_name.into(),
            amount,
            developer_payload: None,
        }
    }

    /// Attaches a developer payload.
    #[must_use]
    pub fn with_developer_payload(mut self, payload: impl Into<String>) -> Self {
        self.developer_payload = Some(payload.into());
        self
    }
}

/// Lifecycle status of a purchase transaction.
///
/// Exactly one status holds at any observation instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Accepted by the gateway, not yet being processed.
    Pending,
    /// Waiting on an external service to authorize the payment.
    PendingServiceAuthorization,
    /// Actively being processed.
    Processing,
    /// Settled successfully.
    Completed,
    /// Processing failed.
    Failed,
    /// Canceled before settlement.
    Canceled,
    /// Rejected as invalid by the gateway.
    InvalidTransaction,
}

/// Identity of the gateway a transaction is routed through.
///
/// Disambiguates how a waiting status should be interpreted: `appcoins`
/// payments pause on-chain, `adyen` payments pause off-chain.
///
/// # Serialization
///
/// Serializes to its canonical lowercase name; any unrecognized name
/// deserializes to [`GatewayName::Unknown`] rather than failing, since the
/// identity travels with data from services the wallet does not control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayName {
    /// The on-chain AppCoins gateway.
    Appcoins,
    /// The Adyen card-processing gateway.
    Adyen,
    /// Anything the wallet does not recognize.
    Unknown,
}

impl GatewayName {
    /// The canonical lowercase name reported on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Appcoins => "appcoins",
            Self::Adyen => "adyen",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for GatewayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for GatewayName {
    fn from(value: &str) -> Self {
        match value {
            "appcoins" => Self::Appcoins,
            "adyen" => Self::Adyen,
            _ => Self::Unknown,
        }
    }
}

impl Serialize for GatewayName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GatewayName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// A gateway-side transaction record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Gateway-assigned transaction identifier.
    pub uid: String,
    /// Current lifecycle status.
    pub status: TransactionStatus,
    /// Which gateway is carrying the transaction.
    pub gateway: GatewayName,
}

impl Transaction {
    /// Creates a transaction record.
    #[must_use]
    pub fn new(uid: impl Into<String>, status: TransactionStatus, gateway: GatewayName) -> Self {
        Self {
            uid: uid.into(),
            status,
            gateway,
        }
    }
}

/// A snapshot of an in-flight or completed purchase, tracked by URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// The payment URI identifying the purchase.
    pub uri: String,
    /// Package name of the purchasing application.
    pub package_name: String,
    /// Identifier of the purchased product.
    pub product_id: String,
    /// Hash of the settling transaction, once one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_hash: Option<String>,
    /// Status at the instant this snapshot was emitted.
    pub status: TransactionStatus,
}

impl Payment {
    /// Creates a payment snapshot without a buy hash.
    #[must_use]
    pub fn new(
        uri: impl Into<String>,
        package_name: impl Into<String>,
        product_id: impl Into<String>,
        status: TransactionStatus,
    ) -> Self {
        Self {
            uri: uri.into(),
            package_name: package_name.into(),
            product_id: product_id.into(),
            buy_hash: None,
            status,
        }
    }

    /// Attaches the hash of the settling transaction.
    #[must_use]
    pub fn with_buy_hash(mut self, buy_hash: impl Into<String>) -> Self {
        self.buy_hash = Some(buy_hash.into());
        self
    }
}

/// The payload covered by a purchase signature.
///
/// Serialized verbatim into the receipt handed to the purchasing
/// application, which verifies it against [`PurchaseSignature::value`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureData {
    /// Backend order identifier.
    pub order_id: String,
    /// Package name of the purchasing application.
    pub package_name: String,
    /// Identifier of the purchased product.
    pub product_id: String,
    /// Settlement time, milliseconds since the Unix epoch.
    pub purchase_time: i64,
    /// Token the application uses to consume the purchase.
    pub purchase_token: String,
    /// Developer payload echoed back from the original request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub developer_payload: Option<String>,
}

/// Signature over a completed purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseSignature {
    /// Detached signature over the serialized [`SignatureData`].
    pub value: String,
    /// The signed payload.
    pub message: SignatureData,
}

/// A completed purchase record held by the backend gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    /// Backend purchase identifier.
    pub uid: String,
    /// Package name of the purchasing application.
    pub package_name: String,
    /// Identifier of the purchased product.
    pub product_id: String,
    /// Signature the application verifies the purchase with.
    pub signature: PurchaseSignature,
}

/// An amount expressed in a fiat currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiatValue {
    /// The converted amount.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
}

impl FiatValue {
    /// Creates a fiat value.
    #[must_use]
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_status_serializes_screaming_snake() {
        let status = TransactionStatus::PendingServiceAuthorization;
        let serialized = serde_json::to_string(&status).unwrap();
        assert_eq!(serialized, "\"PENDING_SERVICE_AUTHORIZATION\"");
    }

    #[test]
    fn test_transaction_status_roundtrip() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Processing,
            TransactionStatus::Completed,
            TransactionStatus::InvalidTransaction,
        ] {
            let serialized = serde_json::to_string(&status).unwrap();
            let deserialized: TransactionStatus = serde_json::from_str(&serialized).unwrap();
            assert_eq!(status, deserialized);
        }
    }

    #[test]
    fn test_gateway_name_from_str() {
        assert_eq!(GatewayName::from("appcoins"), GatewayName::Appcoins);
        assert_eq!(GatewayName::from("adyen"), GatewayName::Adyen);
        assert_eq!(GatewayName::from("paypal"), GatewayName::Unknown);
        assert_eq!(GatewayName::from(""), GatewayName::Unknown);
    }

    #[test]
    fn test_gateway_name_deserialize_unrecognized_is_unknown() {
        let name: GatewayName = serde_json::from_str("\"paypal\"").unwrap();
        assert_eq!(name, GatewayName::Unknown);
    }

    #[test]
    fn test_payment_request_builder() {
        let request = PaymentRequest::new(
            "appc://buy?domain=com.example.game&product=gems_100",
            TransactionKind::Normal,
            "com.example.game",
            "gems_100",
            Decimal::new(150, 2),
        )
        .with_developer_payload("order-42");

        assert_eq!(request.amount, Decimal::new(150, 2));
        assert_eq!(request.developer_payload.as_deref(), Some("order-42"));
    }

    #[test]
    fn test_signature_data_serializes_camel_case() {
        let data = SignatureData {
            order_id: "order-1".into(),
            package_name: "com.example.game".into(),
            product_id: "gems_100".into(),
            purchase_time: 1_700_000_000_000,
            purchase_token: "token-1".into(),
            developer_payload: None,
        };
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"orderId\""));
        assert!(json.contains("\"purchaseToken\""));
        assert!(!json.contains("developerPayload"));
    }
}

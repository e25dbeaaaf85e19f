//! Result payloads handed back to the purchasing application.
//!
//! Once a purchase completes, the caller receives a [`PurchaseReceipt`]
//! built by the stateless [`ReceiptMapper`]. On-chain purchases carry only
//! the settling transaction hash; backend purchases additionally carry the
//! purchase identifier, its signature, and the serialized signed payload
//! produced by [`SignatureSerializer`].

use serde::{Deserialize, Serialize};

use crate::payment::Purchase;

/// Response code reported on a successful purchase.
pub const RESPONSE_CODE_OK: i32 = 0;

/// Flat result payload for a completed purchase.
///
/// Mirrors the platform billing result the UI layer forwards to the
/// purchasing application; absent fields are omitted when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    /// Platform billing response code; [`RESPONSE_CODE_OK`] on success.
    pub response_code: i32,
    /// Hash of the settling transaction, for on-chain purchases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    /// Backend purchase identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_uid: Option<String>,
    /// Serialized signed purchase payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_data: Option<String>,
    /// Detached signature over `purchase_data`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_signature: Option<String>,
}

/// Builds [`PurchaseReceipt`]s from whichever flow completed the purchase.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiptMapper;

impl ReceiptMapper {
    /// Receipt for a purchase settled through the backend flow.
    #[must_use]
    pub fn purchase_receipt(
        &self,
        uid: impl Into<String>,
        signature: impl Into<String>,
        purchase_data: impl Into<String>,
    ) -> PurchaseReceipt {
        PurchaseReceipt {
            response_code: RESPONSE_CODE_OK,
            transaction_hash: None,
            purchase_uid: Some(uid.into()),
            purchase_data: Some(purchase_data.into()),
            data_signature: Some(signature.into()),
        }
    }

    /// Receipt for a purchase settled on-chain, identified by the hash of
    /// the transaction that bought it.
    #[must_use]
    pub fn transaction_receipt(&self, buy_hash: Option<&str>) -> PurchaseReceipt {
        PurchaseReceipt {
            response_code: RESPONSE_CODE_OK,
            transaction_hash: buy_hash.map(str::to_owned),
            purchase_uid: None,
            purchase_data: None,
            data_signature: None,
        }
    }
}

/// Serializes the signed portion of a [`Purchase`] for receipt packaging.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureSerializer;

impl SignatureSerializer {
    /// Renders the purchase's signed payload as the JSON string the
    /// application verifies against the purchase signature.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the payload cannot be rendered.
    pub fn serialize_signature_data(&self, purchase: &Purchase) -> Result<String, serde_json::Error> {
        serde_json::to_string(&purchase.signature.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::{PurchaseSignature, SignatureData};

    fn purchase() -> Purchase {
        Purchase {
            uid: "purchase-7".into(),
            package_name: "com.example.game".into(),
            product_id: "gems_100".into(),
            signature: PurchaseSignature {
                value: "sig-abc".into(),
                message: SignatureData {
                    order_id: "order-7".into(),
                    package_name: "com.example.game".into(),
                    product_id: "gems_100".into(),
                    purchase_time: 1_700_000_000_000,
                    purchase_token: "token-7".into(),
                    developer_payload: Some("payload-7".into()),
                },
            },
        }
    }

    #[test]
    fn test_transaction_receipt_carries_hash_and_ok_code() {
        let receipt = ReceiptMapper.transaction_receipt(Some("0xdeadbeef"));
        assert_eq!(receipt.response_code, RESPONSE_CODE_OK);
        assert_eq!(receipt.transaction_hash.as_deref(), Some("0xdeadbeef"));
        assert!(receipt.purchase_uid.is_none());
    }

    #[test]
    fn test_transaction_receipt_tolerates_missing_hash() {
        let receipt = ReceiptMapper.transaction_receipt(None);
        assert_eq!(receipt.response_code, RESPONSE_CODE_OK);
        assert!(receipt.transaction_hash.is_none());
    }

    #[test]
    fn test_purchase_receipt_fields() {
        let receipt = ReceiptMapper.purchase_receipt("purchase-7", "sig-abc", "{\"orderId\":\"order-7\"}");
        assert_eq!(receipt.response_code, RESPONSE_CODE_OK);
        assert_eq!(receipt.purchase_uid.as_deref(), Some("purchase-7"));
        assert_eq!(receipt.data_signature.as_deref(), Some("sig-abc"));
        assert!(receipt.transaction_hash.is_none());
    }

    #[test]
    fn test_serialize_signature_data_is_signed_payload_only() {
        let json = SignatureSerializer
            .serialize_signature_data(&purchase())
            .unwrap();
        assert!(json.contains("\"orderId\":\"order-7\""));
        assert!(json.contains("\"developerPayload\":\"payload-7\""));
        // The signature itself is not part of the signed payload.
        assert!(!json.contains("sig-abc"));
    }

    #[test]
    fn test_receipt_serialization_omits_absent_fields() {
        let receipt = ReceiptMapper.transaction_receipt(Some("0x01"));
        let json = serde_json::to_string(&receipt).unwrap();
        assert_eq!(
            json,
            "{\"responseCode\":0,\"transactionHash\":\"0x01\"}"
        );
    }
}

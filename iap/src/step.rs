//! Projection of raw transaction state into the step a purchase sits at.
//!
//! The wallet UI does not care about the seven raw statuses a gateway can
//! report; it needs to know whether a purchase is paused waiting on one of
//! the two flows, or finished and ready for another attempt. That decision
//! lives in exactly one place, [`payment_step`], so a behavioral change
//! touches one function.

use crate::error::DispatchError;
use crate::payment::{GatewayName, Transaction, TransactionStatus};

/// Where a purchase currently stands, from the caller's point of view.
///
/// Derived from a [`Transaction`] snapshot on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentStep {
    /// Waiting on the on-chain flow to progress.
    PausedOnChain,
    /// Waiting on the backend flow to progress.
    PausedOffChain,
    /// Nothing in flight; the wallet can fund a new attempt.
    Ready,
    /// Nothing in flight, and the wallet balance cannot fund an attempt.
    NoFunds,
}

/// Maps a transaction snapshot and the wallet's funds-readiness onto a
/// [`PaymentStep`].
///
/// Waiting statuses resolve by gateway identity: `appcoins` pauses
/// on-chain, `adyen` pauses off-chain. Completed transactions resolve by
/// the funds check. Failed, canceled and invalid transactions take the
/// same funds check as completed ones; the caller is offered a fresh
/// attempt either way.
///
/// # Errors
///
/// Returns [`DispatchError::UnknownGateway`] when a waiting transaction
/// carries an unrecognized gateway identity. That is a data problem
/// upstream, not something a retry can fix.
pub fn payment_step(
    transaction: &Transaction,
    funds_ready: bool,
) -> Result<PaymentStep, DispatchError> {
    match transaction.status {
        TransactionStatus::Pending
        | TransactionStatus::PendingServiceAuthorization
        | TransactionStatus::Processing => match transaction.gateway {
            GatewayName::Appcoins => Ok(PaymentStep::PausedOnChain),
            GatewayName::Adyen => Ok(PaymentStep::PausedOffChain),
            GatewayName::Unknown => {
                tracing::warn!(uid = %transaction.uid, "waiting transaction has unknown gateway");
                Err(DispatchError::UnknownGateway {
                    uid: transaction.uid.clone(),
                })
            }
        },
        TransactionStatus::Completed
        | TransactionStatus::Failed
        | TransactionStatus::Canceled
        | TransactionStatus::InvalidTransaction => Ok(if funds_ready {
            PaymentStep::Ready
        } else {
            PaymentStep::NoFunds
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(status: TransactionStatus, gateway: GatewayName) -> Transaction {
        Transaction::new("tx-1", status, gateway)
    }

    #[test]
    fn test_waiting_appcoins_pauses_on_chain() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::PendingServiceAuthorization,
            TransactionStatus::Processing,
        ] {
            let step = payment_step(&transaction(status, GatewayName::Appcoins), true).unwrap();
            assert_eq!(step, PaymentStep::PausedOnChain);
        }
    }

    #[test]
    fn test_waiting_adyen_pauses_off_chain() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::PendingServiceAuthorization,
            TransactionStatus::Processing,
        ] {
            let step = payment_step(&transaction(status, GatewayName::Adyen), false).unwrap();
            assert_eq!(step, PaymentStep::PausedOffChain);
        }
    }

    #[test]
    fn test_waiting_unknown_gateway_fails() {
        let result = payment_step(
            &transaction(TransactionStatus::Pending, GatewayName::Unknown),
            true,
        );
        assert!(matches!(
            result,
            Err(DispatchError::UnknownGateway { uid }) if uid == "tx-1"
        ));
    }

    #[test]
    fn test_completed_resolves_by_funds() {
        let tx = transaction(TransactionStatus::Completed, GatewayName::Appcoins);
        assert_eq!(payment_step(&tx, true).unwrap(), PaymentStep::Ready);
        assert_eq!(payment_step(&tx, false).unwrap(), PaymentStep::NoFunds);
    }

    #[test]
    fn test_terminal_failures_resolve_like_completed() {
        for status in [
            TransactionStatus::Failed,
            TransactionStatus::Canceled,
            TransactionStatus::InvalidTransaction,
        ] {
            let tx = transaction(status, GatewayName::Adyen);
            assert_eq!(payment_step(&tx, true).unwrap(), PaymentStep::Ready);
            assert_eq!(payment_step(&tx, false).unwrap(), PaymentStep::NoFunds);
        }
    }

    #[test]
    fn test_unknown_gateway_irrelevant_once_terminal() {
        // Gateway identity only disambiguates waiting states.
        let tx = transaction(TransactionStatus::Failed, GatewayName::Unknown);
        assert_eq!(payment_step(&tx, true).unwrap(), PaymentStep::Ready);
    }
}

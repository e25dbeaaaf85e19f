//! In-app purchase dispatch between on-chain and backend billing gateways.
//!
//! A wallet can complete an in-app purchase through two independent flows:
//! directly on-chain, or mediated by the billing backend. This crate holds
//! the types and routing logic shared by both — it does not talk to a
//! blockchain or a billing service itself; those live behind the gateway
//! traits.
//!
//! # Overview
//!
//! The caller parses a payment URI into a [`payment::PaymentRequest`],
//! fires it through the [`dispatcher::PurchaseDispatcher`] with an explicit
//! [`gateway::PaymentSource`], tracks progress on the merged status stream,
//! and finally exchanges the completed payment for a
//! [`receipt::PurchaseReceipt`].
//!
//! # Modules
//!
//! - [`payment`] - Value types: requests, payments, transactions, purchases
//! - [`gateway`] - The billing gateway capability traits and source tag
//! - [`dispatcher`] - Routing, stream merging, and receipt orchestration
//! - [`step`] - Projection of raw transaction state into a UI-facing step
//! - [`receipt`] - Result payloads for the purchasing application
//! - [`error`] - Gateway and dispatcher error types

pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod payment;
pub mod receipt;
pub mod step;

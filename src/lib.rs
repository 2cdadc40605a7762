//! Steeple Billing - Subscription Billing Reconciliation Service
//!
//! This crate reconciles asynchronous payment-provider webhook events against
//! the local checkout-session and subscription ledgers for the Steeple
//! church-management platform.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

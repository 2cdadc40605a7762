//! Outbound notification adapters.
//!
//! Billing notices are delivered through the platform notification
//! service; this module holds the HTTP client for it.

mod email_notifier;

pub use email_notifier::{EmailNotifier, NotifierConfig};

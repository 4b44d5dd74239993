//! Classification of read failures.
//!
//! The class decides whether a failed read is worth retrying. It never changes the error
//! itself; presenting the failure to a user is left to the caller.

use super::{BUSINESS_RULES, ReadError};
use alloy::sol_types::{Revert, SolError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON-RPC (EIP-1193) code for a request rejected by the user.
const USER_REJECTED_CODE: i64 = 4001;

/// JSON-RPC codes nodes and gateways use for throttling or unavailability.
const NETWORK_CODES: &[i64] = &[-32005, 429, 502, 503, 504];

const USER_REJECTED_MARKERS: &[&str] = &["user rejected", "user denied", "action_rejected"];

const NETWORK_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "rate limit",
    "too many requests",
    "network",
    "connection",
    "econnreset",
    "econnrefused",
    "socket",
    "fetch failed",
    "failed to fetch",
    "service unavailable",
    "bad gateway",
];

/// The class of a read failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "rule")]
pub enum ErrorClass {
    /// The user cancelled the request.
    UserRejected,
    /// The contract rejected the call for a business reason, e.g. `NotAWinner`.
    BusinessRule(String),
    /// Transport, timeout or connectivity failure.
    Network,
    /// Anything else.
    Unknown,
}

impl ErrorClass {
    /// Whether retrying a failure of this class can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Unknown)
    }

    /// Short label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::UserRejected => "user_rejected",
            Self::BusinessRule(_) => "business_rule",
            Self::Network => "network",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusinessRule(name) => write!(f, "business_rule({name})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Classifies a read failure.
///
/// Rules are applied in order: user cancellation, known business-rule errors, transport
/// failures, and finally [`ErrorClass::Unknown`].
pub fn classify(err: &ReadError) -> ErrorClass {
    let message = err.to_string().to_lowercase();
    let payload = err.error_payload();

    if payload.is_some_and(|payload| payload.code == USER_REJECTED_CODE)
        || USER_REJECTED_MARKERS.iter().any(|marker| message.contains(marker))
    {
        return ErrorClass::UserRejected;
    }

    let from_revert = payload
        .and_then(|payload| payload.as_revert_data())
        .and_then(|data| business_rule_from_revert(&data));
    if let Some(rule) = from_revert.or_else(|| business_rule_from_message(&message)) {
        return ErrorClass::BusinessRule(rule.to_string());
    }

    if err.is_transport_failure()
        || payload.is_some_and(|payload| NETWORK_CODES.contains(&payload.code))
        || NETWORK_MARKERS.iter().any(|marker| message.contains(marker))
    {
        return ErrorClass::Network;
    }

    ErrorClass::Unknown
}

/// Matches revert data against the business-rule table, either by custom error selector or
/// by the reason of a string revert.
fn business_rule_from_revert(data: &[u8]) -> Option<&'static str> {
    if let Some(rule) = BUSINESS_RULES.iter().find(|rule| data.starts_with(&rule.selector)) {
        return Some(rule.name);
    }
    let reason = Revert::abi_decode(data).ok()?.reason.to_lowercase();
    business_rule_from_message(&reason)
}

fn business_rule_from_message(message: &str) -> Option<&'static str> {
    BUSINESS_RULES
        .iter()
        .find(|rule| {
            message.contains(rule.phrase) || message.contains(&rule.name.to_lowercase())
        })
        .map(|rule| rule.name)
}

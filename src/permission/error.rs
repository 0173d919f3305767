//! Error types for spend-permission validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reason a spend permission was rejected.
///
/// These codes travel inside a [`ValidationResult`](super::types::ValidationResult)
/// and are never returned as `Err`. Every code means "deny": they exist for
/// diagnostics and user-facing copy only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorCode {
    InvalidStructure,
    AccountMismatch,
    DelegateMismatch,
    Expired,
    NotYetActive,
    ZeroAllowance,
    ZeroPeriod,
    SignatureRequired,
    InvalidSignature,
    InsufficientBalance,
    ValidationException,
}

impl ValidationErrorCode {
    /// Every code, in pipeline order.
    pub const ALL: [ValidationErrorCode; 11] = [
        ValidationErrorCode::InvalidStructure,
        ValidationErrorCode::AccountMismatch,
        ValidationErrorCode::DelegateMismatch,
        ValidationErrorCode::Expired,
        ValidationErrorCode::NotYetActive,
        ValidationErrorCode::ZeroAllowance,
        ValidationErrorCode::ZeroPeriod,
        ValidationErrorCode::SignatureRequired,
        ValidationErrorCode::InvalidSignature,
        ValidationErrorCode::InsufficientBalance,
        ValidationErrorCode::ValidationException,
    ];

    /// Wire code, e.g. `DELEGATE_MISMATCH`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationErrorCode::InvalidStructure => "INVALID_STRUCTURE",
            ValidationErrorCode::AccountMismatch => "ACCOUNT_MISMATCH",
            ValidationErrorCode::DelegateMismatch => "DELEGATE_MISMATCH",
            ValidationErrorCode::Expired => "EXPIRED",
            ValidationErrorCode::NotYetActive => "NOT_YET_ACTIVE",
            ValidationErrorCode::ZeroAllowance => "ZERO_ALLOWANCE",
            ValidationErrorCode::ZeroPeriod => "ZERO_PERIOD",
            ValidationErrorCode::SignatureRequired => "SIGNATURE_REQUIRED",
            ValidationErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ValidationErrorCode::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ValidationErrorCode::ValidationException => "VALIDATION_EXCEPTION",
        }
    }

    /// Safe, non-leaking message suitable for returning to an untrusted caller.
    pub fn description(&self) -> &'static str {
        match self {
            ValidationErrorCode::InvalidStructure => "Spend permission is malformed or incomplete",
            ValidationErrorCode::AccountMismatch => {
                "Spend permission was not granted by the claimed account"
            }
            ValidationErrorCode::DelegateMismatch => {
                "Spend permission does not authorize this delegate"
            }
            ValidationErrorCode::Expired => "Spend permission has expired",
            ValidationErrorCode::NotYetActive => "Spend permission is not active yet",
            ValidationErrorCode::ZeroAllowance => "Spend permission allowance is zero",
            ValidationErrorCode::ZeroPeriod => "Spend permission period is zero",
            ValidationErrorCode::SignatureRequired => "Spend permission must be signed",
            ValidationErrorCode::InvalidSignature => {
                "Spend permission signature does not match the granting account"
            }
            ValidationErrorCode::InsufficientBalance => {
                "Granting account balance does not cover the allowance"
            }
            ValidationErrorCode::ValidationException => "internal validation fault",
        }
    }

    /// Whether the verdict depends only on the permission itself, not on the
    /// claimed (grantor, delegate) pair or on live chain state. Only these
    /// negative verdicts may be cached.
    pub fn is_cacheable(&self) -> bool {
        matches!(
            self,
            ValidationErrorCode::InvalidStructure
                | ValidationErrorCode::Expired
                | ValidationErrorCode::NotYetActive
                | ValidationErrorCode::ZeroAllowance
                | ValidationErrorCode::ZeroPeriod
        )
    }
}

impl fmt::Display for ValidationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while querying ledger state.
///
/// The validator never propagates these; a failed probe becomes
/// [`ProbeOutcome::Inconclusive`](super::prober::ProbeOutcome::Inconclusive).
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to connect to chain RPC at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("RPC request failed: {0}")]
    RpcError(String),

    #[error("Malformed {field} address: {value}")]
    InvalidAddress { field: &'static str, value: String },
}

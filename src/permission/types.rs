//! Types for spend-permission validation.

use crate::permission::error::ValidationErrorCode;
use alloy::primitives::{address, Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Token identifier the spend-permission manager uses for the chain's native asset.
pub const NATIVE_TOKEN: Address = address!("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Largest value representable as `uint48`.
pub const UINT48_MAX: u64 = (1u64 << 48) - 1;

/// A delegated-spending authorization claimed by a caller.
///
/// The account fields are kept as received so that malformed input can be
/// rejected as `INVALID_STRUCTURE` rather than failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendPermission {
    /// Account granting the permission (owns the funds).
    pub account: String,

    /// Account allowed to spend on the grantor's behalf.
    pub spender: String,

    /// Asset covered: a token contract, or [`NATIVE_TOKEN`].
    pub token: String,

    /// Maximum spend per period, in the asset's smallest unit. Must fit `uint160`.
    pub allowance: U256,

    /// Length of one allowance period in seconds. Must fit `uint48`.
    pub period: u64,

    /// First second (inclusive) the permission is usable.
    #[serde(default)]
    pub start: Option<u64>,

    /// Last second (inclusive) the permission is usable.
    #[serde(default)]
    pub end: Option<u64>,

    /// Nonce distinguishing otherwise identical permissions.
    pub salt: U256,

    /// Opaque signed bytes; not interpreted here.
    #[serde(default)]
    pub extra_data: Bytes,

    /// Grantor's EIP-712 signature over the fields above.
    #[serde(default)]
    pub signature: Option<Bytes>,
}

impl SpendPermission {
    /// Parse the grantor account, if well-formed.
    pub fn account_address(&self) -> Option<Address> {
        parse_address(&self.account)
    }

    /// Parse the delegate account, if well-formed.
    pub fn spender_address(&self) -> Option<Address> {
        parse_address(&self.spender)
    }

    /// Parse the asset identifier, if well-formed.
    pub fn token_address(&self) -> Option<Address> {
        parse_address(&self.token)
    }

    /// Whether the permission covers the chain's native asset.
    pub fn is_native_token(&self) -> bool {
        self.token_address() == Some(NATIVE_TOKEN)
    }

    pub fn is_signed(&self) -> bool {
        self.signature.as_ref().is_some_and(|sig| !sig.is_empty())
    }

    /// Start of the validity window as signed (`0` when absent).
    pub fn effective_start(&self) -> u64 {
        self.start.unwrap_or(0)
    }

    /// End of the validity window as signed (`uint48::MAX` when absent).
    pub fn effective_end(&self) -> u64 {
        self.end.unwrap_or(UINT48_MAX)
    }

    /// The allowance period containing `now`.
    ///
    /// Returns `None` when the period is zero or `now` lies outside the
    /// validity window.
    pub fn current_period(&self, now: u64) -> Option<PeriodWindow> {
        let start = self.effective_start();
        let end = self.effective_end();
        if self.period == 0 || now < start || now > end {
            return None;
        }

        let elapsed_periods = (now - start) / self.period;
        let period_start = start + elapsed_periods * self.period;
        let period_end = period_start.saturating_add(self.period).min(end);

        Some(PeriodWindow {
            start: period_start,
            end: period_end,
        })
    }
}

/// Parse a hex account identifier into its canonical 20-byte form.
///
/// Case is ignored; EIP-55 checksums are not enforced.
pub fn parse_address(value: &str) -> Option<Address> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<Address>().ok()
}

/// One allowance period, `[start, end)` in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub start: u64,
    pub end: u64,
}

/// Advisory detail attached to a validation verdict.
///
/// Not authoritative spend accounting; that belongs to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationDetails {
    pub remaining_allowance: Option<U256>,
    pub is_expired: bool,
    pub is_active: bool,
    pub current_period: Option<PeriodWindow>,
}

impl Default for ValidationDetails {
    fn default() -> Self {
        Self {
            remaining_allowance: None,
            is_expired: false,
            is_active: true,
            current_period: None,
        }
    }
}

/// Outcome of validating one permission against a claimed (grantor, delegate) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error_reason: Option<ValidationErrorCode>,
    pub message: Option<String>,
    pub details: ValidationDetails,
}

impl ValidationResult {
    /// Successful verdict.
    pub fn valid(remaining_allowance: U256, current_period: Option<PeriodWindow>) -> Self {
        Self {
            is_valid: true,
            error_reason: None,
            message: None,
            details: ValidationDetails {
                remaining_allowance: Some(remaining_allowance),
                is_expired: false,
                is_active: true,
                current_period,
            },
        }
    }

    /// Negative verdict carrying the code's safe description.
    pub fn invalid(code: ValidationErrorCode) -> Self {
        Self {
            is_valid: false,
            error_reason: Some(code),
            message: Some(code.description().to_string()),
            details: ValidationDetails::default(),
        }
    }

    pub fn expired() -> Self {
        let mut result = Self::invalid(ValidationErrorCode::Expired);
        result.details.is_expired = true;
        result.details.is_active = false;
        result
    }

    pub fn not_yet_active() -> Self {
        let mut result = Self::invalid(ValidationErrorCode::NotYetActive);
        result.details.is_active = false;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission() -> SpendPermission {
        SpendPermission {
            account: format!("{:#x}", Address::repeat_byte(0xAA)),
            spender: format!("{:#x}", Address::repeat_byte(0xBB)),
            token: NATIVE_TOKEN.to_string(),
            allowance: U256::from(10_000u64),
            period: 86_400,
            start: Some(1_000),
            end: Some(1_000 + 10 * 86_400),
            salt: U256::from(7u64),
            extra_data: Bytes::new(),
            signature: None,
        }
    }

    #[test]
    fn test_parse_address_ignores_case() {
        let lower = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";
        let upper = "0xEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEE";
        assert_eq!(parse_address(lower), Some(NATIVE_TOKEN));
        assert_eq!(parse_address(upper), Some(NATIVE_TOKEN));
        assert_eq!(parse_address(""), None);
        assert_eq!(parse_address("0x1234"), None);
        assert_eq!(parse_address("not-an-address"), None);
    }

    #[test]
    fn test_native_token_detection() {
        let mut p = permission();
        assert!(p.is_native_token());
        p.token = format!("{:#x}", Address::repeat_byte(0x11));
        assert!(!p.is_native_token());
    }

    #[test]
    fn test_current_period() {
        let p = permission();
        assert_eq!(
            p.current_period(1_000),
            Some(PeriodWindow {
                start: 1_000,
                end: 1_000 + 86_400
            })
        );
        assert_eq!(
            p.current_period(1_000 + 86_400 + 5),
            Some(PeriodWindow {
                start: 1_000 + 86_400,
                end: 1_000 + 2 * 86_400
            })
        );
        assert_eq!(p.current_period(999), None);
    }

    #[test]
    fn test_current_period_clamped_to_end() {
        let mut p = permission();
        p.end = Some(1_000 + 100);
        assert_eq!(
            p.current_period(1_050),
            Some(PeriodWindow {
                start: 1_000,
                end: 1_100
            })
        );
    }

    #[test]
    fn test_unsigned_and_empty_signature() {
        let mut p = permission();
        assert!(!p.is_signed());
        p.signature = Some(Bytes::new());
        assert!(!p.is_signed());
        p.signature = Some(Bytes::from(vec![1u8; 65]));
        assert!(p.is_signed());
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{
            "account": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "spender": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
            "token": "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE",
            "allowance": "0x2710",
            "period": 86400,
            "start": 100,
            "end": 200,
            "salt": "0x7",
            "extraData": "0x"
        }"#;
        let p: SpendPermission = serde_json::from_str(json).unwrap();
        assert_eq!(p.allowance, U256::from(10_000u64));
        assert_eq!(p.salt, U256::from(7u64));
        assert_eq!(p.start, Some(100));
        assert!(p.signature.is_none());
        assert_eq!(p.account_address(), Some(Address::repeat_byte(0xAA)));
    }

    #[test]
    fn test_result_constructors() {
        let expired = ValidationResult::expired();
        assert!(!expired.is_valid);
        assert!(expired.details.is_expired);
        assert_eq!(expired.error_reason, Some(ValidationErrorCode::Expired));

        let pending = ValidationResult::not_yet_active();
        assert!(!pending.details.is_active);
        assert!(!pending.details.is_expired);

        let ok = ValidationResult::valid(U256::from(5u64), None);
        assert!(ok.is_valid);
        assert_eq!(ok.details.remaining_allowance, Some(U256::from(5u64)));
    }
}

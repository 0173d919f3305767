//! Structural and temporal checks on a spend permission.
//!
//! Pure and synchronous. Checks run cheapest first and stop at the first failure.

use crate::permission::error::ValidationErrorCode;
use crate::permission::types::{parse_address, SpendPermission, ValidationResult, UINT48_MAX};
use alloy::primitives::aliases::U160;
use alloy::primitives::U256;

/// Check that `permission` is well-formed, matches the claimed parties and is
/// usable at `now`.
///
/// Returns `None` when every check passes and the pipeline should continue.
pub fn check_structural_validity(
    permission: &SpendPermission,
    expected_grantor: &str,
    expected_delegate: &str,
    now: u64,
) -> Option<ValidationResult> {
    if !is_well_formed(permission) {
        return Some(ValidationResult::invalid(
            ValidationErrorCode::InvalidStructure,
        ));
    }

    if !same_account(&permission.account, expected_grantor) {
        return Some(ValidationResult::invalid(ValidationErrorCode::AccountMismatch));
    }

    if !same_account(&permission.spender, expected_delegate) {
        return Some(ValidationResult::invalid(
            ValidationErrorCode::DelegateMismatch,
        ));
    }

    if permission.end.is_some_and(|end| end < now) {
        return Some(ValidationResult::expired());
    }

    if permission.start.is_some_and(|start| start > now) {
        return Some(ValidationResult::not_yet_active());
    }

    if permission.allowance.is_zero() {
        return Some(ValidationResult::invalid(ValidationErrorCode::ZeroAllowance));
    }

    if permission.period == 0 {
        return Some(ValidationResult::invalid(ValidationErrorCode::ZeroPeriod));
    }

    None
}

/// Canonical (case-insensitive, 20-byte) account comparison.
///
/// A malformed identifier on either side never matches.
pub fn same_account(a: &str, b: &str) -> bool {
    match (parse_address(a), parse_address(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn is_well_formed(permission: &SpendPermission) -> bool {
    if permission.account_address().is_none()
        || permission.spender_address().is_none()
        || permission.token_address().is_none()
    {
        return false;
    }

    if permission.allowance > U256::from(U160::MAX) {
        return false;
    }

    let fits_uint48 = |v: Option<u64>| v.map_or(true, |v| v <= UINT48_MAX);
    if !fits_uint48(Some(permission.period))
        || !fits_uint48(permission.start)
        || !fits_uint48(permission.end)
    {
        return false;
    }

    match (permission.start, permission.end) {
        (Some(start), Some(end)) => start <= end,
        _ => true,
    }
}

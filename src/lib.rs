//! Off-chain validation of delegated spend permissions.
//!
//! An automated agent acting on a user's behalf (placing a bet, say) presents
//! a spend permission the user signed earlier. Before the action is trusted,
//! [`permission::PermissionValidator::validate`] checks the permission's
//! structure, validity window, EIP-712 signature and the grantor's on-chain
//! balance, caching verdicts for a short freshness window.

pub mod config;

// Spend-permission validation core
pub mod permission;

// HTTP boundary
pub mod modules;

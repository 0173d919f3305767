//! Ledger probe corroborating that a permission is currently honorable.
//!
//! The balance check is a heuristic solvency signal, not spend accounting:
//! funds can move between the probe and the actual spend. It sits behind
//! [`ChainProber`] so an authoritative allowance-accounting check can replace it.

use crate::permission::error::ProbeError;
use crate::permission::types::{SpendPermission, NATIVE_TOKEN};
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use log::{debug, info};

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
    }
}

/// Result of a ledger probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The grantor's balance covers the allowance.
    Confirmed { balance: U256 },

    /// The grantor's balance is below the allowance.
    Insufficient { balance: U256 },

    /// The ledger could not be queried; nothing is known.
    Inconclusive { reason: String },
}

/// Read-only ledger query used by the validator.
#[async_trait]
pub trait ChainProber: Send + Sync {
    /// Check whether on-chain state supports `permission`.
    ///
    /// Must not panic on I/O failure; report it as [`ProbeOutcome::Inconclusive`].
    async fn probe(&self, permission: &SpendPermission) -> ProbeOutcome;
}

/// Classify a fetched balance against the permission's allowance.
pub fn classify_balance(balance: U256, allowance: U256) -> ProbeOutcome {
    if balance >= allowance {
        ProbeOutcome::Confirmed { balance }
    } else {
        ProbeOutcome::Insufficient { balance }
    }
}

/// Balance prober over a JSON-RPC provider.
///
/// Native-asset permissions query `eth_getBalance`; token permissions call
/// `balanceOf` on the token contract.
pub struct RpcBalanceProber<P> {
    provider: P,
    rpc_url: String,
}

impl RpcBalanceProber<DynProvider> {
    /// Build a prober over an HTTP JSON-RPC endpoint.
    ///
    /// No request is sent until the first probe.
    pub fn connect_http(rpc_url: &str) -> Result<Self, ProbeError> {
        let url = rpc_url
            .parse::<Url>()
            .map_err(|e| ProbeError::ConnectionFailed {
                url: rpc_url.to_string(),
                reason: e.to_string(),
            })?;

        info!("Using chain RPC at {}", rpc_url);
        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self::new(provider, rpc_url.to_string()))
    }
}

impl<P> RpcBalanceProber<P>
where
    P: Provider + Clone,
{
    pub fn new(provider: P, rpc_url: String) -> Self {
        Self { provider, rpc_url }
    }

    /// Current balance of `owner` in `token` (or the native asset).
    pub async fn fetch_balance(&self, owner: Address, token: Address) -> Result<U256, ProbeError> {
        if token == NATIVE_TOKEN {
            self.provider
                .get_balance(owner)
                .await
                .map_err(|e| ProbeError::RpcError(e.to_string()))
        } else {
            IERC20::new(token, self.provider.clone())
                .balanceOf(owner)
                .call()
                .await
                .map_err(|e| ProbeError::RpcError(e.to_string()))
        }
    }

    async fn probe_inner(&self, permission: &SpendPermission) -> Result<ProbeOutcome, ProbeError> {
        let owner = permission
            .account_address()
            .ok_or_else(|| ProbeError::InvalidAddress {
                field: "account",
                value: permission.account.clone(),
            })?;
        let token = permission
            .token_address()
            .ok_or_else(|| ProbeError::InvalidAddress {
                field: "token",
                value: permission.token.clone(),
            })?;

        let balance = self.fetch_balance(owner, token).await?;
        debug!(
            "Balance of {} in {}: {} (allowance {})",
            owner, token, balance, permission.allowance
        );

        Ok(classify_balance(balance, permission.allowance))
    }
}

#[async_trait]
impl<P> ChainProber for RpcBalanceProber<P>
where
    P: Provider + Clone + Send + Sync,
{
    async fn probe(&self, permission: &SpendPermission) -> ProbeOutcome {
        match self.probe_inner(permission).await {
            Ok(outcome) => outcome,
            Err(e) => ProbeOutcome::Inconclusive {
                reason: e.to_string(),
            },
        }
    }
}

impl<P> std::fmt::Debug for RpcBalanceProber<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcBalanceProber")
            .field("rpc_url", &self.rpc_url)
            .finish()
    }
}

//! EIP-712 signature verification for spend permissions.
//!
//! The typed-data schema and domain must match the wallet that produced the
//! signature exactly; any difference makes every signature fail to verify.

use crate::permission::types::{SpendPermission, UINT48_MAX};
use alloy::primitives::aliases::{U160, U48};
use alloy::primitives::{address, Address, Signature, B256, U256};
use alloy::sol_types::{eip712_domain, Eip712Domain, SolStruct};
use log::debug;

pub mod eip712 {
    use alloy::sol;

    sol! {
        /// Typed-data payload signed by the grantor.
        #[derive(Debug, PartialEq, Eq)]
        struct SpendPermission {
            address account;
            address spender;
            address token;
            uint160 allowance;
            uint48 period;
            uint48 start;
            uint48 end;
            uint256 salt;
            bytes extraData;
        }
    }
}

/// Spend Permission Manager deployment on Base.
pub const DEFAULT_VERIFYING_CONTRACT: Address =
    address!("0xf85210B21cC50302F477BA56686d2019dC9b67Ad");

/// Base mainnet.
pub const DEFAULT_CHAIN_ID: u64 = 8453;

/// Parameters of the EIP-712 domain the grantor signed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Default for SigningDomain {
    fn default() -> Self {
        Self {
            name: "Spend Permission Manager".to_string(),
            version: "1".to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            verifying_contract: DEFAULT_VERIFYING_CONTRACT,
        }
    }
}

impl SigningDomain {
    pub fn eip712_domain(&self) -> Eip712Domain {
        eip712_domain! {
            name: self.name.clone(),
            version: self.version.clone(),
            chain_id: self.chain_id,
            verifying_contract: self.verifying_contract,
        }
    }
}

/// Stateless verifier recovering the signer of a spend permission.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    domain: Eip712Domain,
}

impl SignatureVerifier {
    pub fn new(domain: &SigningDomain) -> Self {
        Self {
            domain: domain.eip712_domain(),
        }
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    /// Build the typed-data struct exactly as the wallet signed it.
    ///
    /// Returns `None` if any field cannot be represented in its Solidity type.
    pub fn typed_data(&self, permission: &SpendPermission) -> Option<eip712::SpendPermission> {
        Some(eip712::SpendPermission {
            account: permission.account_address()?,
            spender: permission.spender_address()?,
            token: permission.token_address()?,
            allowance: to_uint160(permission.allowance)?,
            period: to_uint48(permission.period)?,
            start: to_uint48(permission.effective_start())?,
            end: to_uint48(permission.effective_end())?,
            salt: permission.salt,
            extraData: permission.extra_data.clone(),
        })
    }

    /// EIP-712 signing hash of the permission payload.
    pub fn signing_hash(&self, permission: &SpendPermission) -> Option<B256> {
        self.typed_data(permission)
            .map(|typed| typed.eip712_signing_hash(&self.domain))
    }

    /// Recover the account that signed the permission.
    pub fn recover_signer(&self, permission: &SpendPermission) -> Option<Address> {
        let raw = permission.signature.as_ref()?;
        let signature = parse_signature(raw)?;
        let hash = self.signing_hash(permission)?;
        signature.recover_address_from_prehash(&hash).ok()
    }

    /// Whether the permission was signed by its own `account`.
    ///
    /// Malformed input of any kind yields `false`.
    pub fn verify_signature(&self, permission: &SpendPermission) -> bool {
        let Some(expected) = permission.account_address() else {
            return false;
        };
        match self.recover_signer(permission) {
            Some(recovered) if recovered == expected => true,
            Some(recovered) => {
                debug!(
                    "Recovered signer {} does not match grantor {}",
                    recovered, expected
                );
                false
            }
            None => false,
        }
    }
}

/// Accepts 65-byte `(r, s, v)` and 64-byte ERC-2098 compact signatures.
fn parse_signature(bytes: &[u8]) -> Option<Signature> {
    match bytes.len() {
        65 => Signature::from_raw(bytes).ok().map(|s| s.normalized_s()),
        64 => Some(Signature::from_erc2098(bytes).normalized_s()),
        _ => None,
    }
}

fn to_uint160(value: U256) -> Option<U160> {
    if value > U256::from(U160::MAX) {
        return None;
    }
    let limbs = value.as_limbs();
    Some(U160::from_limbs([limbs[0], limbs[1], limbs[2]]))
}

fn to_uint48(value: u64) -> Option<U48> {
    if value > UINT48_MAX {
        return None;
    }
    Some(U48::from(value))
}

//! Off-chain spend-permission validation.
//!
//! Decides whether a previously granted spend permission ("agent X may spend
//! up to N of my tokens per period, between start and end") currently
//! authorizes a delegated action, without a chain round-trip on every request.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌───────────────┐
//! │   checker    │   │ SignatureVerifier│   │  ChainProber  │
//! │ (structure,  │   │    (EIP-712)     │   │ (balance via  │
//! │  window)     │   │                  │   │  JSON-RPC)    │
//! └──────┬───────┘   └────────┬─────────┘   └───────┬───────┘
//!        │                    │                     │
//!        ▼                    ▼                     ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │          SpendPermissionValidator (orchestrator)         │
//! └───────────────────────────┬─────────────────────────────┘
//!                             │
//!                             ▼
//!                   ┌───────────────────┐
//!                   │  ValidationCache  │
//!                   │   (60s window)    │
//!                   └───────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use spendguard::permission::{
//!     PermissionValidator, RpcBalanceProber, SignatureVerifier, SigningDomain,
//!     SpendPermissionValidator, SystemClock, ValidationCache, ValidationPolicy,
//! };
//!
//! let validator = SpendPermissionValidator::new(
//!     SignatureVerifier::new(&SigningDomain::default()),
//!     Arc::new(RpcBalanceProber::connect_http("https://mainnet.base.org")?),
//!     Arc::new(ValidationCache::default()),
//!     Arc::new(SystemClock),
//!     ValidationPolicy::default(),
//! );
//!
//! let result = validator.validate(&permission, &grantor, &delegate).await;
//! if !result.is_valid {
//!     // deny the delegated action
//! }
//! ```

pub mod cache;
pub mod checker;
pub mod clock;
pub mod error;
pub mod prober;
pub mod signature;
pub mod types;
pub mod validator;

pub use cache::{CacheEntry, CacheKey, ValidationCache};
pub use checker::check_structural_validity;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ProbeError, ValidationErrorCode};
pub use prober::{ChainProber, ProbeOutcome, RpcBalanceProber};
pub use signature::{SignatureVerifier, SigningDomain};
pub use types::{
    PeriodWindow, SpendPermission, ValidationDetails, ValidationResult, NATIVE_TOKEN,
};
pub use validator::{PermissionValidator, SpendPermissionValidator, ValidationPolicy};

//! Spend-permission validator.
//!
//! Composes the structural checker, signature verifier, ledger prober and
//! verdict cache behind a single entry point the bet-execution boundary calls
//! before trusting a delegated action.

use crate::permission::cache::{
    CacheKey, ValidationCache, DEFAULT_FRESHNESS_SECONDS, DEFAULT_NEGATIVE_FRESHNESS_SECONDS,
};
use crate::permission::checker::{check_structural_validity, same_account};
use crate::permission::clock::Clock;
use crate::permission::error::ValidationErrorCode;
use crate::permission::prober::{ChainProber, ProbeOutcome};
use crate::permission::signature::SignatureVerifier;
use crate::permission::types::{SpendPermission, ValidationResult};
use async_trait::async_trait;
use futures_util::FutureExt;
use log::{debug, error, info, warn};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on a single ledger probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Trait for spend-permission validation.
///
/// Implementations never fail: every problem, including internal faults,
/// resolves to a `ValidationResult` with `is_valid == false`.
#[async_trait]
pub trait PermissionValidator: Send + Sync {
    /// Validate `permission` for the claimed grantor and delegate.
    ///
    /// Steps:
    /// 1. Fresh cached verdict, if any
    /// 2. Structure, identities and validity window
    /// 3. Signature present
    /// 4. Signature recovers to the grantor
    /// 5. Grantor balance covers the allowance (inconclusive probes pass)
    async fn validate(
        &self,
        permission: &SpendPermission,
        grantor: &str,
        delegate: &str,
    ) -> ValidationResult;
}

/// Cache windows and probe bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Seconds a successful verdict is served from cache.
    pub freshness_window: u64,

    /// Seconds a cacheable negative verdict is served from cache.
    /// Never longer than `freshness_window`.
    pub negative_freshness_window: u64,

    pub probe_timeout: Duration,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            freshness_window: DEFAULT_FRESHNESS_SECONDS,
            negative_freshness_window: DEFAULT_NEGATIVE_FRESHNESS_SECONDS,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Default [`PermissionValidator`] implementation.
pub struct SpendPermissionValidator {
    verifier: SignatureVerifier,
    prober: Arc<dyn ChainProber>,
    cache: Arc<ValidationCache>,
    clock: Arc<dyn Clock>,
    policy: ValidationPolicy,
}

impl SpendPermissionValidator {
    pub fn new(
        verifier: SignatureVerifier,
        prober: Arc<dyn ChainProber>,
        cache: Arc<ValidationCache>,
        clock: Arc<dyn Clock>,
        mut policy: ValidationPolicy,
    ) -> Self {
        policy.negative_freshness_window = policy
            .negative_freshness_window
            .min(policy.freshness_window);

        Self {
            verifier,
            prober,
            cache,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Everything after the cache lookup.
    async fn run_pipeline(
        &self,
        permission: &SpendPermission,
        grantor: &str,
        delegate: &str,
        now: u64,
        key: Option<CacheKey>,
    ) -> ValidationResult {
        // 1. Structure, identities, window
        if let Some(result) = check_structural_validity(permission, grantor, delegate, now) {
            warn!(
                "Spend permission {} -> {} rejected: {}",
                permission.account,
                permission.spender,
                result
                    .error_reason
                    .unwrap_or(ValidationErrorCode::InvalidStructure)
            );
            // Only a payload the grantor actually signed may shape the
            // verdict cached for its (grantor, delegate, asset) triple.
            if let (Some(key), Some(code)) = (key, result.error_reason) {
                if code.is_cacheable() && self.verifier.verify_signature(permission) {
                    let ttl = self.negative_ttl(code, permission, now);
                    self.cache.put(key, result.clone(), now, ttl).await;
                }
            }
            return result;
        }

        // 2. Signature present
        if !permission.is_signed() {
            debug!(
                "Spend permission {} -> {} is unsigned",
                permission.account, permission.spender
            );
            return ValidationResult::invalid(ValidationErrorCode::SignatureRequired);
        }

        // 3. Signature recovers to the grantor
        if !self.verifier.verify_signature(permission) {
            warn!(
                "Signature verification failed for spend permission {} -> {}",
                permission.account, permission.spender
            );
            return ValidationResult::invalid(ValidationErrorCode::InvalidSignature);
        }

        // 4. Ledger probe
        let outcome = tokio::time::timeout(self.policy.probe_timeout, self.prober.probe(permission))
            .await
            .unwrap_or_else(|_| ProbeOutcome::Inconclusive {
                reason: format!("probe timed out after {:?}", self.policy.probe_timeout),
            });

        match outcome {
            ProbeOutcome::Insufficient { balance } => {
                warn!(
                    "Grantor {} balance {} below allowance {}",
                    permission.account, balance, permission.allowance
                );
                return ValidationResult::invalid(ValidationErrorCode::InsufficientBalance);
            }
            ProbeOutcome::Inconclusive { reason } => {
                // Policy: an unreachable ledger does not deny the action.
                warn!(
                    "Balance probe inconclusive for {}, proceeding: {}",
                    permission.account, reason
                );
            }
            ProbeOutcome::Confirmed { balance } => {
                debug!("Grantor {} balance {} confirmed", permission.account, balance);
            }
        }

        // 5. Success
        let result =
            ValidationResult::valid(permission.allowance, permission.current_period(now));
        if let Some(key) = key {
            let ttl = self.positive_ttl(permission, now);
            self.cache.put(key, result.clone(), now, ttl).await;
        }

        info!(
            "Spend permission {} -> {} validated, allowance {}",
            permission.account, permission.spender, permission.allowance
        );
        result
    }

    /// A successful verdict never outlives the permission's end.
    fn positive_ttl(&self, permission: &SpendPermission, now: u64) -> u64 {
        match permission.end {
            Some(end) => self.policy.freshness_window.min(end.saturating_sub(now)),
            None => self.policy.freshness_window,
        }
    }

    /// A not-yet-active verdict goes stale by the time the permission starts.
    fn negative_ttl(&self, code: ValidationErrorCode, permission: &SpendPermission, now: u64) -> u64 {
        let ttl = self.policy.negative_freshness_window;
        match (code, permission.start) {
            (ValidationErrorCode::NotYetActive, Some(start)) => {
                ttl.min(start.saturating_sub(now).saturating_sub(1))
            }
            _ => ttl,
        }
    }
}

#[async_trait]
impl PermissionValidator for SpendPermissionValidator {
    async fn validate(
        &self,
        permission: &SpendPermission,
        grantor: &str,
        delegate: &str,
    ) -> ValidationResult {
        let now = self.clock.now();

        // Cached verdicts are only served to signed permissions whose parties
        // match the claimed identities.
        let key = (permission.is_signed()
            && same_account(&permission.account, grantor)
            && same_account(&permission.spender, delegate))
        .then(|| CacheKey::for_permission(permission));

        if let Some(key) = &key {
            if let Some(entry) = self.cache.get(key, now).await {
                debug!(
                    "Cache hit for {} -> {} ({})",
                    key.grantor, key.delegate, key.asset
                );
                let mut result = entry.result;
                if result.is_valid {
                    result.details.current_period = permission.current_period(now);
                }
                return result;
            }
            debug!(
                "Cache miss for {} -> {} ({})",
                key.grantor, key.delegate, key.asset
            );
        }

        let pipeline = self.run_pipeline(permission, grantor, delegate, now, key);
        match AssertUnwindSafe(pipeline).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Internal fault validating spend permission {} -> {}",
                    permission.account, permission.spender
                );
                ValidationResult::invalid(ValidationErrorCode::ValidationException)
            }
        }
    }
}

use crate::permission::{
    PeriodWindow, PermissionValidator, SpendPermission, ValidationErrorCode, ValidationResult,
};
use alloy::primitives::U256;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Server state shared with the authorization endpoint
pub struct AuthorizeState {
    pub validator: Arc<dyn PermissionValidator>,
}

/// Delegated-action authorization request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeRequest {
    pub permission: SpendPermission,
    pub grantor: String,
    pub delegate: String,
}

/// Granted authorization
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub authorized: bool,
    pub remaining_allowance: Option<U256>,
    pub current_period: Option<PeriodWindow>,
}

/// Denied authorization. Carries only the code and its safe message.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Denial {
    pub error: ValidationErrorCode,
    pub message: String,
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        (StatusCode::FORBIDDEN, Json(self)).into_response()
    }
}

/// Turn a verdict into an authorization decision.
///
/// Every invalid verdict denies, whatever its code.
pub fn authorize(result: &ValidationResult) -> Result<Authorization, Denial> {
    if result.is_valid {
        return Ok(Authorization {
            authorized: true,
            remaining_allowance: result.details.remaining_allowance,
            current_period: result.details.current_period,
        });
    }

    let code = result
        .error_reason
        .unwrap_or(ValidationErrorCode::ValidationException);
    Err(Denial {
        error: code,
        message: code.description().to_string(),
    })
}

/// Delegated-action authorization endpoint
/// POST /v1/spend-permissions/authorize
pub async fn authorize_handler(
    State(state): State<Arc<AuthorizeState>>,
    Json(request): Json<AuthorizeRequest>,
) -> Result<Json<Authorization>, Denial> {
    info!(
        "Authorization request: grantor {} delegate {}",
        request.grantor, request.delegate
    );

    let result = state
        .validator
        .validate(&request.permission, &request.grantor, &request.delegate)
        .await;

    match authorize(&result) {
        Ok(authorization) => Ok(Json(authorization)),
        Err(denial) => {
            warn!(
                "Denied delegated action for grantor {}: {}",
                request.grantor, denial.error
            );
            Err(denial)
        }
    }
}

/// GET /healthz
pub async fn health_handler() -> &'static str {
    "ok"
}

pub fn router(state: Arc<AuthorizeState>) -> Router {
    Router::new()
        .route("/v1/spend-permissions/authorize", post(authorize_handler))
        .route("/healthz", get(health_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedValidator(ValidationResult);

    #[async_trait]
    impl PermissionValidator for FixedValidator {
        async fn validate(
            &self,
            _permission: &SpendPermission,
            _grantor: &str,
            _delegate: &str,
        ) -> ValidationResult {
            self.0.clone()
        }
    }

    fn request() -> AuthorizeRequest {
        let json = r#"{
            "permission": {
                "account": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                "spender": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
                "token": "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE",
                "allowance": "0x2710",
                "period": 86400,
                "salt": "0x1"
            },
            "grantor": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "delegate": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_every_code_denies_uniformly() {
        for code in ValidationErrorCode::ALL {
            let denial = authorize(&ValidationResult::invalid(code)).unwrap_err();
            assert_eq!(denial.error, code);
            assert_eq!(denial.message, code.description());
            assert_eq!(denial.into_response().status(), StatusCode::FORBIDDEN);
        }
    }

    #[test]
    fn test_invalid_without_reason_still_denies() {
        let mut result = ValidationResult::invalid(ValidationErrorCode::Expired);
        result.error_reason = None;
        let denial = authorize(&result).unwrap_err();
        assert_eq!(denial.error, ValidationErrorCode::ValidationException);
    }

    #[test]
    fn test_valid_authorizes() {
        let authorization =
            authorize(&ValidationResult::valid(U256::from(10_000u64), None)).unwrap();
        assert!(authorization.authorized);
        assert_eq!(authorization.remaining_allowance, Some(U256::from(10_000u64)));
    }

    #[test]
    fn test_denial_body_shape() {
        let denial = authorize(&ValidationResult::invalid(
            ValidationErrorCode::DelegateMismatch,
        ))
        .unwrap_err();
        let body = serde_json::to_value(&denial).unwrap();
        assert_eq!(body["error"], "DELEGATE_MISMATCH");
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_handler_status_codes() {
        let allow = Arc::new(AuthorizeState {
            validator: Arc::new(FixedValidator(ValidationResult::valid(
                U256::from(10_000u64),
                None,
            ))),
        });
        let response = authorize_handler(State(allow), Json(request()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let deny = Arc::new(AuthorizeState {
            validator: Arc::new(FixedValidator(ValidationResult::invalid(
                ValidationErrorCode::InsufficientBalance,
            ))),
        });
        let response = authorize_handler(State(deny), Json(request()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

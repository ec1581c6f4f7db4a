//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::{CheckoutError, ValidationError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request the checkout services never saw.
    BadRequest(String),
    /// Checkout, cart or settlement failure.
    Checkout(CheckoutError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::Checkout(err) => checkout_error_to_response(err),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, serde_json::Value) {
    let status = match &err {
        CheckoutError::Validation(v) => validation_status(v),
        CheckoutError::Conflict(_) => StatusCode::CONFLICT,
        CheckoutError::Persistence(_)
        | CheckoutError::GatewayUnavailable(_)
        | CheckoutError::Service(_) => StatusCode::SERVICE_UNAVAILABLE,
        CheckoutError::GatewayRejected(_) => StatusCode::BAD_GATEWAY,
        CheckoutError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!(error = %err, status = status.as_u16(), "request failed");
    }

    let mut body = serde_json::json!({ "error": err.to_string() });
    if let CheckoutError::GatewayRejected(rejection) = &err {
        body["errors"] = serde_json::json!(rejection.error_list());
    }
    (status, body)
}

fn validation_status(err: &ValidationError) -> StatusCode {
    if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if err.is_conflict() {
        StatusCode::CONFLICT
    } else {
        StatusCode::BAD_REQUEST
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Checkout(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CartId, OrderId};
    use payment::GatewayBusinessError;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(ValidationError::CartNotFound(CartId::new())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ValidationError::PaymentSessionRequired),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CheckoutError::Conflict("stale".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ValidationError::CartAlreadyOrdered {
                cart_id: CartId::new(),
                order_id: OrderId::new(),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CheckoutError::Persistence("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(CheckoutError::GatewayRejected(GatewayBusinessError::new("no"))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(CheckoutError::Internal("bug".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ApiError::BadRequest("bad id".into())),
            StatusCode::BAD_REQUEST
        );
    }
}

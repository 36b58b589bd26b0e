use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockledger_core::DomainError;
use stockledger_infra::LedgerError;

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::Domain(e) => domain_error_to_response(e),
        LedgerError::Store(e) => {
            tracing::error!(error = %e, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage failure")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::InvalidArgument(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_argument", message)
        }
        DomainError::InvalidReference(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_reference", message)
        }
        DomainError::InvalidTransition(_) => {
            json_error(StatusCode::CONFLICT, "invalid_transition", message)
        }
        DomainError::WrongKind(_) => json_error(StatusCode::CONFLICT, "wrong_kind", message),
        DomainError::ExceedsStock {
            requested,
            remaining,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({
                "error": "exceeds_stock",
                "message": message,
                "requested": requested,
                "remaining": remaining,
            })),
        )
            .into_response(),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        DomainError::InvariantViolation(_) => {
            tracing::error!(error = %message, "invariant violation");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "invariant_violation",
                message,
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path id, answering `400 invalid_id` on garbage.
pub fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, axum::response::Response> {
    raw.parse::<T>().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("invalid {what} id"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn domain_errors_map_to_documented_statuses() {
        let cases = [
            (DomainError::not_found(), StatusCode::NOT_FOUND),
            (DomainError::invalid_argument("x"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_reference("x"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_transition("x"), StatusCode::CONFLICT),
            (DomainError::wrong_kind("x"), StatusCode::CONFLICT),
            (
                DomainError::exceeds_stock(Decimal::from(5), Decimal::from(3)),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (DomainError::conflict("x"), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(domain_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn store_errors_are_500() {
        let err = LedgerError::Store(stockledger_infra::StoreError::LockPoisoned);
        assert_eq!(
            ledger_error_to_response(err).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

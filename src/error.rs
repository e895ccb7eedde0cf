//! Error types for the exchange service and its HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store;

/// Failures of [`crate::SessionExchange`] operations.
///
/// The three variants line up with the three outcomes a caller has to tell
/// apart: its own mistake, an unknown or expired identifier, and a backend
/// failure that might succeed later.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// A required identifier or code was missing or blank. Nothing was written.
    #[error("identifier and code are required")]
    MissingFields,

    /// No live code exists for this key.
    #[error("no live code for {0}")]
    NotFound(String),

    /// The store failed the operation.
    #[error(transparent)]
    Store(#[from] store::Error),
}

/// Response texts for one family of endpoints.
///
/// The deep-link and session endpoints return different wording for the same
/// failures, and existing clients match on it.
#[derive(Debug, Clone, Copy)]
pub struct ErrorText {
    pub missing_fields: &'static str,
    pub not_found: &'static str,
    pub store_failed: &'static str,
    pub lookup_failed: &'static str,
}

/// Which side of the exchange a request was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Save,
    Lookup,
}

/// An HTTP error rendered as `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }

    /// Maps a service error to its status code and the endpoint's wording.
    pub fn from_exchange(error: ExchangeError, operation: Operation, text: &ErrorText) -> Self {
        match (error, operation) {
            (ExchangeError::MissingFields, _) => {
                Self::new(StatusCode::BAD_REQUEST, text.missing_fields)
            }
            (ExchangeError::NotFound(_), _) => Self::new(StatusCode::NOT_FOUND, text.not_found),
            (ExchangeError::Store(_), Operation::Save) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, text.store_failed)
            }
            (ExchangeError::Store(_), Operation::Lookup) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, text.lookup_failed)
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: ErrorText = ErrorText {
        missing_fields: "missing",
        not_found: "gone",
        store_failed: "broken",
        lookup_failed: "unreadable",
    };

    #[test]
    fn maps_exchange_errors_to_status_codes() {
        let cases = [
            (ExchangeError::MissingFields, StatusCode::BAD_REQUEST),
            (
                ExchangeError::NotFound("session:x".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                ExchangeError::Store(store::Error::Backend("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(
                ApiError::from_exchange(error, Operation::Save, &TEXT).status(),
                status
            );
        }
    }

    #[test]
    fn read_failures_use_lookup_wording() {
        let down = || ExchangeError::Store(store::Error::Backend("down".into()));

        let save = ApiError::from_exchange(down(), Operation::Save, &TEXT);
        assert_eq!(save.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(save.message, "broken");

        let lookup = ApiError::from_exchange(down(), Operation::Lookup, &TEXT);
        assert_eq!(lookup.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(lookup.message, "unreadable");
    }

    #[tokio::test]
    async fn renders_json_error_body() {
        let response = ApiError::from_exchange(ExchangeError::MissingFields, Operation::Lookup, &TEXT)
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "error": "missing" }));
    }
}

//! Mapping from the service error taxonomy to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use sealbox_model::Error;

#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::AlreadyExists => StatusCode::CONFLICT,
            Error::InputValidation => StatusCode::BAD_REQUEST,
            Error::Unauthorized => StatusCode::FORBIDDEN,
            Error::BadConfig(_) | Error::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }

        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::AlreadyExists, StatusCode::CONFLICT),
            (Error::InputValidation, StatusCode::BAD_REQUEST),
            (Error::Unauthorized, StatusCode::FORBIDDEN),
            (Error::Internal, StatusCode::INTERNAL_SERVER_ERROR),
            (Error::BadConfig("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let response = ApiError(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}

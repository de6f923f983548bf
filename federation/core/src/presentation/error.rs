// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! HTTP error responses. Every error body is `{"error": CODE}` with a stable
//! machine-readable code; internal detail is logged, never returned.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use crate::domain::handshake::HandshakeError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request body could not be decoded: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error("no token supplied")]
    NoToken,

    #[error("token parameter required")]
    TokenRequired,

    #[error("federation block missing from join request")]
    MissingFederation,

    #[error("federation token rejected at join")]
    InvalidFederation,

    #[error("X-Federation-Token header missing")]
    MissingFederationToken,

    #[error("federation token rejected")]
    InvalidFederationToken,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_)
            | ApiError::NoToken
            | ApiError::TokenRequired
            | ApiError::MissingFederation => StatusCode::BAD_REQUEST,
            ApiError::MissingFederationToken => StatusCode::UNAUTHORIZED,
            ApiError::InvalidFederation | ApiError::InvalidFederationToken => StatusCode::FORBIDDEN,
            ApiError::Handshake(e) => match e {
                HandshakeError::MissingFields => StatusCode::BAD_REQUEST,
                HandshakeError::NoChallengeFound
                | HandshakeError::ChallengeTimeout
                | HandshakeError::FingerprintMismatch
                | HandshakeError::InvalidSignature => StatusCode::FORBIDDEN,
                HandshakeError::TokenIssue(_) | HandshakeError::Entropy(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::NoToken => "NO_TOKEN",
            ApiError::TokenRequired => "TOKEN_REQUIRED",
            ApiError::MissingFederation => "MISSING_FEDERATION",
            ApiError::InvalidFederation => "INVALID_FEDERATION",
            ApiError::MissingFederationToken => "MISSING_FEDERATION_TOKEN",
            ApiError::InvalidFederationToken => "INVALID_FEDERATION_TOKEN",
            ApiError::Handshake(e) => match e {
                HandshakeError::MissingFields => "MISSING_FIELDS",
                HandshakeError::NoChallengeFound => "NO_CHALLENGE_FOUND",
                HandshakeError::ChallengeTimeout => "CHALLENGE_TIMEOUT",
                HandshakeError::FingerprintMismatch => "FINGERPRINT_MISMATCH",
                HandshakeError::InvalidSignature => "INVALID_SIGNATURE",
                HandshakeError::TokenIssue(_) | HandshakeError::Entropy(_) => "INTERNAL_ERROR",
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Federation request failed");
        } else {
            debug!(error = %self, code = self.error_code(), "Federation request rejected");
        }

        (status, Json(json!({ "error": self.error_code() }))).into_response()
    }
}

// ABOUTME: REST adapter error types with SNAFU pattern.
// ABOUTME: Keeps hyper and serde sources chained and maps onto the port error enums.

use http::StatusCode;
use snafu::Snafu;

use super::traits::{DiskError, TransferError};

/// Failure talking to the management API over HTTP.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    #[snafu(display("invalid URI {uri}: {source}"))]
    InvalidUri {
        uri: String,
        source: http::uri::InvalidUri,
    },

    #[snafu(display("failed to build request for {uri}: {source}"))]
    BuildRequest { uri: String, source: http::Error },

    #[snafu(display("request to {uri} failed: {source}"))]
    Request {
        uri: String,
        source: hyper_util::client::legacy::Error,
    },

    #[snafu(display("failed to read response from {uri}: {source}"))]
    ReadBody { uri: String, source: hyper::Error },

    #[snafu(display("{uri} returned {status}: {message}"))]
    Status {
        uri: String,
        status: StatusCode,
        message: String,
    },

    #[snafu(display("failed to decode response from {uri}: {source}"))]
    Decode {
        uri: String,
        source: serde_json::Error,
    },

    #[snafu(display("failed to encode request body: {source}"))]
    Encode { source: serde_json::Error },
}

impl ApiError {
    /// HTTP status returned by the remote side, if the request got that far.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn is_rejection(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::FORBIDDEN)
        )
    }
}

impl From<ApiError> for DiskError {
    fn from(err: ApiError) -> Self {
        if err.status() == Some(StatusCode::NOT_FOUND) {
            DiskError::NotFound(err.to_string())
        } else if err.is_rejection() {
            DiskError::Rejected(err.to_string())
        } else {
            DiskError::Api(err.to_string())
        }
    }
}

impl From<ApiError> for TransferError {
    fn from(err: ApiError) -> Self {
        match &err {
            ApiError::Request { .. } | ApiError::ReadBody { .. } => {
                TransferError::Transport(err.to_string())
            }
            _ if err.status() == Some(StatusCode::NOT_FOUND) => {
                TransferError::NotFound(err.to_string())
            }
            _ if err.is_rejection() => TransferError::Rejected(err.to_string()),
            _ => TransferError::Api(err.to_string()),
        }
    }
}

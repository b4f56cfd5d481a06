//! Error types raised by the Open Trivia DB client.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`OpenTriviaError`] failures.
pub type OpenTriviaResult<T> = Result<T, OpenTriviaError>;

/// Failures that can occur while talking to Open Trivia DB.
#[derive(Debug, Error)]
pub enum OpenTriviaError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build Open Trivia DB client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent.
    #[error("failed to send Open Trivia DB request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The API answered with an unexpected HTTP status.
    #[error("unexpected Open Trivia DB response status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// The response payload could not be decoded.
    #[error("failed to decode Open Trivia DB response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
}

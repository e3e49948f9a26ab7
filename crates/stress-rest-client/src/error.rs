// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestError {
    #[error("Request to {0} failed: {1}")]
    Http(String, #[source] reqwest::Error),
    #[error("Request to {url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("Transaction rejected, code: {code}, message: {message}")]
    Rejected { code: String, message: String },
    #[error("Malformed response: {0}")]
    Decode(String),
    #[error("Invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl RestError {
    pub fn decode<E: std::fmt::Display>(error: E) -> Self {
        Self::Decode(error.to_string())
    }

    /// Whether a node rejected the transaction, as opposed to the request
    /// itself failing.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

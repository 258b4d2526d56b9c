//! Error taxonomy shared by every pipeline component.
//!
//! Frontends classify on the variant: [`Error::InvalidRequest`] is the
//! caller's fault, everything else is a server-side failure. An empty
//! keyword series is not an error at all; it surfaces as a `no_data`
//! [`ResultRecord`](crate::models::ResultRecord).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed request fields (unknown granularity, no keywords).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The corpus backend was unreachable or the aggregation query failed.
    #[error("corpus query failed: {0:#}")]
    Corpus(anyhow::Error),

    /// A cache entry could not be read or written.
    #[error("cache access failed: {0:#}")]
    Cache(anyhow::Error),

    /// The chart artifact could not be rendered.
    #[error("chart rendering failed: {0:#}")]
    Chart(anyhow::Error),
}

impl Error {
    /// Truth that the request itself was at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidRequest(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

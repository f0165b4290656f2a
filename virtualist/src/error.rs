//! Error types for slot materialization.

use alloc::string::String;

use thiserror::Error;

/// An error reported by a host callback (factory, update, measurement).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HostError {
    message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum Error {
    /// A configuration option needed for materialization was never provided.
    #[error("missing required option `{0}`")]
    MissingOption(&'static str),

    /// A host callback failed; the pass that invoked it was aborted.
    #[error("host callback `{callback}` failed: {source}")]
    Host {
        callback: &'static str,
        source: HostError,
    },
}

impl Error {
    pub fn host(callback: &'static str, source: HostError) -> Self {
        Self::Host { callback, source }
    }
}

//! Error types for the chain client

/// An error returned by the chain client
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainClientError {
    /// The requested token or pool does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// An error returned by the node, or a transport failure
    #[error("rpc error: {0}")]
    Rpc(String),
    /// An error parsing a value returned by the node
    #[error("parse error: {0}")]
    Parse(String),
    /// The node did not answer within the allotted time
    #[error("timed out: {0}")]
    Timeout(String),
}

impl ChainClientError {
    /// Create a new not found error
    #[allow(clippy::needless_pass_by_value)]
    pub fn not_found<T: ToString>(e: T) -> Self {
        ChainClientError::NotFound(e.to_string())
    }

    /// Create a new rpc error
    #[allow(clippy::needless_pass_by_value)]
    pub fn rpc<T: ToString>(e: T) -> Self {
        ChainClientError::Rpc(e.to_string())
    }

    /// Create a new parse error
    #[allow(clippy::needless_pass_by_value)]
    pub fn parse<T: ToString>(e: T) -> Self {
        ChainClientError::Parse(e.to_string())
    }

    /// Create a new timeout error
    #[allow(clippy::needless_pass_by_value)]
    pub fn timeout<T: ToString>(e: T) -> Self {
        ChainClientError::Timeout(e.to_string())
    }
}

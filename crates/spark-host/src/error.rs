//! Error types for host service calls

/// Errors raised by the completion and identity services
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Template segments and values do not interleave
    #[error("prompt template has {segments} segments for {values} values")]
    PromptArity {
        /// Number of literal segments
        segments: usize,
        /// Number of interpolated values
        values: usize,
    },

    /// Transport-level failure
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Endpoint answered with something we cannot interpret
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// No authenticated user in this host
    #[error("not authenticated")]
    Unauthenticated,

    /// Service could not be reached or is not configured
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl HostError {
    /// Check if retrying the same call could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Unavailable(_) => true,
            Self::PromptArity { .. } | Self::MalformedResponse(_) | Self::Unauthenticated => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_error_display() {
        let err = HostError::PromptArity {
            segments: 1,
            values: 2,
        };
        assert_eq!(err.to_string(), "prompt template has 1 segments for 2 values");
        assert_eq!(HostError::Unauthenticated.to_string(), "not authenticated");
    }

    #[test]
    fn host_error_is_retryable() {
        assert!(HostError::Status {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(HostError::Status {
            status: 429,
            body: String::new()
        }
        .is_retryable());
        assert!(!HostError::Status {
            status: 400,
            body: String::new()
        }
        .is_retryable());
        assert!(!HostError::Unauthenticated.is_retryable());
    }
}

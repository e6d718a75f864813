use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("term error: {0}")]
    Term(#[from] TermError),

    #[error("query error: {0}")]
    Query(#[from] QueryError),

    #[error("semantic error: {0}")]
    Semantic(#[from] SemanticError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    #[error("failed to parse config: {0}")]
    ParseError(String),

    #[error("invalid config value: {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum TermError {
    #[error("unknown property: {property}")]
    UnknownProperty { property: String },
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid sort criterion: {0}")]
    InvalidSort(String),

    #[error("invalid task snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Failures of the external semantic parse call. Every variant is recoverable:
/// the engine falls back to the deterministic parser and reports a diagnostic.
#[derive(Error, Debug)]
pub enum SemanticError {
    #[error("semantic parsing is disabled")]
    Disabled,

    #[error("missing semantic api key ({env})")]
    MissingApiKey { env: String },

    #[error("semantic endpoint returned http {status}")]
    Http { status: u16 },

    #[error("semantic call timed out")]
    Timeout,

    #[error("semantic transport error: {0}")]
    Transport(String),

    #[error("semantic response was empty")]
    EmptyResponse,

    #[error("malformed semantic response: {0}")]
    Malformed(String),
}

impl SemanticError {
    /// Convenience constructor for transport errors — use with
    /// `.map_err(SemanticError::transport)`.
    pub fn transport<E: std::fmt::Display>(e: E) -> Self {
        Self::Transport(e.to_string())
    }

    pub fn malformed<E: std::fmt::Display>(e: E) -> Self {
        Self::Malformed(e.to_string())
    }

    /// Short machine-readable reason attached to fallback diagnostics.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Disabled => "semantic_disabled",
            Self::MissingApiKey { .. } => "missing_api_key",
            Self::Http { .. } => "http_error",
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport_error",
            Self::EmptyResponse => "empty_response",
            Self::Malformed(_) => "malformed_response",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::SemanticError;

    #[test]
    fn semantic_reason_codes_are_stable() {
        assert_eq!(SemanticError::Timeout.reason_code(), "timeout");
        assert_eq!(SemanticError::Http { status: 502 }.reason_code(), "http_error");
        assert_eq!(
            SemanticError::transport("connection refused").reason_code(),
            "transport_error"
        );
    }
}

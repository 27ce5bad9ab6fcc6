use std::fmt;

/// Failure of a single (date, movement) fetch.
#[derive(Debug)]
pub enum UpstreamError {
    /// Valid JSON that is not a list.
    UnexpectedFormat,
    Status { status: u16, body: String },
    /// Connect, DNS, TLS or timeout failure.
    Network(reqwest::Error),
    Unexpected(String),
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::UnexpectedFormat => f.write_str("Unexpected response format"),
            UpstreamError::Status { status, body } => write!(f, "API error {status}: {body}"),
            UpstreamError::Network(err) => write!(f, "Network error: {err}"),
            UpstreamError::Unexpected(detail) => write!(f, "Unexpected error: {detail}"),
        }
    }
}

impl std::error::Error for UpstreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UpstreamError::Network(err) => Some(err),
            _ => None,
        }
    }
}

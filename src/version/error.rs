use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("request-timeout")]
    Timeout,

    #[error("system: {code}")]
    Network { code: String },

    #[error("invalid-json: {0}")]
    InvalidResponse(String),

    #[error("invalid-url: {0}")]
    InvalidUrl(String),
}

impl RegistryError {
    /// Short machine-readable text stored in a failed response
    pub fn status_text(&self) -> String {
        self.to_string()
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return RegistryError::Timeout;
        }
        if err.is_decode() {
            return RegistryError::InvalidResponse(err.to_string());
        }
        RegistryError::Network {
            code: system_code(&err),
        }
    }
}

/// Walks the source chain looking for an OS-level cause and names it the way
/// Node's system errors do (`ECONNREFUSED`, `ENOTFOUND`, ...).
fn system_code(err: &reqwest::Error) -> String {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return io_code(io.kind()).to_string();
        }
        let text = cause.to_string();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return "ENOTFOUND".to_string();
        }
        source = cause.source();
    }

    if err.is_connect() {
        "ECONNREFUSED".to_string()
    } else if err.is_body() {
        "EBODY".to_string()
    } else {
        "EREQUEST".to_string()
    }
}

fn io_code(kind: std::io::ErrorKind) -> &'static str {
    use std::io::ErrorKind;

    match kind {
        ErrorKind::ConnectionRefused => "ECONNREFUSED",
        ErrorKind::ConnectionReset => "ECONNRESET",
        ErrorKind::ConnectionAborted => "ECONNABORTED",
        ErrorKind::NotConnected => "ENOTCONN",
        ErrorKind::AddrNotAvailable => "EADDRNOTAVAIL",
        ErrorKind::TimedOut => "ETIMEDOUT",
        ErrorKind::BrokenPipe => "EPIPE",
        ErrorKind::UnexpectedEof => "EOF",
        ErrorKind::PermissionDenied => "EACCES",
        _ => "EIO",
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Unknown threshold strategy: {0}")]
    UnknownStrategy(String),

    #[error("Single-axis strategy accepts one non-zero threshold, got {count}")]
    TooManyThresholds { count: usize },
}

//! Server error types with recovery suggestions.

use std::io;

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to bind to {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("runtime error: {0}")]
    Runtime(#[source] io::Error),

    #[error("TLS certificate error: {0}")]
    #[cfg(feature = "tls")]
    TlsCertificate(String),
}

impl ServerError {
    pub fn invalid_config(err: &anyhow::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }

    pub fn bind_error(address: &str, source: io::Error) -> Self {
        Self::BindError {
            address: address.to_owned(),
            source,
        }
    }

    /// A human-readable suggestion for resolving this error, surfaced in
    /// startup failure logs.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidConfig(_) => {
                Some("check your configuration values and ensure all required fields are set")
            }
            Self::BindError { source, .. } => match source.kind() {
                io::ErrorKind::PermissionDenied => {
                    Some("try a port above 1024 or run with elevated privileges")
                }
                io::ErrorKind::AddrInUse => {
                    Some("the port is already in use; pick a different one or stop the conflicting service")
                }
                _ => Some("check network configuration and firewall settings"),
            },
            Self::Runtime(_) => None,
            #[cfg(feature = "tls")]
            Self::TlsCertificate(_) => Some("verify the certificate and key files exist and are valid PEM"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_error_permission_denied_suggests_port_change() {
        let err = ServerError::bind_error(
            "127.0.0.1:80",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.suggestion().unwrap().contains("port above 1024"));
    }
}

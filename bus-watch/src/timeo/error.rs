//! Upstream API error types.

/// Errors from the Timeo client and decoding layer.
#[derive(Debug, thiserror::Error)]
pub enum TimeoError {
    /// Transport failure (network error, timeout).
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status.
    #[error("HTTP status {status}")]
    Status { status: u16 },

    /// Malformed or unexpectedly shaped payload.
    #[error("malformed response: {0}")]
    Parse(String),

    /// The server reported an application-level error code.
    #[error("server error {code}: {message}")]
    Api { code: String, message: String },

    /// The server answered with a blocking service-disruption advisory
    /// instead of data. Valid domain information, surfaced as a
    /// distinguished kind so callers can display it.
    #[error("service advisory: {title}")]
    BlockingAdvisory { title: String, body: Option<String> },
}

impl TimeoError {
    /// Whether this error came from the transport rather than the payload.
    pub fn is_transport(&self) -> bool {
        matches!(self, TimeoError::Http(_) | TimeoError::Status { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        let e = TimeoError::Api {
            code: "007".into(),
            message: "invalid reference".into(),
        };
        assert_eq!(e.to_string(), "server error 007: invalid reference");

        let e = TimeoError::BlockingAdvisory {
            title: "Réseau interrompu".into(),
            body: None,
        };
        assert!(e.to_string().contains("Réseau interrompu"));

        let e = TimeoError::Status { status: 503 };
        assert_eq!(e.to_string(), "HTTP status 503");
        assert!(e.is_transport());
    }
}

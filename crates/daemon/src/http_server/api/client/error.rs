use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("could not reach the strongroom daemon: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("invalid daemon url: {0}")]
    UrlParse(#[from] url::ParseError),
    /// The daemon answered with a structured error body
    #[error("{kind} ({status}): {message}")]
    Rejected {
        status: StatusCode,
        kind: String,
        message: String,
    },
    #[error("unexpected HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
}

impl ApiError {
    /// Error kind reported by the daemon, if it sent one
    pub fn kind(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_carries_kind() {
        let err = ApiError::Rejected {
            status: StatusCode::SERVICE_UNAVAILABLE,
            kind: "sealed".into(),
            message: "vault is sealed".into(),
        };
        assert_eq!(err.kind(), Some("sealed"));
        assert_eq!(
            err.to_string(),
            "sealed (503 Service Unavailable): vault is sealed"
        );
        assert_eq!(
            ApiError::HttpStatus(StatusCode::BAD_GATEWAY, String::new()).kind(),
            None
        );
    }
}

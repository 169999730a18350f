use serde::Serialize;

/// Coarse classification shared by every error the core can produce.
///
/// Transport layers map this onto their own status codes; callers use it to
/// decide whether an operation is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input, rejected before any mutation
    Validation,
    /// Missing namespace, record or user
    NotFound,
    /// Duplicate share, existing user, incompatible ceremony state
    Conflict,
    /// Authentication failure or bad key material
    Crypto,
    /// The vault has not been unsealed
    Sealed,
    /// Underlying transaction or I/O failure
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Crypto => "crypto",
            ErrorKind::Sealed => "sealed",
            ErrorKind::Storage => "storage",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_name_matches_as_str() {
        for kind in [
            ErrorKind::Validation,
            ErrorKind::NotFound,
            ErrorKind::Conflict,
            ErrorKind::Crypto,
            ErrorKind::Sealed,
            ErrorKind::Storage,
        ] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.as_str().to_string()));
        }
    }
}

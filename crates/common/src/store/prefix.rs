use std::fmt;

use super::StoreError;

/// Location of a namespace inside the `kv` tree: a username followed by path
/// segments.
///
/// An empty username addresses the global tree used for internal
/// bookkeeping, whose segments hang directly off `kv`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prefix {
    username: String,
    segments: Vec<String>,
}

impl Prefix {
    pub fn new<I, T>(username: impl Into<String>, segments: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            username: username.into(),
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn user(username: impl Into<String>) -> Self {
        Self::new(username, Vec::<String>::new())
    }

    pub fn global() -> Self {
        Self::default()
    }

    /// Build a prefix from a slash separated path, skipping empty segments
    /// so that `a//b/` and `/a/b` address the same namespace.
    pub fn parse(username: impl Into<String>, path: &str) -> Self {
        Self::new(username, path.split('/').filter(|s| !s.is_empty()))
    }

    pub fn join(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Namespace names to walk from `kv`, in order
    pub(crate) fn names(&self) -> Result<Vec<&[u8]>, StoreError> {
        if self.segments.iter().any(String::is_empty) {
            return Err(StoreError::EmptySegment);
        }
        let user = (!self.username.is_empty()).then_some(self.username.as_bytes());
        Ok(user
            .into_iter()
            .chain(self.segments.iter().map(String::as_bytes))
            .collect())
    }

    /// Number of leading names that are never pruned
    pub(crate) fn floor(&self) -> usize {
        usize::from(!self.username.is_empty())
    }

    /// Name of the namespace this prefix resolves to
    pub(crate) fn leaf_name(&self) -> &str {
        self.segments
            .last()
            .map(String::as_str)
            .unwrap_or(&self.username)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)?;
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_include_username() {
        let prefix = Prefix::new("alice", ["a", "b"]);
        let names = prefix.names().unwrap();
        assert_eq!(names, vec![b"alice".as_slice(), b"a".as_slice(), b"b".as_slice()]);
        assert_eq!(prefix.floor(), 1);
        assert_eq!(prefix.leaf_name(), "b");
        assert_eq!(prefix.to_string(), "alice/a/b");
    }

    #[test]
    fn test_global_prefix_starts_at_kv() {
        let prefix = Prefix::global().join("tokens");
        assert_eq!(prefix.names().unwrap(), vec![b"tokens".as_slice()]);
        assert_eq!(prefix.floor(), 0);
    }

    #[test]
    fn test_empty_segment_rejected() {
        let prefix = Prefix::new("alice", ["a", "", "b"]);
        assert!(matches!(prefix.names(), Err(StoreError::EmptySegment)));
    }

    #[test]
    fn test_parse_drops_empty_segments() {
        assert_eq!(
            Prefix::parse("alice", "/a//b/"),
            Prefix::new("alice", ["a", "b"])
        );
        assert_eq!(Prefix::parse("alice", ""), Prefix::user("alice"));
    }
}

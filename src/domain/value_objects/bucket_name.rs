use std::net::Ipv4Addr;

use crate::domain::errors::ValidationError;

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 63;

/// Name of the bucket holding the registry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketName(String);

impl BucketName {
    /// Accepts names following the S3 naming rules; dotted names used by
    /// older registry deployments are allowed.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let name = value.into();

        if !(MIN_LEN..=MAX_LEN).contains(&name.len()) {
            return Err(ValidationError::BucketNameLength {
                name,
                min: MIN_LEN,
                max: MAX_LEN,
            });
        }

        match syntax_violation(&name) {
            Some(reason) => Err(ValidationError::BucketNameSyntax { name, reason }),
            None => Ok(Self(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn syntax_violation(name: &str) -> Option<&'static str> {
    let is_edge = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    let bytes = name.as_bytes();

    if !bytes.iter().all(|&b| is_edge(b) || b == b'-' || b == b'.') {
        return Some("only lowercase letters, digits, '-' and '.' are allowed");
    }
    if !bytes.first().copied().is_some_and(is_edge) || !bytes.last().copied().is_some_and(is_edge) {
        return Some("must begin and end with a letter or digit");
    }
    if name.contains("..") {
        return Some("must not contain consecutive dots");
    }
    if name.parse::<Ipv4Addr>().is_ok() {
        return Some("must not look like an IP address");
    }
    None
}

impl std::fmt::Display for BucketName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_registry_buckets() {
        for name in ["registry", "docker-registry-01", "123registry", "docker.registry.prod"] {
            assert!(BucketName::new(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_rejects_length() {
        assert!(matches!(
            BucketName::new("ab"),
            Err(ValidationError::BucketNameLength { .. })
        ));
        assert!(matches!(
            BucketName::new("a".repeat(64)),
            Err(ValidationError::BucketNameLength { .. })
        ));
    }

    #[test]
    fn test_rejects_syntax() {
        for name in ["-registry", "registry.", "Registry", "my_bucket", "my bucket", "my..bucket", "192.168.1.1"] {
            assert!(
                matches!(BucketName::new(name), Err(ValidationError::BucketNameSyntax { .. })),
                "{name}"
            );
        }
    }
}

use crate::domain::errors::ValidationError;

/// Layout of the registry's repository namespace inside the bucket
pub const REPOSITORIES_PATH: &str = "docker/registry/v2/repositories/";

/// One repository's storage namespace, as yielded by a grouped listing
/// under the registry root (always ends with the `/` delimiter).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryPrefix(String);

impl RepositoryPrefix {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.is_empty() {
            return Err(ValidationError::EmptyRepositoryPrefix);
        }

        if !value.ends_with('/') {
            return Err(ValidationError::RepositoryPrefixMissingDelimiter(value));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepositoryPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Prefix under which repositories are enumerated, honouring an optional
/// registry root directory.
pub fn repositories_root(root_directory: Option<&str>) -> String {
    match root_directory.map(|dir| dir.trim_matches('/')) {
        Some(dir) if !dir.is_empty() => format!("{}/{}", dir, REPOSITORIES_PATH),
        _ => REPOSITORIES_PATH.to_string(),
    }
}

use thiserror::Error;

/// Rejections raised when constructing domain value objects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Object key cannot be empty")]
    EmptyObjectKey,

    #[error("Object key is {actual} bytes, longer than the {max} byte limit")]
    ObjectKeyTooLong { actual: usize, max: usize },

    #[error("Object key contains a NUL byte")]
    ObjectKeyContainsNul,

    #[error("Bucket name '{name}' must be between {min} and {max} characters")]
    BucketNameLength { name: String, min: usize, max: usize },

    #[error("Bucket name '{name}' is not a valid DNS-style name: {reason}")]
    BucketNameSyntax { name: String, reason: &'static str },

    #[error("Repository prefix cannot be empty")]
    EmptyRepositoryPrefix,

    #[error("Repository prefix must end with '/': {0}")]
    RepositoryPrefixMissingDelimiter(String),
}

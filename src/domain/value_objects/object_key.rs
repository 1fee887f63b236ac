use crate::domain::errors::ValidationError;

const MAX_KEY_LEN: usize = 1024;

/// Full key of one object in the bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Keys are taken as the store reports them, without normalisation.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let key = value.into();

        if key.is_empty() {
            return Err(ValidationError::EmptyObjectKey);
        }
        if key.len() > MAX_KEY_LEN {
            return Err(ValidationError::ObjectKeyTooLong {
                actual: key.len(),
                max: MAX_KEY_LEN,
            });
        }
        if key.contains('\0') {
            return Err(ValidationError::ObjectKeyContainsNul);
        }

        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the last `/`, if the key has one
    pub fn parent(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(parent, _)| parent)
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

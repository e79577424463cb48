//! Error types for the store layer.

/// Errors a store can report.
///
/// `kind` names the entity family ("session", "user", ...) and `key` the
/// identity that was looked up, so log lines read naturally:
/// `user U-42 not found`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No entity exists under this key.
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },

    /// `create` was called for a key that is already taken.
    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: &'static str, key: String },

    /// The backing store failed the read or write.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub(crate) fn already_exists(
        kind: &'static str,
        key: impl ToString,
    ) -> Self {
        Self::AlreadyExists {
            kind,
            key: key.to_string(),
        }
    }

    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

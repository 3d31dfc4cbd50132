/// Convenience result type used across sortlast.
pub type CompositeResult<T> = Result<T, CompositeError>;

/// Top-level error taxonomy used by compositor APIs.
#[derive(thiserror::Error, Debug)]
pub enum CompositeError {
    /// Invalid caller-provided data (sizes, rectangles, camera parameters).
    #[error("validation error: {0}")]
    Validation(String),

    /// The compositor was invoked before it was fully configured.
    #[error("improper use: {0}")]
    ImproperUse(String),

    /// Failures reported by the rank-to-rank transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// Inconsistent bookkeeping between the metadata and pixel exchange stages.
    #[error("exchange error: {0}")]
    Exchange(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CompositeError {
    /// Build a [`CompositeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CompositeError::ImproperUse`] value.
    pub fn improper_use(msg: impl Into<String>) -> Self {
        Self::ImproperUse(msg.into())
    }

    /// Build a [`CompositeError::Transport`] value.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Build a [`CompositeError::Exchange`] value.
    pub fn exchange(msg: impl Into<String>) -> Self {
        Self::Exchange(msg.into())
    }

    /// Build a [`CompositeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for CompositeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

// Typed engine errors.
// Action failures stay opaque (`anyhow::Error`); these are the failures
// the engine itself can name.

/// A reading action detected that a required output or context value was
/// never published. Output reads themselves never fail; the reader
/// converts an absent default into this error, attributing itself.
#[derive(Debug, thiserror::Error)]
#[error("action '{action}' requires '{value}', but no earlier action published it")]
pub struct MissingValueError {
    /// Name of the missing output key or context value.
    pub value: String,

    /// Display name of the action that needed the value.
    pub action: String,
}

impl MissingValueError {
    pub fn new(value: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            action: action.into(),
        }
    }
}

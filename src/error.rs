use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoralError>;

/// Setup-time failures. Generation itself never fails: unknown or empty
/// class names are dropped silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoralError {
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("invalid rule \"{name}\": {reason}")]
    InvalidRule { name: String, reason: String },

    #[error("invalid variant \"{name}\": {reason}")]
    InvalidVariant { name: String, reason: String },

    #[error("plugin \"{plugin}\" requires \"{missing}\" to be installed first")]
    PluginDependency { plugin: String, missing: String },

    #[error("theme error: {message}")]
    Theme { message: String },
}

impl CoralError {
    pub fn invalid_rule(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_variant(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidVariant {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

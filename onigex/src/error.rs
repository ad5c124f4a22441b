//! Error types for the translator
//!
//! This module provides error handling using the `thiserror` crate.
//! Errors are categorized by the stage that can raise them: parsing, transformation,
//! generation, option normalization, or host engine compilation.

use thiserror::Error;

use crate::options::Target;

/// The main error type for Oniguruma translation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OnigexError {
    /// The source pattern is malformed
    #[error("syntax error at position {position}: {message}")]
    Syntax {
        /// Human-readable description
        message: String,
        /// Character offset in the source pattern
        position: usize,
    },

    /// A source construct cannot be represented under the requested accuracy/target
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A required native feature is unavailable at the declared capability level
    #[error("{feature} requires a target above {target}")]
    UnsupportedTarget {
        /// What needed the higher target
        feature: String,
        /// The declared target
        target: Target,
    },

    /// Two options contradict each other
    #[error("configuration conflict: {0}")]
    ConfigurationConflict(String),

    /// An option value is out of range or malformed
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// The host engine rejected the emitted pattern
    #[error("compilation error: {0}")]
    Compile(String),
}

impl OnigexError {
    /// Create a syntax error at a character position
    pub fn syntax(message: impl Into<String>, position: usize) -> Self {
        OnigexError::Syntax {
            message: message.into(),
            position,
        }
    }

    /// Create an unsupported-feature error
    pub fn unsupported(feature: impl Into<String>) -> Self {
        OnigexError::UnsupportedFeature(feature.into())
    }

    /// Stable name of the error category, for programmatic dispatch
    pub fn kind(&self) -> &'static str {
        match self {
            OnigexError::Syntax { .. } => "SyntaxError",
            OnigexError::UnsupportedFeature(_) => "UnsupportedFeatureError",
            OnigexError::UnsupportedTarget { .. } => "UnsupportedTargetError",
            OnigexError::ConfigurationConflict(_) => "ConfigurationConflictError",
            OnigexError::InvalidOption(_) => "InvalidOptionError",
            OnigexError::Compile(_) => "CompileError",
        }
    }
}

/// Result type alias for translation operations
pub type Result<T> = std::result::Result<T, OnigexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let err = OnigexError::syntax("unclosed group", 2);
        assert_eq!(err.to_string(), "syntax error at position 2: unclosed group");
        assert_eq!(err.kind(), "SyntaxError");
    }

    #[test]
    fn test_unsupported_target_display() {
        let err = OnigexError::UnsupportedTarget {
            feature: "nested class intersection".to_string(),
            target: Target::Es2018,
        };
        assert_eq!(
            err.to_string(),
            "nested class intersection requires a target above ES2018"
        );
    }

    #[test]
    fn test_kinds_are_distinct() {
        let errors = [
            OnigexError::syntax("x", 0),
            OnigexError::unsupported("x"),
            OnigexError::UnsupportedTarget {
                feature: "x".to_string(),
                target: Target::Es2024,
            },
            OnigexError::ConfigurationConflict("x".to_string()),
            OnigexError::InvalidOption("x".to_string()),
            OnigexError::Compile("x".to_string()),
        ];
        let mut kinds: Vec<_> = errors.iter().map(|e| e.kind()).collect();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }
}

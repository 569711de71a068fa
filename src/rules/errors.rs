//! # Rule Engine Errors
//!
//! Two independent failure classes:
//!
//! - `LoadError`: fatal at startup, recoverable at reload (the previous
//!   KnowledgeBase keeps serving)
//! - `EvaluationError`: aborts one evaluation call only; the partial
//!   outcome accumulated before the fault travels with the failure

use thiserror::Error;

use crate::model::EvaluationOutcome;

/// Result type for load/reload operations
pub type LoadResult<T> = Result<T, LoadError>;

/// Failure while building a KnowledgeBase from configured sources.
///
/// Every file-level variant names the offending resource path.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A configured rules directory could not be read
    #[error("failed to read rules directory {path}: {source}")]
    SourceUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A rule resource could not be read
    #[error("failed to read rule resource {path}: {source}")]
    ResourceUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A rule resource is not valid JSON or not a rule set
    #[error("failed to parse rule resource {path}: {reason}")]
    Parse { path: String, reason: String },

    /// A rule definition failed compile validation
    #[error("invalid rule '{rule}' in {path}: {reason}")]
    Compile {
        path: String,
        rule: String,
        reason: String,
    },

    /// The same rule name appears twice across the loaded sources
    #[error("duplicate rule name '{rule}' in {path}")]
    Duplicate { path: String, rule: String },

    /// No rule resource matched across all configured sources
    #[error("no rule resources found in configured sources")]
    NoRules,
}

impl LoadError {
    pub fn source_unreadable(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::SourceUnreadable {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn resource_unreadable(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::ResourceUnreadable {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn parse(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    pub fn compile(
        path: &std::path::Path,
        rule: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Compile {
            path: path.display().to_string(),
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    pub fn duplicate(path: &std::path::Path, rule: impl Into<String>) -> Self {
        Self::Duplicate {
            path: path.display().to_string(),
            rule: rule.into(),
        }
    }
}

/// Runtime fault inside a rule condition or action body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// A step or condition required an attribute that is not bound
    #[error("rule '{rule}': attribute '{key}' is not bound")]
    MissingAttribute { rule: String, key: String },

    /// An attribute is bound to a value of the wrong type
    #[error("rule '{rule}': attribute '{key}' is {found}, expected {expected}")]
    AttributeType {
        rule: String,
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// An aborted evaluation, carrying everything accumulated before the
/// fault. Actions already appended remain available to the caller.
#[derive(Debug, Error)]
#[error("evaluation aborted: {error}")]
pub struct EvaluationFailure {
    pub error: EvaluationError,
    pub partial: EvaluationOutcome,
}

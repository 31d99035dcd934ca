//! Tree matcher wrapper around the filter
//!
//! Runs the SPSM filter over a candidate mapping produced by an upstream
//! element-level matcher and reports failures with the function-like
//! signatures of the two trees attached.

use crate::filter::{MappingFilterError, SpsmFilter};
use crate::mapping::ContextMapping;
use crate::pretty::fn_signature;

/// Error raised by `SpsmTreeMatcher` when filtering fails; carries the
/// underlying `MappingFilterError` as its cause.
#[derive(Debug)]
pub struct TreeMatcherError {
    message: String,
    cause: Option<Box<dyn std::error::Error>>,
}

impl TreeMatcherError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(message: impl Into<String>, cause: Box<dyn std::error::Error>) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause),
        }
    }
}

impl std::fmt::Display for TreeMatcherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TreeMatcherError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_deref()
    }
}

/// Matches two trees by filtering a candidate mapping down to a
/// structure-preserving one and scoring it.
#[derive(Copy, Clone, Debug, Default)]
pub struct SpsmTreeMatcher {
    filter: SpsmFilter,
}

impl SpsmTreeMatcher {
    pub fn new(filter: SpsmFilter) -> Self {
        Self { filter }
    }

    /// Filter the candidate mapping. On failure, logs the signatures of
    /// both trees and wraps the filter error.
    pub fn tree_match(
        &self,
        candidate: ContextMapping,
    ) -> Result<ContextMapping, TreeMatcherError> {
        let source_signature = fn_signature(candidate.source_context());
        let target_signature = fn_signature(candidate.target_context());

        self.filter.filter(candidate).map_err(|e: MappingFilterError| {
            tracing::info!(
                "problem matching source [{}] to target [{}]: {}",
                source_signature,
                target_signature,
                e
            );
            TreeMatcherError::with_cause(e.to_string(), Box::new(e))
        })
    }
}

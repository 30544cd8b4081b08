use std::fmt;

use codespan_reporting::diagnostic::Diagnostic;
use serde::Serialize;
use thiserror::Error;

/// What a validation error is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValidationErrorKind {
    /// The block type is not in the registry. Its subtree was not checked.
    UnknownType,
    MissingField,
    ExtraField,
    MissingValueInput,
    ExtraValueInput,
    MissingStatementInput,
    ExtraStatementInput,
    /// A statement in an expression slot, or the reverse.
    ContextMismatch,
    /// The block is nested past the configured limit. Its subtree was not checked.
    DepthExceeded,
}

impl ValidationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationErrorKind::UnknownType => "UnknownType",
            ValidationErrorKind::MissingField => "MissingField",
            ValidationErrorKind::ExtraField => "ExtraField",
            ValidationErrorKind::MissingValueInput => "MissingValueInput",
            ValidationErrorKind::ExtraValueInput => "ExtraValueInput",
            ValidationErrorKind::MissingStatementInput => "MissingStatementInput",
            ValidationErrorKind::ExtraStatementInput => "ExtraStatementInput",
            ValidationErrorKind::ContextMismatch => "ContextMismatch",
            ValidationErrorKind::DepthExceeded => "DepthExceeded",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structural or contextual problem found in a candidate tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub message: String,
    /// Type of the block the error was raised on.
    pub block_type: String,
    /// Field or input name, when the error concerns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    /// Dotted location from the root, e.g. `root.value_inputs.TEXT`.
    pub path: String,
}

impl ValidationError {
    /// Convert to a codespan-reporting Diagnostic for display.
    ///
    /// Trees carry no source spans, so the location goes in a note.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::error()
            .with_code(self.kind.as_str())
            .with_message(&self.message)
            .with_notes(vec![format!("at {}", self.path)])
    }
}

/// A tree that cannot be serialized at all. Raised fail-fast by the serializer
/// and by tree loading; never by schema checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("block at {path} has no type")]
    MissingType { path: String },

    #[error("block at {path} is nested deeper than {limit} levels")]
    DepthExceeded { path: String, limit: usize },

    #[error("malformed block tree: {0}")]
    Malformed(String),
}

/// Why [`crate::assemble`] produced no document.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("block tree failed validation with {} error(s)", .0.len())]
    Invalid(Vec<ValidationError>),

    #[error(transparent)]
    Structural(#[from] StructuralError),
}

pub mod audit;
pub mod error;
pub mod serializer;
pub mod validator;

pub use audit::{UnsupportedBlock, audit_markup, unsupported_types};
pub use error::{AssembleError, StructuralError, ValidationError, ValidationErrorKind};
pub use serializer::{escape_xml, serialize, serialize_block, serialize_with};
pub use validator::{validate, validate_in};

use blocks::{ProgramNode, SchemaRegistry};

/// Default bound on block nesting. Sequential `next` links do not count.
pub const MAX_DEPTH: usize = 256;

/// Traversal limits shared by the validator and the serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Deepest permitted nesting of value and statement inputs below the root.
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_depth: MAX_DEPTH,
        }
    }
}

/// Parse a candidate tree, reporting bad JSON as a structural error.
pub fn parse_tree(text: &str) -> Result<ProgramNode, StructuralError> {
    ProgramNode::from_json(text).map_err(|e| StructuralError::Malformed(e.to_string()))
}

/// Validate `node` and, if it is well-formed, serialize it into a document.
pub fn assemble(
    registry: &SchemaRegistry,
    node: &ProgramNode,
    limits: Limits,
) -> Result<String, AssembleError> {
    let errors = validate_in(registry, node, blocks::Context::Root, limits);
    if !errors.is_empty() {
        return Err(AssembleError::Invalid(errors));
    }
    Ok(serialize_with(node, limits)?)
}

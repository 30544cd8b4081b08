use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Whether a block is executed for effect or evaluated for a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Statement,
    Expression,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Statement => "statement",
            BlockKind::Expression => "expression",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "statement" => Some(BlockKind::Statement),
            "expression" => Some(BlockKind::Expression),
            _ => None,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The slot kind a block currently sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// Outermost node of a tree. Never constrains the block's kind.
    Root,
    /// Inside a value input.
    Expression,
    /// Inside a statement input or a `next` chain.
    Statement,
}

impl Context {
    /// Returns true if a block of `kind` may not appear in this context.
    pub fn rejects(&self, kind: BlockKind) -> bool {
        matches!(
            (self, kind),
            (Context::Expression, BlockKind::Statement) | (Context::Statement, BlockKind::Expression)
        )
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Root => f.write_str("root"),
            Context::Expression => f.write_str("expression"),
            Context::Statement => f.write_str("statement"),
        }
    }
}

/// The declared contract for one block type.
///
/// Every listed name is required: the schema model has no optional slots.
/// `fields`, `value_inputs` and `statement_inputs` never share a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "SchemaRecord", try_from = "SchemaRecord")]
pub struct BlockSchema {
    pub block_type: String,
    pub category: String,
    pub module: String,
    pub kind: BlockKind,
    /// Literal-valued leaf slots.
    pub fields: IndexSet<String>,
    /// Slots that must hold an expression block.
    pub value_inputs: IndexSet<String>,
    /// Slots that must hold a statement block.
    pub statement_inputs: IndexSet<String>,
    /// Stored template with the namespace attribute stripped.
    pub xml_template: String,
    /// Trimmed code sample the kind was inferred from.
    pub code_sample: String,
}

impl BlockSchema {
    /// A schema with no slots and no provenance. Mostly useful for building
    /// registries by hand.
    pub fn new(block_type: impl Into<String>, kind: BlockKind) -> Self {
        BlockSchema {
            block_type: block_type.into(),
            category: String::new(),
            module: String::new(),
            kind,
            fields: IndexSet::new(),
            value_inputs: IndexSet::new(),
            statement_inputs: IndexSet::new(),
            xml_template: String::new(),
            code_sample: String::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into());
        self
    }

    pub fn with_value_input(mut self, name: impl Into<String>) -> Self {
        self.value_inputs.insert(name.into());
        self
    }

    pub fn with_statement_input(mut self, name: impl Into<String>) -> Self {
        self.statement_inputs.insert(name.into());
        self
    }

    /// Find a name declared under more than one slot kind.
    pub fn overlapping_slot(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|name| self.value_inputs.contains(*name) || self.statement_inputs.contains(*name))
            .or_else(|| {
                self.value_inputs
                    .iter()
                    .find(|name| self.statement_inputs.contains(*name))
            })
            .map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Normalized schema file format
// ---------------------------------------------------------------------------

const FIELD_PLACEHOLDER: &str = "<value>";
const VALUE_PLACEHOLDER: &str = "<expression>";
const STATEMENT_PLACEHOLDER: &str = "<statement>";

/// On-disk shape of a normalized schema. Slot sets are stored as maps from
/// slot name to a placeholder; only the keys carry meaning.
#[derive(Serialize, Deserialize)]
struct SchemaRecord {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    module: Option<String>,
    kind: String,
    #[serde(default)]
    fields: IndexMap<String, String>,
    #[serde(default)]
    value_inputs: IndexMap<String, String>,
    #[serde(default)]
    statement_inputs: IndexMap<String, String>,
    #[serde(default)]
    xml_template: String,
    #[serde(default)]
    python_sample: String,
}

fn placeholders(names: IndexSet<String>, placeholder: &str) -> IndexMap<String, String> {
    names
        .into_iter()
        .map(|name| (name, placeholder.to_string()))
        .collect()
}

impl From<BlockSchema> for SchemaRecord {
    fn from(schema: BlockSchema) -> Self {
        SchemaRecord {
            block_type: schema.block_type,
            category: Some(schema.category),
            module: Some(schema.module),
            kind: schema.kind.as_str().to_string(),
            fields: placeholders(schema.fields, FIELD_PLACEHOLDER),
            value_inputs: placeholders(schema.value_inputs, VALUE_PLACEHOLDER),
            statement_inputs: placeholders(schema.statement_inputs, STATEMENT_PLACEHOLDER),
            xml_template: schema.xml_template,
            python_sample: schema.code_sample,
        }
    }
}

impl TryFrom<SchemaRecord> for BlockSchema {
    type Error = SchemaError;

    fn try_from(record: SchemaRecord) -> Result<Self, Self::Error> {
        if record.block_type.is_empty() {
            return Err(SchemaError::MissingType);
        }
        let kind = BlockKind::parse(&record.kind).ok_or_else(|| SchemaError::UnknownKind {
            block_type: record.block_type.clone(),
            kind: record.kind.clone(),
        })?;
        let schema = BlockSchema {
            block_type: record.block_type,
            category: record.category.unwrap_or_default(),
            module: record.module.unwrap_or_default(),
            kind,
            fields: record.fields.into_keys().collect(),
            value_inputs: record.value_inputs.into_keys().collect(),
            statement_inputs: record.statement_inputs.into_keys().collect(),
            xml_template: record.xml_template,
            code_sample: record.python_sample,
        };
        if let Some(name) = schema.overlapping_slot() {
            return Err(SchemaError::ConflictingSlot {
                block_type: schema.block_type.clone(),
                name: name.to_string(),
            });
        }
        Ok(schema)
    }
}

mod overrides;

use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

pub use overrides::{KindOverride, OVERRIDES, apply_overrides};

use crate::descriptor::RawBlockDescriptor;
use crate::error::SchemaError;
use crate::schema::{BlockKind, BlockSchema};

/// Leading lexemes that mark a code sample as a statement.
///
/// This is a surface-syntax heuristic, not a parse. Blocks it gets wrong are
/// patched by [`OVERRIDES`].
pub const STATEMENT_PREFIXES: &[&str] = &[
    "print", "for ", "while ", "if ", "def ", "class ", "return", "try", "with ",
];

static NAMESPACE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\sxmlns="https://developers\.google\.com/blockly/xml""#)
        .expect("namespace pattern is a valid regex")
});

/// Classify a block by the code it generates in isolation.
///
/// A blank or absent sample is an expression.
pub fn infer_kind(code_sample: &str) -> BlockKind {
    let code = code_sample.trim();
    if STATEMENT_PREFIXES.iter().any(|prefix| code.starts_with(prefix)) {
        BlockKind::Statement
    } else {
        BlockKind::Expression
    }
}

/// Remove the Blockly namespace attribute from a stored template.
pub fn strip_template_namespace(template: &str) -> String {
    NAMESPACE_ATTR.replace_all(template, "").into_owned()
}

/// Turn a raw descriptor into a canonical schema.
///
/// Kind comes from [`infer_kind`] and is then patched by the override table.
/// Every listed slot name becomes required.
pub fn normalize(raw: &RawBlockDescriptor) -> Result<BlockSchema, SchemaError> {
    if raw.block_type.trim().is_empty() {
        return Err(SchemaError::MissingType);
    }

    let code_sample = raw.code_sample.as_deref().unwrap_or("").trim().to_string();

    let mut schema = BlockSchema {
        block_type: raw.block_type.clone(),
        category: raw.category.clone().unwrap_or_default(),
        module: raw.module.clone().unwrap_or_default(),
        kind: infer_kind(&code_sample),
        fields: name_set(&raw.fields),
        value_inputs: name_set(&raw.value_inputs),
        statement_inputs: name_set(&raw.statement_inputs),
        xml_template: strip_template_namespace(raw.xml_template.as_deref().unwrap_or("")),
        code_sample,
    };

    if let Some(name) = schema.overlapping_slot() {
        return Err(SchemaError::ConflictingSlot {
            block_type: schema.block_type.clone(),
            name: name.to_string(),
        });
    }

    apply_overrides(&mut schema);
    Ok(schema)
}

fn name_set(names: &[String]) -> IndexSet<String> {
    names.iter().cloned().collect()
}

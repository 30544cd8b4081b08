use tracing::debug;

use crate::schema::{BlockKind, BlockSchema};

/// A type-keyed patch for a block the kind heuristic misclassifies.
#[derive(Debug, Clone, Copy)]
pub struct KindOverride {
    pub block_type: &'static str,
    /// Forced kind, if any.
    pub kind: Option<BlockKind>,
    /// Value inputs that are always required, observed or not.
    pub value_inputs: &'static [&'static str],
    /// Statement inputs that are always required, observed or not.
    pub statement_inputs: &'static [&'static str],
}

pub const OVERRIDES: &[KindOverride] = &[
    // Scraped samples for print often come back empty, and its TEXT socket
    // is not always listed.
    KindOverride {
        block_type: "text_print",
        kind: Some(BlockKind::Statement),
        value_inputs: &["TEXT"],
        statement_inputs: &[],
    },
];

/// Apply every override whose type matches. Injected slot names are removed
/// from the other slot kinds so the sets stay disjoint.
pub fn apply_overrides(schema: &mut BlockSchema) {
    for patch in OVERRIDES.iter().filter(|p| p.block_type == schema.block_type) {
        debug!(block_type = patch.block_type, "applying schema override");

        if let Some(kind) = patch.kind {
            schema.kind = kind;
        }
        for name in patch.value_inputs {
            schema.fields.shift_remove(*name);
            schema.statement_inputs.shift_remove(*name);
            schema.value_inputs.insert(name.to_string());
        }
        for name in patch.statement_inputs {
            schema.fields.shift_remove(*name);
            schema.value_inputs.shift_remove(*name);
            schema.statement_inputs.insert(name.to_string());
        }
    }
}

use blocks::{BlockSchema, Context, ProgramNode, SchemaRegistry};
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::Limits;
use crate::error::{ValidationError, ValidationErrorKind};

/// Check a tree against the registry, starting in root context.
///
/// Returns every problem found, in a fixed order; an empty list means the
/// tree is well-formed.
pub fn validate(registry: &SchemaRegistry, node: &ProgramNode) -> Vec<ValidationError> {
    validate_in(registry, node, Context::Root, Limits::default())
}

/// Check a tree that sits in `context`.
///
/// Per block, errors come out as: missing fields, extra fields, missing value
/// inputs, extra value inputs interleaved with each child's errors, the same
/// two groups for statement inputs, then the context mismatch. A block's
/// `next` successors follow, each checked in statement context.
pub fn validate_in(
    registry: &SchemaRegistry,
    node: &ProgramNode,
    context: Context,
    limits: Limits,
) -> Vec<ValidationError> {
    let mut validator = Validator {
        registry,
        limits,
        errors: Vec::new(),
    };
    validator.visit_chain(node, context, "root", 0);
    debug!(
        root = %node.block_type,
        errors = validator.errors.len(),
        "validated block tree"
    );
    validator.errors
}

struct Validator<'r> {
    registry: &'r SchemaRegistry,
    limits: Limits,
    errors: Vec<ValidationError>,
}

impl Validator<'_> {
    /// Visit `head` and its `next` successors. Successors share the head's
    /// depth, so long sequences do not grow the stack.
    fn visit_chain(&mut self, head: &ProgramNode, context: Context, path: &str, depth: usize) {
        let mut path = path.to_string();
        let mut context = context;
        for node in head.chain() {
            self.visit(node, context, &path, depth);
            path.push_str(".next");
            context = Context::Statement;
        }
    }

    fn visit(&mut self, node: &ProgramNode, context: Context, path: &str, depth: usize) {
        if depth > self.limits.max_depth {
            self.push(
                ValidationErrorKind::DepthExceeded,
                node,
                None,
                path,
                format!(
                    "Block '{}' is nested deeper than {} levels",
                    node.block_type, self.limits.max_depth
                ),
            );
            return;
        }

        let registry = self.registry;
        let Some(schema) = registry.get(&node.block_type) else {
            self.push(
                ValidationErrorKind::UnknownType,
                node,
                None,
                path,
                format!("Unknown block type: {}", node.block_type),
            );
            return;
        };

        self.check_fields(schema, node, path);
        self.check_inputs(node, Slots::value(schema, node), path, depth);
        self.check_inputs(node, Slots::statement(schema, node), path, depth);

        if context.rejects(schema.kind) {
            let message = match context {
                Context::Expression => {
                    format!("Statement block '{}' used in expression context", node.block_type)
                }
                _ => format!("Expression block '{}' used in statement context", node.block_type),
            };
            self.push(ValidationErrorKind::ContextMismatch, node, None, path, message);
        }
    }

    fn check_fields(&mut self, schema: &BlockSchema, node: &ProgramNode, path: &str) {
        for name in &schema.fields {
            if !node.fields.contains_key(name) {
                self.push(
                    ValidationErrorKind::MissingField,
                    node,
                    Some(name.as_str()),
                    path,
                    format!("Missing field '{}' in block '{}'", name, node.block_type),
                );
            }
        }
        for name in node.fields.keys() {
            if !schema.fields.contains(name) {
                self.push(
                    ValidationErrorKind::ExtraField,
                    node,
                    Some(name.as_str()),
                    path,
                    format!("Unexpected field '{}' in block '{}'", name, node.block_type),
                );
            }
        }
    }

    fn check_inputs(&mut self, node: &ProgramNode, slots: Slots<'_>, path: &str, depth: usize) {
        for name in slots.required {
            if !slots.provided.contains_key(name) {
                self.push(
                    slots.missing,
                    node,
                    Some(name.as_str()),
                    path,
                    format!("Missing {} '{}' in block '{}'", slots.label, name, node.block_type),
                );
            }
        }
        for (name, child) in slots.provided {
            if slots.required.contains(name) {
                let child_path = format!("{}.{}.{}", path, slots.key, name);
                self.visit_chain(child, slots.context, &child_path, depth + 1);
            } else {
                self.push(
                    slots.extra,
                    node,
                    Some(name.as_str()),
                    path,
                    format!("Unexpected {} '{}' in block '{}'", slots.label, name, node.block_type),
                );
            }
        }
    }

    fn push(
        &mut self,
        kind: ValidationErrorKind,
        node: &ProgramNode,
        slot: Option<&str>,
        path: &str,
        message: String,
    ) {
        self.errors.push(ValidationError {
            kind,
            message,
            block_type: node.block_type.clone(),
            slot: slot.map(str::to_string),
            path: path.to_string(),
        });
    }
}

/// One input kind of a block: what the schema requires and what the node holds.
struct Slots<'a> {
    required: &'a IndexSet<String>,
    provided: &'a IndexMap<String, ProgramNode>,
    /// Context the children are checked in.
    context: Context,
    /// Path segment, matching the JSON key.
    key: &'static str,
    label: &'static str,
    missing: ValidationErrorKind,
    extra: ValidationErrorKind,
}

impl<'a> Slots<'a> {
    fn value(schema: &'a BlockSchema, node: &'a ProgramNode) -> Self {
        Slots {
            required: &schema.value_inputs,
            provided: &node.value_inputs,
            context: Context::Expression,
            key: "value_inputs",
            label: "value input",
            missing: ValidationErrorKind::MissingValueInput,
            extra: ValidationErrorKind::ExtraValueInput,
        }
    }

    fn statement(schema: &'a BlockSchema, node: &'a ProgramNode) -> Self {
        Slots {
            required: &schema.statement_inputs,
            provided: &node.statement_inputs,
            context: Context::Statement,
            key: "statement_inputs",
            label: "statement input",
            missing: ValidationErrorKind::MissingStatementInput,
            extra: ValidationErrorKind::ExtraStatementInput,
        }
    }
}

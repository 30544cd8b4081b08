use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One block instance in a candidate program tree.
///
/// A node owns everything below it, including its `next` chain, so a tree
/// cannot contain a cycle. All maps keep insertion order, which is the order
/// the serializer emits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramNode {
    /// Referenced schema type. Empty if the producer omitted it.
    #[serde(rename = "type", default)]
    pub block_type: String,
    /// Literal values, held as text.
    #[serde(
        default,
        deserialize_with = "literal_fields",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub fields: IndexMap<String, String>,
    #[serde(
        default,
        deserialize_with = "nullable_map",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub value_inputs: IndexMap<String, ProgramNode>,
    #[serde(
        default,
        deserialize_with = "nullable_map",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub statement_inputs: IndexMap<String, ProgramNode>,
    /// The statement that runs after this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<ProgramNode>>,
}

impl ProgramNode {
    pub fn new(block_type: impl Into<String>) -> Self {
        ProgramNode {
            block_type: block_type.into(),
            fields: IndexMap::new(),
            value_inputs: IndexMap::new(),
            statement_inputs: IndexMap::new(),
            next: None,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_value_input(mut self, name: impl Into<String>, child: ProgramNode) -> Self {
        self.value_inputs.insert(name.into(), child);
        self
    }

    pub fn with_statement_input(mut self, name: impl Into<String>, child: ProgramNode) -> Self {
        self.statement_inputs.insert(name.into(), child);
        self
    }

    pub fn with_next(mut self, next: ProgramNode) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    /// Parse a tree from its JSON form.
    ///
    /// Every `next` link is a JSON nesting level, so serde_json's recursion
    /// limit is lifted and the stack grows on demand instead. Nesting is
    /// bounded later by the validator's depth limit.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut de = serde_json::Deserializer::from_str(text);
        de.disable_recursion_limit();
        let node = ProgramNode::deserialize(serde_stacker::Deserializer::new(&mut de))?;
        de.end()?;
        Ok(node)
    }

    /// Iterate over this node and its `next` successors.
    pub fn chain(&self) -> impl Iterator<Item = &ProgramNode> {
        std::iter::successors(Some(self), |node| node.next.as_deref())
    }
}

// Children are detached onto a worklist so freeing a long program does not
// recurse once per block.
impl Drop for ProgramNode {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach_children(self, &mut pending);
        while let Some(mut node) = pending.pop() {
            detach_children(&mut node, &mut pending);
        }
    }
}

fn detach_children(node: &mut ProgramNode, pending: &mut Vec<ProgramNode>) {
    pending.extend(node.value_inputs.drain(..).map(|(_, child)| child));
    pending.extend(node.statement_inputs.drain(..).map(|(_, child)| child));
    if let Some(next) = node.next.take() {
        pending.push(*next);
    }
}

fn literal_fields<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IndexMap<String, Value>> = Option::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|(name, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => {
                    return Err(D::Error::custom(format!("field '{}' is null", name)));
                }
                Value::Array(_) | Value::Object(_) => {
                    return Err(D::Error::custom(format!(
                        "field '{}' must hold a string, number or boolean",
                        name
                    )));
                }
            };
            Ok((name, text))
        })
        .collect()
}

fn nullable_map<'de, D>(deserializer: D) -> Result<IndexMap<String, ProgramNode>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IndexMap<String, ProgramNode>> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default())
}

use blocks::{BLOCKLY_XML_NAMESPACE, ProgramNode};

use crate::Limits;
use crate::error::StructuralError;

/// Serialize a tree into a complete Blockly XML document.
///
/// Does not consult any schema: an unknown block type serializes like any
/// other. Validate first if the output must be schema-conformant.
pub fn serialize(node: &ProgramNode) -> Result<String, StructuralError> {
    serialize_with(node, Limits::default())
}

pub fn serialize_with(node: &ProgramNode, limits: Limits) -> Result<String, StructuralError> {
    let body = block_markup(node, limits)?;
    Ok(format!(
        "<xml xmlns=\"{}\">\n{}\n</xml>",
        BLOCKLY_XML_NAMESPACE, body
    ))
}

/// Serialize a single `<block>` element (with its `next` chain) without the
/// document wrapper.
pub fn serialize_block(node: &ProgramNode) -> Result<String, StructuralError> {
    block_markup(node, Limits::default())
}

fn block_markup(node: &ProgramNode, limits: Limits) -> Result<String, StructuralError> {
    let mut writer = XmlWriter {
        out: String::new(),
        limits,
    };
    writer.write_chain(node, "root", 0)?;
    Ok(writer.out)
}

/// Replace the five XML special characters with their named entities.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    push_escaped(&mut out, text);
    out
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}

struct XmlWriter {
    out: String,
    limits: Limits,
}

impl XmlWriter {
    /// Write `head` and its `next` successors as nested `<next>` elements.
    /// Successors share the head's depth; the closing tags are emitted once
    /// the whole chain has been opened.
    fn write_chain(
        &mut self,
        head: &ProgramNode,
        path: &str,
        depth: usize,
    ) -> Result<(), StructuralError> {
        let mut path = path.to_string();
        let mut open = 0usize;

        for node in head.chain() {
            if open > 0 {
                self.out.push_str("<next>");
            }
            self.write_open_block(node, &path, depth)?;
            open += 1;
            path.push_str(".next");
        }

        for remaining in (0..open).rev() {
            self.out.push_str("</block>");
            if remaining > 0 {
                self.out.push_str("</next>");
            }
        }
        Ok(())
    }

    /// Everything of a block except `next` and the closing tag.
    fn write_open_block(
        &mut self,
        node: &ProgramNode,
        path: &str,
        depth: usize,
    ) -> Result<(), StructuralError> {
        if depth > self.limits.max_depth {
            return Err(StructuralError::DepthExceeded {
                path: path.to_string(),
                limit: self.limits.max_depth,
            });
        }
        if node.block_type.is_empty() {
            return Err(StructuralError::MissingType {
                path: path.to_string(),
            });
        }

        self.out.push_str("<block type=\"");
        push_escaped(&mut self.out, &node.block_type);
        self.out.push_str("\">");

        for (name, value) in &node.fields {
            self.out.push_str("<field name=\"");
            push_escaped(&mut self.out, name);
            self.out.push_str("\">");
            push_escaped(&mut self.out, value);
            self.out.push_str("</field>");
        }

        for (name, child) in &node.value_inputs {
            self.out.push_str("<value name=\"");
            push_escaped(&mut self.out, name);
            self.out.push_str("\">");
            self.write_chain(child, &format!("{}.value_inputs.{}", path, name), depth + 1)?;
            self.out.push_str("</value>");
        }

        for (name, child) in &node.statement_inputs {
            self.out.push_str("<statement name=\"");
            push_escaped(&mut self.out, name);
            self.out.push_str("\">");
            self.write_chain(child, &format!("{}.statement_inputs.{}", path, name), depth + 1)?;
            self.out.push_str("</statement>");
        }

        Ok(())
    }
}

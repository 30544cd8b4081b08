use std::borrow::Cow;
use std::sync::LazyLock;

use blocks::SchemaRegistry;
use regex::Regex;
use thiserror::Error;

static TYPE_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"type="([^"]+)""#).expect("type pattern is a valid regex"));

const ENTITIES: &[(&str, char)] = &[
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&apos;", '\''),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported block detected: {block_type}")]
pub struct UnsupportedBlock {
    pub block_type: String,
}

/// Block types referenced by `type="..."` attributes in `xml` that the
/// registry does not know, in document order without repeats. Attribute
/// values are unescaped before lookup.
///
/// This reads attribute text only; it does not rebuild a tree.
pub fn unsupported_types(registry: &SchemaRegistry, xml: &str) -> Vec<String> {
    let mut unknown: Vec<String> = Vec::new();
    for captures in TYPE_ATTR.captures_iter(xml) {
        let block_type = unescape_attr(&captures[1]);
        if !registry.contains(&block_type) && !unknown.iter().any(|t| *t == block_type) {
            unknown.push(block_type.into_owned());
        }
    }
    unknown
}

/// Fail on the first block type in `xml` the registry does not know.
pub fn audit_markup(registry: &SchemaRegistry, xml: &str) -> Result<(), UnsupportedBlock> {
    match unsupported_types(registry, xml).into_iter().next() {
        Some(block_type) => Err(UnsupportedBlock { block_type }),
        None => Ok(()),
    }
}

/// Undo the five named entities the serializer writes. Anything else after
/// an `&` is kept as is.
fn unescape_attr(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, c)) => {
                out.push(*c);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

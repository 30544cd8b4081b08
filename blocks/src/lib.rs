pub mod descriptor;
pub mod error;
pub mod node;
pub mod normalize;
pub mod registry;
pub mod schema;

pub use descriptor::RawBlockDescriptor;
pub use error::SchemaError;
pub use node::ProgramNode;
pub use normalize::{infer_kind, normalize};
pub use registry::SchemaRegistry;
pub use schema::{BlockKind, BlockSchema, Context};

/// Namespace carried by the outer `<xml>` element of a Blockly document.
pub const BLOCKLY_XML_NAMESPACE: &str = "https://developers.google.com/blockly/xml";

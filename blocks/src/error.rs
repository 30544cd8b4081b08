use thiserror::Error;

/// Errors raised while turning descriptors into schemas or loading schema files.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("block descriptor has no type")]
    MissingType,

    #[error("slot '{name}' of block '{block_type}' is declared under more than one slot kind")]
    ConflictingSlot { block_type: String, name: String },

    #[error("block '{block_type}' has unknown kind '{kind}'")]
    UnknownKind { block_type: String, kind: String },

    #[error("invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),
}

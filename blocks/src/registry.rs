use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::descriptor::RawBlockDescriptor;
use crate::error::SchemaError;
use crate::normalize::normalize;
use crate::schema::BlockSchema;

/// Registry of block schemas, indexed by type.
///
/// Built once and read-only afterwards. To change the schema set, build a new
/// registry.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, BlockSchema>,
    /// Types that appeared more than once during construction.
    duplicates: Vec<String>,
}

impl SchemaRegistry {
    /// Normalize every descriptor and index the results.
    pub fn build<'a, I>(descriptors: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = &'a RawBlockDescriptor>,
    {
        let schemas = descriptors
            .into_iter()
            .map(normalize)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_schemas(schemas))
    }

    /// Index already-normalized schemas. A repeated type overwrites the
    /// earlier entry and is logged.
    pub fn from_schemas<I>(schemas: I) -> Self
    where
        I: IntoIterator<Item = BlockSchema>,
    {
        let mut registry = SchemaRegistry::default();
        for schema in schemas {
            let block_type = schema.block_type.clone();
            if registry.schemas.insert(block_type.clone(), schema).is_some() {
                warn!(block_type = %block_type, "duplicate block schema, keeping the last definition");
                registry.duplicates.push(block_type);
            }
        }
        debug!(
            schemas = registry.schemas.len(),
            duplicates = registry.duplicates.len(),
            "schema registry built"
        );
        registry
    }

    /// Load a normalized schema file (a JSON array of schemas).
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let schemas: Vec<BlockSchema> = serde_json::from_str(text)?;
        Ok(Self::from_schemas(schemas))
    }

    /// Load raw descriptors (a JSON array) and normalize them.
    pub fn from_descriptor_json(text: &str) -> Result<Self, SchemaError> {
        let descriptors: Vec<RawBlockDescriptor> = serde_json::from_str(text)?;
        Self::build(&descriptors)
    }

    pub fn get(&self, block_type: &str) -> Option<&BlockSchema> {
        self.schemas.get(block_type)
    }

    pub fn contains(&self, block_type: &str) -> bool {
        self.schemas.contains_key(block_type)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Registered types in first-insertion order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &BlockSchema> {
        self.schemas.values()
    }

    /// Types that were defined more than once, once per overwrite.
    pub fn duplicate_types(&self) -> &[String] {
        &self.duplicates
    }
}

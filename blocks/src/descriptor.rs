use serde::Deserialize;

/// A block description as supplied by a schema source.
///
/// Loosely shaped: slot presence is given by list membership and the kind is
/// not trusted, only inferred later from `code_sample`. Never used past
/// [`crate::normalize`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBlockDescriptor {
    #[serde(rename = "type", default)]
    pub block_type: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub value_inputs: Vec<String>,
    #[serde(default)]
    pub statement_inputs: Vec<String>,
    /// Generated target code for the block in isolation.
    #[serde(default, rename = "python_sample", alias = "code_sample")]
    pub code_sample: Option<String>,
    #[serde(default)]
    pub xml_template: Option<String>,
}

impl RawBlockDescriptor {
    pub fn new(block_type: impl Into<String>) -> Self {
        RawBlockDescriptor {
            block_type: block_type.into(),
            ..Default::default()
        }
    }

    pub fn with_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_value_inputs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.value_inputs.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_statement_inputs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statement_inputs.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_code_sample(mut self, sample: impl Into<String>) -> Self {
        self.code_sample = Some(sample.into());
        self
    }

    pub fn with_xml_template(mut self, template: impl Into<String>) -> Self {
        self.xml_template = Some(template.into());
        self
    }
}

//! Data types used to define the data this crate works with.

use serde::Serialize;
use serde_json::{Map, Value};

/// The field every document carries its hostname in. It doubles as the
/// document's ID.
pub const HOSTNAME_FIELD: &str = "hostname";

/// A JSON object. Key order follows the source file.
pub type Fields = Map<String, Value>;

/// The default fields shared by every generated document.
#[derive(Clone, Debug, PartialEq)]
pub struct Template(Fields);

impl Template {
    /// Wrap a JSON object as a template.
    pub fn new(fields: Fields) -> Self {
        Self(fields)
    }

    /// The template's fields.
    pub fn fields(&self) -> &Fields {
        &self.0
    }

    /// Whether the template defines its own `hostname`, which every document
    /// will replace.
    pub fn has_hostname(&self) -> bool {
        self.0.contains_key(HOSTNAME_FIELD)
    }

    /// Make the document for `hostname`. The document owns a deep copy of the
    /// template, so later changes to either never show up in the other.
    pub fn document_for(&self, hostname: &str) -> Document {
        let mut fields = self.0.clone();
        fields.insert(HOSTNAME_FIELD.to_string(), Value::String(hostname.to_string()));
        Document {
            id: hostname.to_string(),
            fields,
        }
    }
}

/// One document to be written to the index.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Document {
    /// The key the document is stored under.
    #[serde(skip)]
    id: String,

    /// The document source.
    #[serde(flatten)]
    fields: Fields,
}

impl Document {
    /// The document source.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Mutable access to the document source. Does not change the ID.
    #[cfg(test)]
    pub fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }
}

/// The full ordered set of documents bound for one index.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    /// The target index.
    index_name: String,

    /// The documents, in the order of the hostname file.
    documents: Vec<Document>,
}

impl Batch {
    /// Create a batch targeting `index_name`.
    pub fn new<S: Into<String>>(index_name: S, documents: Vec<Document>) -> Self {
        Self {
            index_name: index_name.into(),
            documents,
        }
    }

    /// The target index.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// The documents, in submission order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Mutable access to the documents.
    #[cfg(test)]
    pub fn documents_mut(&mut self) -> &mut [Document] {
        &mut self.documents
    }

    /// The number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the batch holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// An object that can be indexed using [`ElasticHelper`](crate::ElasticHelper).
pub trait HelperIndexable: Serialize {
    /// The ID that this document should be indexed under. Two documents with
    /// the same ID are considered to be semantically equivalent. If a document
    /// with the given ID is already present in the search index, it will be
    /// overridden if another document with the same ID is added.
    fn doc_id(&self) -> &str;
}

impl HelperIndexable for Document {
    fn doc_id(&self) -> &str {
        &self.id
    }
}

/// Aggregate result of a bulk load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BulkStats {
    /// Documents Elasticsearch accepted.
    pub succeeded: usize,
    /// Documents Elasticsearch rejected.
    pub failed: usize,
}

impl BulkStats {
    /// Every document accounted for.
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl std::ops::AddAssign for BulkStats {
    fn add_assign(&mut self, rhs: Self) {
        self.succeeded += rhs.succeeded;
        self.failed += rhs.failed;
    }
}

/// The JSON type name of `value`, for diagnostics.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

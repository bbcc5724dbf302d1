//! In-memory repository.

use docward_query::{Query, execute};
use docward_types::Document;

use crate::document::InMemoryDocument;

/// A fixed set of documents that listing queries run against.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    documents: Vec<InMemoryDocument>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, doc: InMemoryDocument) -> Self {
        self.documents.push(doc);
        self
    }

    pub fn insert(&mut self, doc: InMemoryDocument) {
        self.documents.push(doc);
    }

    pub fn documents(&self) -> &[InMemoryDocument] {
        &self.documents
    }

    pub fn get(&self, id: &str) -> Option<&InMemoryDocument> {
        self.documents.iter().find(|d| d.id() == id)
    }

    /// Runs `query` and returns the ids of the selected documents.
    pub fn query(&self, query: &Query) -> docward_query::Result<Vec<String>> {
        execute(query, &self.documents)
    }
}

impl FromIterator<InMemoryDocument> for InMemoryRepository {
    fn from_iter<T: IntoIterator<Item = InMemoryDocument>>(iter: T) -> Self {
        Self {
            documents: iter.into_iter().collect(),
        }
    }
}

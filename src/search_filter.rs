use crate::api::models::Document;

/// Substring search over document text
pub struct SearchFilter;

impl SearchFilter {
    /// Case-insensitive match against title, markdown and content.
    /// `query_lower` must already be lowercased.
    pub fn matches_document(doc: &Document, query_lower: &str) -> bool {
        [&doc.title, &doc.markdown, &doc.content]
            .into_iter()
            .any(|field| {
                field
                    .as_deref()
                    .unwrap_or("")
                    .to_lowercase()
                    .contains(query_lower)
            })
    }

    /// Keep the first `limit` matching documents, in their original order
    pub fn filter_documents(docs: Vec<Document>, query: &str, limit: usize) -> Vec<Document> {
        let query_lower = query.to_lowercase();

        docs.into_iter()
            .filter(|doc| Self::matches_document(doc, &query_lower))
            .take(limit)
            .collect()
    }

    /// First document whose id is exactly `id`
    pub fn find_by_id(docs: Vec<Document>, id: &str) -> Option<Document> {
        docs.into_iter().find(|doc| doc.id.as_deref() == Some(id))
    }
}

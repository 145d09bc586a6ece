use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A Granola document. Only the fields we look at are typed; everything else
/// the server sends is kept in `extra` and written back out unchanged.
///
/// A known field holding something other than a string (a numeric `created_at`,
/// a ProseMirror object in `content`) is left in `extra` and the typed field is
/// `None`, so one odd document never fails the whole page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_viewed_panel: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Move a string field out of `fields`; any other non-null value stays put
fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(s)) => Some(s),
        None | Some(Value::Null) => None,
        Some(other) => {
            fields.insert(key.to_string(), other);
            None
        }
    }
}

impl From<Map<String, Value>> for Document {
    fn from(mut fields: Map<String, Value>) -> Self {
        let last_viewed_panel = match fields.remove("last_viewed_panel") {
            None | Some(Value::Null) => None,
            Some(panel) => Some(panel),
        };

        Self {
            id: take_string(&mut fields, "id"),
            title: take_string(&mut fields, "title"),
            content: take_string(&mut fields, "content"),
            markdown: take_string(&mut fields, "markdown"),
            created_at: take_string(&mut fields, "created_at"),
            updated_at: take_string(&mut fields, "updated_at"),
            last_viewed_panel,
            extra: fields,
        }
    }
}

impl Document {
    /// Look up a field the typed struct doesn't know about
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Markdown if present, otherwise the plain content
    pub fn body(&self) -> Option<&str> {
        self.markdown.as_deref().or(self.content.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentsRequest {
    pub limit: usize,
    pub offset: usize,
    pub include_last_viewed_panel: bool,
}

impl DocumentsRequest {
    pub fn page(limit: usize, offset: usize) -> Self {
        Self {
            limit,
            offset,
            include_last_viewed_panel: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentsResponse {
    #[serde(default)]
    pub docs: Option<Vec<Document>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DocumentsResponse {
    pub fn new(docs: Vec<Document>) -> Self {
        Self {
            docs: Some(docs),
            extra: Map::new(),
        }
    }

    /// The page's documents; a missing or null `docs` is an empty page
    pub fn into_docs(self) -> Vec<Document> {
        self.docs.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_keeps_unknown_fields() {
        let raw = json!({
            "id": "doc-1",
            "title": "Weekly sync",
            "notes_plain": "agenda",
            "people": [{"name": "Ada"}],
            "last_viewed_panel": {"type": "doc"},
        });

        let doc: Document = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(doc.id.as_deref(), Some("doc-1"));
        assert_eq!(doc.title.as_deref(), Some("Weekly sync"));
        assert!(doc.content.is_none());
        assert_eq!(doc.field("notes_plain"), Some(&json!("agenda")));
        assert!(!doc.extra.contains_key("title"));
        assert_eq!(doc.last_viewed_panel, Some(json!({"type": "doc"})));

        assert_eq!(serde_json::to_value(&doc).unwrap(), raw);
    }

    #[test]
    fn test_document_null_fields_are_absent() {
        let doc: Document =
            serde_json::from_value(json!({"id": "doc-2", "title": null, "markdown": null}))
                .unwrap();
        assert!(doc.title.is_none());
        assert!(doc.body().is_none());
    }

    #[test]
    fn test_non_string_known_fields_stay_in_extra() {
        let raw = json!({
            "id": 42,
            "title": "Roadmap",
            "created_at": 1700000000000i64,
            "content": {"type": "doc", "content": []},
        });

        let doc: Document = serde_json::from_value(raw.clone()).unwrap();
        assert!(doc.id.is_none());
        assert_eq!(doc.title.as_deref(), Some("Roadmap"));
        assert!(doc.created_at.is_none());
        assert!(doc.content.is_none());
        assert_eq!(doc.field("id"), Some(&json!(42)));
        assert_eq!(doc.field("created_at"), Some(&json!(1700000000000i64)));
        assert_eq!(doc.field("content"), Some(&json!({"type": "doc", "content": []})));

        assert_eq!(serde_json::to_value(&doc).unwrap(), raw);
    }

    #[test]
    fn test_body_prefers_markdown() {
        let doc = Document {
            content: Some("plain".to_string()),
            markdown: Some("# md".to_string()),
            ..Default::default()
        };
        assert_eq!(doc.body(), Some("# md"));
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(DocumentsRequest::page(100, 200)).unwrap();
        assert_eq!(
            body,
            json!({"limit": 100, "offset": 200, "include_last_viewed_panel": true})
        );
    }

    #[test]
    fn test_response_without_docs_is_empty_page() {
        let response: DocumentsResponse =
            serde_json::from_value(json!({"deleted": []})).unwrap();
        assert!(response.into_docs().is_empty());

        let response: DocumentsResponse = serde_json::from_value(json!({"docs": null})).unwrap();
        assert!(response.into_docs().is_empty());
    }
}

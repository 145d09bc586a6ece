use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use granola_client::Document;

const COLUMNS: [&str; 4] = ["id", "title", "created_at", "updated_at"];

pub fn document_row(doc: &Document) -> Vec<String> {
    [&doc.id, &doc.title, &doc.created_at, &doc.updated_at]
        .into_iter()
        .map(|field| field.clone().unwrap_or_default())
        .collect()
}

pub fn display_documents(docs: &[Document]) {
    if docs.is_empty() {
        println!("No documents found.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        COLUMNS
            .iter()
            .map(|c| Cell::new(c).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );

    for doc in docs {
        table.add_row(document_row(doc));
    }

    println!("{table}");
    println!("\n{} documents returned", docs.len());
}

pub fn display_document(doc: &Document) {
    println!("{}", doc.title.as_deref().unwrap_or("(untitled)"));
    println!("id:       {}", doc.id.as_deref().unwrap_or(""));
    if let Some(created) = &doc.created_at {
        println!("created:  {created}");
    }
    if let Some(updated) = &doc.updated_at {
        println!("updated:  {updated}");
    }
    if let Some(body) = doc.body() {
        println!("\n{body}");
    }
}

//! Registering a document variant from outside the core crate.

use folio_core::{
    Document, DocumentFactory, Error, Metadata, Notes, Page, PageRequest, Result,
};
use serde_json::{json, Map, Value as JsonValue};

/// Variant with an integer field, which the payload must supply as a number.
#[derive(Debug, Default)]
struct Recipe {
    title: String,
    metadata: Metadata,
    servings: u64,
}

impl Document for Recipe {
    fn doc_type(&self) -> &str {
        "Recipe"
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn set_title(&mut self, title: String) -> Result<()> {
        self.title = title;
        Ok(())
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn set_metadata(&mut self, metadata: Metadata) -> Result<()> {
        self.metadata = metadata;
        Ok(())
    }

    fn merge_payload(&mut self, payload: &Map<String, JsonValue>) -> Result<()> {
        self.metadata.merge_from(payload)?;
        self.title = self.metadata.title.clone();
        if let Some(servings) = payload.get("Servings") {
            self.servings = servings
                .as_u64()
                .ok_or_else(|| Error::Validation("Servings must be a number".to_string()))?;
        }
        Ok(())
    }

    fn to_value(&self) -> Result<JsonValue> {
        Ok(json!({
            "Title": self.title,
            "Metadata": self.metadata,
            "Servings": self.servings,
        }))
    }
}

fn factory() -> DocumentFactory {
    let mut factory = DocumentFactory::with_builtin_types();
    factory.register_type("Recipe", || Box::new(Recipe::default()));
    factory
}

#[test]
fn test_custom_variant_is_decoded() {
    let doc = factory()
        .decode(&json!({ "DocType": "Recipe", "Title": "Soup", "Servings": 4 }))
        .unwrap();

    assert_eq!(doc.doc_type(), "Recipe");
    assert_eq!(doc.metadata().doc_type, "Recipe");
    assert_eq!(doc.title(), "Soup");
    assert_eq!(doc.to_value().unwrap()["Servings"], 4);
}

#[test]
fn test_custom_variant_rejects_bad_field() {
    let err = factory()
        .decode(&json!({ "DocType": "Recipe", "Servings": "four" }))
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn test_builtin_types_survive_custom_registration() {
    let factory = factory();
    assert!(factory.is_registered(Notes::TYPE));
    assert!(factory.is_registered("Recipe"));
    assert_eq!(factory.registered_types(), vec!["Notes", "Recipe"]);
}

#[test]
fn test_search_results_page_over_metadata() {
    let records: Vec<Metadata> = (0..12)
        .map(|i| Metadata {
            title: format!("doc-{}", i),
            ..Metadata::new(Notes::TYPE)
        })
        .collect();

    let page = Page::paginate(records, PageRequest::new(2, 5).unwrap());
    let titles: Vec<&str> = page.results.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["doc-5", "doc-6", "doc-7", "doc-8", "doc-9"]);
    assert_eq!(page.total_pages, 3);
    assert!(page.has_next && page.has_prev);
}

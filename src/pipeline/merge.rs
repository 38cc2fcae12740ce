//! Merge accumulator: single-page documents in, one PDF byte stream out.
//!
//! Each appended document is renumbered past the previous one's object ids,
//! its catalog and page-tree root are dropped, and its pages are re-parented
//! under one fresh page tree. Page order is append order.

use lopdf::{dictionary, Document, Object, ObjectId};
use tracing::debug;

/// Collects documents until [`MergeAccumulator::finish`] serialises them.
#[derive(Default)]
pub struct MergeAccumulator {
    documents: Vec<Document>,
}

impl MergeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, doc: Document) {
        self.documents.push(doc);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Merge everything appended so far and serialise it.
    ///
    /// An empty accumulator still yields a valid, zero-page PDF; callers
    /// that consider that an error must check [`is_empty`](Self::is_empty).
    pub fn finish(self) -> Result<Vec<u8>, lopdf::Error> {
        let mut merged = Document::with_version("1.5");
        let mut page_ids: Vec<ObjectId> = Vec::new();
        let mut next_id = 1;

        for mut doc in self.documents {
            doc.renumber_objects_with(next_id);
            next_id = doc.max_id + 1;

            // get_pages() is keyed by page number, so values come out in order.
            page_ids.extend(doc.get_pages().into_values());

            for (id, object) in doc.objects {
                if !is_tree_root(&object) {
                    merged.objects.insert(id, object);
                }
            }
        }

        merged.max_id = next_id - 1;
        let pages_id = merged.new_object_id();

        for &page_id in &page_ids {
            if let Ok(page) = merged.get_object_mut(page_id).and_then(Object::as_dict_mut) {
                page.set("Parent", pages_id);
            }
        }

        let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
        merged.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_ids.len() as i64,
            }),
        );

        let catalog_id = merged.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        merged.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        merged.save_to(&mut out)?;
        debug!("Merged {} page(s) → {} bytes", page_ids.len(), out.len());
        Ok(out)
    }
}

/// True for `/Catalog` and `/Pages` dictionaries, which the merge rebuilds.
fn is_tree_root(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type"),
            Ok(Object::Name(name)) if name == b"Catalog" || name == b"Pages"
        ),
        _ => false,
    }
}

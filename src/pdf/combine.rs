//! Combining previously rendered PDFs into one document.

use lopdf::{dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};
use crate::pdf::writer::{PdfJob, RenderedPdf};

/// Merge the given documents into one, preserving input order.
///
/// Every input must parse as a PDF; a corrupt or non-PDF input fails the
/// whole merge with [`Error::IncompatiblePdf`]. With no inputs the result
/// is a valid zero-page document.
pub fn combine(inputs: &[Vec<u8>]) -> Result<RenderedPdf> {
    if inputs.is_empty() {
        return PdfJob::new().finalize();
    }

    let mut merged = Document::with_version("1.4");
    let mut max_id = 1;
    let mut kids: Vec<Object> = Vec::new();
    let mut pages_dicts: Vec<(ObjectId, lopdf::Dictionary)> = Vec::new();
    let pages_id: ObjectId = (1, 0);

    for (index, bytes) in inputs.iter().enumerate() {
        let mut doc = Document::load_mem(bytes).map_err(|e| {
            Error::IncompatiblePdf(format!("input {}: {}", index + 1, e))
        })?;
        doc.renumber_objects_with(max_id + 1);
        max_id = doc.max_id;

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for (id, object) in doc.objects {
            match classify(&object) {
                ObjectClass::Catalog => {}
                ObjectClass::Pages => {
                    if let Object::Dictionary(dict) = object {
                        pages_dicts.push((id, dict));
                    }
                }
                ObjectClass::Other => {
                    merged.objects.insert(id, object);
                }
            }
        }
        for id in page_ids {
            kids.push(id.into());
        }
    }

    // Page objects still point at their old Pages parents; repoint them at
    // the single merged tree and fold inheritable attributes down.
    for (old_pages_id, dict) in &pages_dicts {
        let inherit: Vec<(&[u8], Object)> = [&b"Resources"[..], &b"MediaBox"[..], &b"Rotate"[..]]
            .iter()
            .filter_map(|key| dict.get(key).ok().map(|v| (*key, v.clone())))
            .collect();
        for object in merged.objects.values_mut() {
            if let Object::Dictionary(page) = object {
                let is_child = page
                    .get(b"Parent")
                    .ok()
                    .and_then(|p| p.as_reference().ok())
                    .map(|r| r == *old_pages_id)
                    .unwrap_or(false);
                if !is_child {
                    continue;
                }
                page.set("Parent", pages_id);
                for (key, value) in &inherit {
                    if page.get(key).is_err() {
                        page.set(*key, value.clone());
                    }
                }
            }
        }
    }

    let page_count = kids.len() as u32;
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    merged.max_id = max_id;

    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);

    merged.renumber_objects();
    merged.compress();
    let mut bytes = Vec::new();
    merged.save_to(&mut bytes)?;

    log::info!(
        "combined {} document(s) into {} page(s)",
        inputs.len(),
        page_count
    );
    Ok(RenderedPdf { page_count, bytes })
}

enum ObjectClass {
    Catalog,
    Pages,
    Other,
}

fn classify(object: &Object) -> ObjectClass {
    if let Object::Dictionary(dict) = object {
        if let Ok(Object::Name(name)) = dict.get(b"Type") {
            match name.as_slice() {
                b"Catalog" => return ObjectClass::Catalog,
                b"Pages" => return ObjectClass::Pages,
                _ => {}
            }
        }
    }
    ObjectClass::Other
}

//! Merging extracted .docx parts into one intermediate XML document.
//!
//! The transform engine operates on a single XML input, so the scattered
//! package parts are wrapped in named containers and concatenated under one
//! root. Media assets appear as `<file>` placeholders carrying their draft
//! storage coordinates.

use quick_xml::escape::escape;

use crate::archive::{PartKind, MEDIA_FOLDER};

/// Root element of the merged document.
pub const MERGED_ROOT: &str = "pass1Container";

/// Draft-storage coordinates of one extracted image, recorded in the
/// merged document and resolved by pass 1 into `<img>` references.
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// Base name inside the archive, e.g. `image1.png`
    pub original_name: String,
    /// Unique name the asset was stored under
    pub stored_name: String,
    /// Storage context the asset landed in
    pub context_id: u64,
    /// Draft area item id
    pub item_id: u64,
    /// Resolved public URL of the stored asset
    pub url: String,
}

/// The single XML tree a conversion job feeds into pass 1.
#[derive(Debug, Clone)]
pub struct MergedDocument {
    xml: String,
}

impl MergedDocument {
    /// The merged XML text.
    pub fn as_str(&self) -> &str {
        &self.xml
    }
}

/// Wrap every structural part in its container element and append the
/// images container.
///
/// Parts keep their given order; a part that is absent simply produces no
/// container, and the transform tolerates any subset. Each part's XML
/// declaration is stripped so the result stays a single well-formed
/// document.
pub fn merge(parts: &[(PartKind, String)], images: &[StoredImage]) -> MergedDocument {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push('<');
    xml.push_str(MERGED_ROOT);
    xml.push_str(">\n");

    for (kind, part) in parts {
        let tag = kind.container_tag();
        xml.push('<');
        xml.push_str(tag);
        xml.push('>');
        xml.push_str(strip_declaration(part));
        xml.push_str("</");
        xml.push_str(tag);
        xml.push_str(">\n");
    }

    xml.push_str("<imagesContainer>\n");
    for image in images {
        let filename = format!("{MEDIA_FOLDER}/{}", image.original_name);
        let url = escape(&image.url);
        xml.push_str(&format!(
            "<file filename=\"{}\" contextid=\"{}\" itemid=\"{}\" name=\"{}\" url=\"{}\">{}</file>\n",
            escape(&filename),
            image.context_id,
            image.item_id,
            escape(&image.stored_name),
            url,
            url,
        ));
    }
    xml.push_str("</imagesContainer>\n");

    xml.push_str("</");
    xml.push_str(MERGED_ROOT);
    xml.push('>');

    MergedDocument { xml }
}

/// Drop a leading `<?xml ...?>` declaration, keeping the rest verbatim.
fn strip_declaration(part: &str) -> &str {
    let trimmed = part.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return trimmed[end + 2..].trim_start();
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str, stored: &str) -> StoredImage {
        StoredImage {
            original_name: name.to_string(),
            stored_name: stored.to_string(),
            context_id: 21,
            item_id: 7,
            url: format!("https://files.example/draft/21/7/{stored}"),
        }
    }

    #[test]
    fn test_merge_wraps_present_parts_only() {
        let parts = vec![
            (PartKind::Document, "<w:document><w:body/></w:document>".to_string()),
            (PartKind::Styles, "<w:styles/>".to_string()),
        ];
        let merged = merge(&parts, &[]);
        let xml = merged.as_str();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<pass1Container>"));
        assert!(xml.contains("<wordmlContainer><w:document><w:body/></w:document></wordmlContainer>"));
        assert!(xml.contains("<styleMap><w:styles/></styleMap>"));
        assert!(!xml.contains("<footnotesContainer>"));
        assert!(!xml.contains("<dublinCore>"));
        assert!(xml.trim_end().ends_with("</pass1Container>"));
    }

    #[test]
    fn test_merge_strips_part_declarations() {
        let parts = vec![(
            PartKind::Document,
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<w:document/>"
                .to_string(),
        )];
        let merged = merge(&parts, &[]);
        assert!(merged
            .as_str()
            .contains("<wordmlContainer><w:document/></wordmlContainer>"));
        // Exactly one declaration: the wrapper's own.
        assert_eq!(merged.as_str().matches("<?xml").count(), 1);
    }

    #[test]
    fn test_merge_images_container() {
        let merged = merge(&[], &[image("photo.png", "photo_ab12.png")]);
        let xml = merged.as_str();

        assert!(xml.contains("<imagesContainer>"));
        assert!(xml.contains("filename=\"media/photo.png\""));
        assert!(xml.contains("contextid=\"21\""));
        assert!(xml.contains("itemid=\"7\""));
        assert!(xml.contains("name=\"photo_ab12.png\""));
        // Text content duplicates the url attribute.
        assert!(xml.contains(
            "url=\"https://files.example/draft/21/7/photo_ab12.png\">https://files.example/draft/21/7/photo_ab12.png</file>"
        ));
    }

    #[test]
    fn test_merge_escapes_attribute_values() {
        let mut img = image("a&b.png", "a&b_1.png");
        img.url = "https://files.example/draft?a=1&b=2".to_string();
        let merged = merge(&[], &[img]);
        assert!(merged.as_str().contains("filename=\"media/a&amp;b.png\""));
        assert!(merged.as_str().contains("a=1&amp;b=2"));
    }

    #[test]
    fn test_merge_empty_job_is_well_formed() {
        let merged = merge(&[], &[]);
        assert!(roxmltree::Document::parse(merged.as_str()).is_ok());
    }
}

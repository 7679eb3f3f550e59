//! Unpacking and classifying .docx containers.
//!
//! A .docx file is a ZIP archive holding XML structural parts plus binary
//! media. Extraction walks the archive in entry order and sorts every entry
//! into a recognized structural part, a usable media asset, or nothing.

use std::io::{Cursor, Read};

use crate::error::{Error, Result};

/// Folder convention for embedded media inside the archive.
pub const MEDIA_FOLDER: &str = "media";

/// Image suffixes carried through to draft storage; anything else embedded
/// under the media folder (wmf, emf, bmp...) is silently dropped.
const ACCEPTED_IMAGE_SUFFIXES: &[&str] = &["gif", "png", "jpg", "jpeg"];

/// Recognized structural XML parts of a .docx package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    /// word/document.xml (the document body)
    Document,
    /// docProps/core.xml (Dublin Core properties: title, creator)
    CoreProps,
    /// docProps/custom.xml (custom properties)
    CustomProps,
    /// word/styles.xml (style definitions)
    Styles,
    /// word/_rels/document.xml.rels (relationship table for the body)
    DocumentRels,
    /// word/footnotes.xml
    Footnotes,
    /// word/_rels/footnotes.xml.rels
    FootnoteRels,
}

impl PartKind {
    /// Map an archive entry path to a structural part, if recognized.
    pub fn from_entry_path(path: &str) -> Option<PartKind> {
        match path {
            "word/document.xml" => Some(PartKind::Document),
            "docProps/core.xml" => Some(PartKind::CoreProps),
            "docProps/custom.xml" => Some(PartKind::CustomProps),
            "word/styles.xml" => Some(PartKind::Styles),
            "word/_rels/document.xml.rels" => Some(PartKind::DocumentRels),
            "word/footnotes.xml" => Some(PartKind::Footnotes),
            "word/_rels/footnotes.xml.rels" => Some(PartKind::FootnoteRels),
            _ => None,
        }
    }

    /// Container element wrapped around this part in the merged document.
    pub fn container_tag(&self) -> &'static str {
        match self {
            PartKind::Document => "wordmlContainer",
            PartKind::CoreProps => "dublinCore",
            PartKind::CustomProps => "customProps",
            PartKind::Styles => "styleMap",
            PartKind::DocumentRels => "documentLinks",
            PartKind::Footnotes => "footnotesContainer",
            PartKind::FootnoteRels => "footnoteLinks",
        }
    }
}

/// A binary image pulled from the archive's media folder.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    /// Base name inside the archive, e.g. `image1.png`
    pub original_name: String,
    /// Lowercased suffix without the dot
    pub suffix: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
}

/// The classified contents of one uploaded .docx file.
///
/// Owned by a single conversion job and discarded once merged.
#[derive(Debug, Default)]
pub struct SourceArchive {
    /// Structural parts in archive entry order, as XML text
    pub parts: Vec<(PartKind, String)>,
    /// Media assets in archive entry order
    pub media: Vec<MediaAsset>,
}

impl SourceArchive {
    /// Look up a structural part by kind.
    pub fn part(&self, kind: PartKind) -> Option<&str> {
        self.parts
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, xml)| xml.as_str())
    }
}

/// Open a .docx byte buffer and classify its entries.
///
/// Fails with [`Error::CorruptArchive`] when the container is not a readable
/// ZIP. Entries that are neither a recognized part nor an accepted media
/// asset are skipped without error.
pub fn extract(data: &[u8]) -> Result<SourceArchive> {
    let mut zip = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| Error::CorruptArchive(e.to_string()))?;

    let mut archive = SourceArchive::default();
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();

        if let Some(kind) = PartKind::from_entry_path(&name) {
            let mut xml = String::new();
            entry
                .read_to_string(&mut xml)
                .map_err(|e| Error::CorruptArchive(format!("{name}: {e}")))?;
            archive.parts.push((kind, strip_bom(&xml).to_string()));
        } else if name.contains(MEDIA_FOLDER) {
            if let Some(asset) = read_media_entry(&name, &mut entry)? {
                archive.media.push(asset);
            }
        } else {
            log::debug!("ignoring archive entry {name}");
        }
    }

    Ok(archive)
}

fn read_media_entry(name: &str, entry: &mut impl Read) -> Result<Option<MediaAsset>> {
    let base = name.rsplit('/').next().unwrap_or(name);
    let suffix = match base.rsplit_once('.') {
        Some((_, s)) => s.to_ascii_lowercase(),
        None => return Ok(None),
    };
    if !ACCEPTED_IMAGE_SUFFIXES.contains(&suffix.as_str()) {
        log::debug!("ignoring unsupported media entry {name}");
        return Ok(None);
    }

    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| Error::CorruptArchive(format!("{name}: {e}")))?;
    Ok(Some(MediaAsset {
        original_name: base.to_string(),
        suffix,
        bytes,
    }))
}

fn strip_bom(s: &str) -> &str {
    s.strip_prefix('\u{FEFF}').unwrap_or(s)
}

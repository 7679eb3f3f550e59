//! PDF format detection and version acceptance.
//!
//! Used by the PDF-input pipeline variant to reject files whose header
//! version exceeds the supported ceiling before combining.

use crate::error::{Error, Result};

/// A parsed PDF header version such as 1.4 or 2.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PdfVersion {
    /// Major version digit
    pub major: u8,
    /// Minor version digit
    pub minor: u8,
}

impl PdfVersion {
    /// Highest version the combine step accepts by default.
    ///
    /// The downstream annotation tooling the combined artifact feeds cannot
    /// import files above 1.4, so newer inputs are recorded as invalid.
    pub const DEFAULT_CEILING: PdfVersion = PdfVersion { major: 1, minor: 4 };
}

impl std::fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// Parse the header version from the first bytes of a file.
///
/// # Returns
/// * `Ok(PdfVersion)` if the data starts with a valid PDF header
/// * `Err(Error::IncompatiblePdf)` if the data is not a PDF
pub fn detect_version(data: &[u8]) -> Result<PdfVersion> {
    if data.len() < PDF_MAGIC.len() + VERSION_LEN || !data.starts_with(PDF_MAGIC) {
        return Err(Error::IncompatiblePdf("missing %PDF- header".into()));
    }

    let version = &data[PDF_MAGIC.len()..PDF_MAGIC.len() + VERSION_LEN];
    match version {
        [major @ b'0'..=b'9', b'.', minor @ b'0'..=b'9'] => Ok(PdfVersion {
            major: major - b'0',
            minor: minor - b'0',
        }),
        _ => Err(Error::UnsupportedVersion(
            String::from_utf8_lossy(version).to_string(),
        )),
    }
}

/// Check if bytes start with a valid PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_version(data).is_ok()
}

/// Check whether the file's header version is at or below the ceiling.
///
/// Non-PDF data is not acceptable either; the caller distinguishes the two
/// cases through [`detect_version`] when it needs a reason.
pub fn is_acceptable_version(data: &[u8], ceiling: PdfVersion) -> bool {
    matches!(detect_version(data), Ok(v) if v <= ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_valid_pdf() {
        let data = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3";
        let version = detect_version(data).unwrap();
        assert_eq!(version, PdfVersion { major: 1, minor: 4 });
        assert_eq!(version.to_string(), "1.4");
    }

    #[test]
    fn test_detect_pdf_2_0() {
        let version = detect_version(b"%PDF-2.0\n%binary").unwrap();
        assert_eq!(version, PdfVersion { major: 2, minor: 0 });
    }

    #[test]
    fn test_detect_invalid_format() {
        assert!(matches!(
            detect_version(b"<!DOCTYPE html>"),
            Err(Error::IncompatiblePdf(_))
        ));
    }

    #[test]
    fn test_detect_too_short() {
        assert!(detect_version(b"%PDF").is_err());
    }

    #[test]
    fn test_detect_garbled_version() {
        assert!(matches!(
            detect_version(b"%PDF-x.y\n"),
            Err(Error::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_is_pdf_bytes() {
        assert!(is_pdf_bytes(b"%PDF-1.7\n"));
        assert!(!is_pdf_bytes(b"Not a PDF"));
        assert!(!is_pdf_bytes(b""));
    }

    #[test]
    fn test_version_ceiling() {
        let ceiling = PdfVersion::DEFAULT_CEILING;
        assert!(is_acceptable_version(b"%PDF-1.3\n", ceiling));
        assert!(is_acceptable_version(b"%PDF-1.4\n", ceiling));
        assert!(!is_acceptable_version(b"%PDF-1.5\n", ceiling));
        assert!(!is_acceptable_version(b"%PDF-2.0\n", ceiling));
        assert!(!is_acceptable_version(b"plain text", ceiling));
    }

    #[test]
    fn test_version_ordering() {
        let v14 = PdfVersion { major: 1, minor: 4 };
        let v17 = PdfVersion { major: 1, minor: 7 };
        let v20 = PdfVersion { major: 2, minor: 0 };
        assert!(v14 < v17);
        assert!(v17 < v20);
    }
}

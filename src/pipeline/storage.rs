//! Collaborator traits for blob and metadata persistence.
//!
//! The surrounding platform owns file areas and the submission table; the
//! pipeline talks to both through these traits. In-memory implementations
//! back the test suite and small embedded uses.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lifecycle state of a submission, persisted as a numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    NotSubmitted,
    Submitted,
    Responded,
    Empty,
}

impl SubmissionStatus {
    /// Stable storage code.
    pub fn code(self) -> u8 {
        match self {
            SubmissionStatus::NotSubmitted => 0,
            SubmissionStatus::Submitted => 1,
            SubmissionStatus::Responded => 2,
            SubmissionStatus::Empty => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(SubmissionStatus::NotSubmitted),
            1 => Some(SubmissionStatus::Submitted),
            2 => Some(SubmissionStatus::Responded),
            3 => Some(SubmissionStatus::Empty),
            _ => None,
        }
    }
}

/// Row recorded for a processed submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub assignment_id: u64,
    pub submission_id: u64,
    pub page_count: u32,
    pub status: SubmissionStatus,
}

/// One stored blob as seen through a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub filename: String,
    pub size: u64,
}

/// File-area persistence owned by the platform.
///
/// Listings come back in the area's sort order, which the in-memory
/// implementation models as filename order. `delete` of an absent blob is
/// not an error.
pub trait BlobStorage {
    fn list(&self, area: &str, submission_id: u64) -> Result<Vec<FileRecord>>;
    fn read(&self, area: &str, submission_id: u64, filename: &str) -> Result<Vec<u8>>;
    fn write(&mut self, area: &str, submission_id: u64, filename: &str, bytes: &[u8])
        -> Result<()>;
    fn delete(&mut self, area: &str, submission_id: u64, filename: &str) -> Result<()>;
    fn exists(&self, area: &str, submission_id: u64, filename: &str) -> bool;
}

/// Submission-table persistence owned by the platform.
pub trait MetadataStore {
    fn upsert(&mut self, record: SubmissionRecord) -> Result<()>;
    fn fetch(&self, assignment_id: u64, submission_id: u64) -> Result<Option<SubmissionRecord>>;
}

/// Map-backed [`BlobStorage`].
#[derive(Debug, Default)]
pub struct MemoryBlobStorage {
    areas: HashMap<(String, u64), BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStorage for MemoryBlobStorage {
    fn list(&self, area: &str, submission_id: u64) -> Result<Vec<FileRecord>> {
        let files = self
            .areas
            .get(&(area.to_string(), submission_id))
            .map(|files| {
                files
                    .iter()
                    .map(|(name, bytes)| FileRecord {
                        filename: name.clone(),
                        size: bytes.len() as u64,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(files)
    }

    fn read(&self, area: &str, submission_id: u64, filename: &str) -> Result<Vec<u8>> {
        self.areas
            .get(&(area.to_string(), submission_id))
            .and_then(|files| files.get(filename))
            .cloned()
            .ok_or_else(|| {
                Error::Storage(format!("no blob {area}/{submission_id}/{filename}"))
            })
    }

    fn write(
        &mut self,
        area: &str,
        submission_id: u64,
        filename: &str,
        bytes: &[u8],
    ) -> Result<()> {
        self.areas
            .entry((area.to_string(), submission_id))
            .or_default()
            .insert(filename.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&mut self, area: &str, submission_id: u64, filename: &str) -> Result<()> {
        if let Some(files) = self.areas.get_mut(&(area.to_string(), submission_id)) {
            files.remove(filename);
        }
        Ok(())
    }

    fn exists(&self, area: &str, submission_id: u64, filename: &str) -> bool {
        self.areas
            .get(&(area.to_string(), submission_id))
            .map(|files| files.contains_key(filename))
            .unwrap_or(false)
    }
}

/// Map-backed [`MetadataStore`].
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: HashMap<(u64, u64), SubmissionRecord>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn upsert(&mut self, record: SubmissionRecord) -> Result<()> {
        self.records
            .insert((record.assignment_id, record.submission_id), record);
        Ok(())
    }

    fn fetch(&self, assignment_id: u64, submission_id: u64) -> Result<Option<SubmissionRecord>> {
        Ok(self.records.get(&(assignment_id, submission_id)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip() {
        for status in [
            SubmissionStatus::NotSubmitted,
            SubmissionStatus::Submitted,
            SubmissionStatus::Responded,
            SubmissionStatus::Empty,
        ] {
            assert_eq!(SubmissionStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(SubmissionStatus::from_code(7), None);
    }

    #[test]
    fn test_record_serializes_with_status_name() {
        let record = SubmissionRecord {
            assignment_id: 1,
            submission_id: 2,
            page_count: 4,
            status: SubmissionStatus::Submitted,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"status\":\"Submitted\""));
        let back: SubmissionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_memory_blobs_list_in_name_order() {
        let mut blobs = MemoryBlobStorage::new();
        blobs.write("draft", 1, "b.docx", b"2").unwrap();
        blobs.write("draft", 1, "a.docx", b"1").unwrap();
        let listed = blobs.list("draft", 1).unwrap();
        assert_eq!(listed[0].filename, "a.docx");
        assert_eq!(listed[1].filename, "b.docx");
    }

    #[test]
    fn test_memory_blobs_scope_by_area_and_id() {
        let mut blobs = MemoryBlobStorage::new();
        blobs.write("draft", 1, "a.docx", b"1").unwrap();
        assert!(blobs.list("final", 1).unwrap().is_empty());
        assert!(blobs.list("draft", 2).unwrap().is_empty());
        assert!(blobs.read("draft", 2, "a.docx").is_err());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut blobs = MemoryBlobStorage::new();
        blobs.write("draft", 1, "a.docx", b"1").unwrap();
        blobs.delete("draft", 1, "a.docx").unwrap();
        blobs.delete("draft", 1, "a.docx").unwrap();
        assert!(!blobs.exists("draft", 1, "a.docx"));
    }

    #[test]
    fn test_metadata_upsert_replaces() {
        let mut store = MemoryMetadataStore::new();
        let mut record = SubmissionRecord {
            assignment_id: 1,
            submission_id: 2,
            page_count: 1,
            status: SubmissionStatus::Submitted,
        };
        store.upsert(record.clone()).unwrap();
        record.page_count = 3;
        store.upsert(record.clone()).unwrap();
        assert_eq!(store.fetch(1, 2).unwrap(), Some(record));
    }
}

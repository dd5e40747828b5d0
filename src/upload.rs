//! Upload pipeline and bucket housekeeping.
//!
//! Files are uploaded one at a time in submission order. Each file gets
//! its own timestamped key and its own [`UploadResult`]; a failure is
//! recorded against that file and the batch carries on.
//!
//! ```text
//! FileInput ──▶ sanitize ──▶ <folder>/<YYYYMMDD_HHMMSS>_<name> ──▶ ObjectStore::put_object
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::content_type::guess_content_type;
use crate::models::{FileInput, StoredObject, UploadResult, UploadStatus};
use crate::progress::{UploadProgressEvent, UploadProgressReporter};
use crate::sanitize::sanitize_filename;
use crate::traits::{ObjectStore, PutRequest};

/// Source of the current time for key prefixes.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Outcome of a batch, in submission order.
#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    results: Vec<UploadResult>,
}

impl UploadReport {
    pub fn push(&mut self, result: UploadResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[UploadResult] {
        &self.results
    }

    /// Result for a file by its original name (the last one if repeated).
    pub fn get(&self, original_name: &str) -> Option<&UploadResult> {
        self.results
            .iter()
            .rev()
            .find(|r| r.original_name == original_name)
    }

    /// Results keyed by original name.
    pub fn by_name(&self) -> HashMap<&str, &UploadResult> {
        self.results
            .iter()
            .map(|r| (r.original_name.as_str(), r))
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Upload every file under `folder`, collecting one result per file.
pub async fn upload_files(
    store: &dyn ObjectStore,
    folder: &str,
    files: &[FileInput],
    clock: &dyn Clock,
    progress: &dyn UploadProgressReporter,
) -> UploadReport {
    let mut report = UploadReport::default();
    let total = files.len();

    for (i, file) in files.iter().enumerate() {
        progress.report(UploadProgressEvent {
            name: file.name.clone(),
            n: i + 1,
            total,
        });
        report.push(upload_one(store, folder, file, clock).await);
    }

    if report.succeeded() > 0 {
        info!(count = report.succeeded(), "uploaded files");
    }
    if report.failed() > 0 {
        warn!(count = report.failed(), "failed to upload files");
    }
    report
}

async fn upload_one(
    store: &dyn ObjectStore,
    folder: &str,
    file: &FileInput,
    clock: &dyn Clock,
) -> UploadResult {
    let timestamp = clock.now().format("%Y%m%d_%H%M%S").to_string();
    let key = format!("{}/{}_{}", folder, timestamp, sanitize_filename(&file.name));

    let mut metadata = BTreeMap::new();
    metadata.insert("original_filename".to_string(), file.name.clone());
    metadata.insert("upload_timestamp".to_string(), timestamp);
    metadata.insert("folder".to_string(), folder.to_string());
    metadata.insert("file_size".to_string(), file.size().to_string());

    let request = PutRequest {
        key: key.clone(),
        body: file.bytes.clone(),
        content_type: guess_content_type(&file.name),
        metadata,
    };

    match store.put_object(request).await {
        Ok(()) => {
            info!(file = %file.name, %key, "upload successful");
            UploadResult {
                original_name: file.name.clone(),
                message: format!("Uploaded successfully as {}", key),
                stored_key: Some(key),
                status: UploadStatus::Success,
            }
        }
        Err(e) => {
            error!(file = %file.name, error = %e, "upload failed");
            failed(&file.name, format!("Failed to upload: {}", e))
        }
    }
}

/// An error result for a file that never reached the store.
pub fn failed(original_name: &str, message: impl Into<String>) -> UploadResult {
    UploadResult {
        original_name: original_name.to_string(),
        stored_key: None,
        status: UploadStatus::Error,
        message: message.into(),
    }
}

/// List stored files under `prefix`. Failures yield an empty list.
pub async fn list_files(store: &dyn ObjectStore, prefix: &str) -> Vec<StoredObject> {
    store.list_objects(prefix).await.unwrap_or_else(|e| {
        error!(prefix, error = %e, "failed to list files");
        Vec::new()
    })
}

/// Delete one object; `false` if the store refused.
pub async fn delete_file(store: &dyn ObjectStore, key: &str) -> bool {
    match store.delete_object(key).await {
        Ok(()) => {
            info!(key, "deleted file");
            true
        }
        Err(e) => {
            error!(key, error = %e, "failed to delete file");
            false
        }
    }
}

/// Group objects by their folder, folders sorted by name.
pub fn group_by_folder(objects: &[StoredObject]) -> BTreeMap<&str, Vec<&StoredObject>> {
    let mut groups: BTreeMap<&str, Vec<&StoredObject>> = BTreeMap::new();
    for obj in objects {
        groups.entry(obj.folder.as_str()).or_default().push(obj);
    }
    groups
}

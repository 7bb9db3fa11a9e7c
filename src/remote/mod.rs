//! The conversion-service boundary.
//!
//! [`ConversionService`] is the seam between the pipeline and the remote
//! conversion API: upload, job creation, polling, task retrieval, download,
//! and best-effort cancellation. The pipeline only ever talks to this trait,
//! so tests drive the full state machine with an in-process stub and the
//! production path plugs in [`http::HttpConversionService`].
//!
//! Responses are decoded **once at this boundary** into the types below.
//! The service's payloads are loosely shaped — tasks may omit names or
//! operations, results may omit files — so every field is defaulted at
//! deserialization time and the core never inspects raw JSON.

pub mod http;

use crate::error::ConvertError;
use crate::profile::ConversionProfile;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::Deserialize;
use std::path::Path;
use std::pin::Pin;

/// Streamed body of a downloaded result file.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ConvertError>> + Send>>;

/// A job as reported by the service: overall status plus its task list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobView {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tasks: Vec<TaskView>,
}

/// One task descriptor inside a job's task list.
///
/// The service does not guarantee any of these fields; absent values decode
/// as empty strings rather than failing the whole job fetch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskView {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub operation: String,
}

/// A single task fetched directly, with its result payload if present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskHandle {
    #[serde(rename = "id", default)]
    pub task_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub result: Option<TaskPayload>,
}

/// Result payload of a finished task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPayload {
    #[serde(default)]
    pub files: Vec<ExportFile>,
}

/// One downloadable file in an export task's result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportFile {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub filename: String,
}

/// Operations the pipeline consumes from the remote conversion service.
///
/// Implementations must be `Send + Sync`; one instance is shared across all
/// concurrently-running entries.
#[async_trait]
pub trait ConversionService: Send + Sync {
    /// Create an import task and upload the file's bytes to it.
    async fn upload_file(&self, path: &Path) -> Result<TaskHandle, ConvertError>;

    /// Submit a two-stage job: a convert task reading the upload, and an
    /// export task producing a download URL. Returns the job id.
    async fn create_job(
        &self,
        upload_task_id: &str,
        convert_name: &str,
        export_name: &str,
        profile: &ConversionProfile,
    ) -> Result<String, ConvertError>;

    /// Fetch a job's current status and task list.
    async fn get_job(&self, job_id: &str) -> Result<JobView, ConvertError>;

    /// Fetch a single task, including its result payload.
    async fn get_task(&self, job_id: &str, task_id: &str) -> Result<TaskHandle, ConvertError>;

    /// Open a byte stream for a result URL.
    async fn download(&self, url: &str) -> Result<ByteStream, ConvertError>;

    /// Best-effort remote cancellation of one task.
    async fn cancel_task(&self, job_id: &str, task_id: &str) -> Result<(), ConvertError>;

    /// Best-effort remote cancellation of a whole job.
    async fn cancel_job(&self, job_id: &str) -> Result<(), ConvertError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_decodes_with_missing_task_fields() {
        let json = r#"{
            "status": "FINISHED",
            "tasks": [
                { "id": "t-1", "operation": "convert" },
                { "name": "export-abc" },
                { "id": "t-2", "name": "export-abc", "operation": "export/url" }
            ]
        }"#;
        let job: JobView = serde_json::from_str(json).unwrap();
        assert_eq!(job.status, "FINISHED");
        assert_eq!(job.tasks.len(), 3);
        assert_eq!(job.tasks[0].name, "");
        assert_eq!(job.tasks[1].id, "");
        assert_eq!(job.tasks[2].operation, "export/url");
    }

    #[test]
    fn job_decodes_with_no_task_list() {
        let job: JobView = serde_json::from_str(r#"{ "status": "processing" }"#).unwrap();
        assert!(job.tasks.is_empty());
    }

    #[test]
    fn task_handle_decodes_without_result() {
        let task: TaskHandle = serde_json::from_str(r#"{ "id": "t-9", "status": "waiting" }"#).unwrap();
        assert_eq!(task.task_id, "t-9");
        assert!(task.result.is_none());
    }

    #[test]
    fn task_result_decodes_with_empty_files() {
        let task: TaskHandle =
            serde_json::from_str(r#"{ "id": "t-9", "status": "finished", "result": {} }"#).unwrap();
        let result = task.result.expect("result present");
        assert!(result.files.is_empty());
    }
}

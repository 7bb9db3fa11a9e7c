//! reqwest implementation of [`ConversionService`] against a
//! CloudConvert-style v2 REST API.
//!
//! ## Upload flow
//!
//! The service does not accept file bytes directly. `POST /v2/import/upload`
//! creates an import task whose result carries a pre-signed multipart form
//! (URL plus opaque parameters); the file is then streamed to that form with
//! the parameters attached verbatim. The import task id is what later jobs
//! reference as their input.
//!
//! Non-2xx responses are parsed into [`ApiFailure`] so the user sees the
//! service's own error code and message, not just a status line.

use crate::error::{ApiFailure, ConvertError};
use crate::profile::ConversionProfile;
use crate::remote::{ByteStream, ConversionService, JobView, TaskHandle};
use async_trait::async_trait;
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.cloudconvert.com";

/// HTTP client for the conversion service. Cheap to clone is not needed —
/// share it as `Arc<dyn ConversionService>`.
pub struct HttpConversionService {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpConversionService {
    /// Build a client for the default API endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConvertError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Build a client for a custom endpoint (sandbox, on-prem gateway).
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ConvertError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConvertError::InvalidConfig("API key not configured".into()));
        }
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Pass 2xx responses through; parse anything else into [`ApiFailure`].
    async fn check(&self, resp: reqwest::Response) -> Result<reqwest::Response, ConvertError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body: ErrorBody = resp.json().await.unwrap_or_default();
        Err(ConvertError::Api(ApiFailure {
            http_status: Some(status.as_u16()),
            http_reason: status.canonical_reason().map(str::to_owned),
            code: body.code,
            message: body.message,
            errors: body.errors,
        }))
    }
}

#[async_trait]
impl ConversionService for HttpConversionService {
    async fn upload_file(&self, path: &Path) -> Result<TaskHandle, ConvertError> {
        let resp = self
            .http
            .post(self.url("/v2/import/upload"))
            .bearer_auth(&self.api_key)
            .json(&json!({}))
            .send()
            .await?;
        let task: Envelope<UploadTask> = self.check(resp).await?.json().await?;

        let form = task
            .data
            .result
            .and_then(|r| r.form)
            .ok_or(ConvertError::MissingUploadForm)?;
        debug!("uploading {} to import task {}", path.display(), task.data.id);

        let mut form_data = reqwest::multipart::Form::new();
        for (key, value) in &form.parameters {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            form_data = form_data.text(key.clone(), text);
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let file = tokio::fs::File::open(path).await?;
        let part = reqwest::multipart::Part::stream(reqwest::Body::wrap_stream(
            ReaderStream::new(file),
        ))
        .file_name(file_name);
        form_data = form_data.part("file", part);

        // the pre-signed form URL carries its own authorization
        let resp = self.http.post(&form.url).multipart(form_data).send().await?;
        self.check(resp).await?;

        Ok(TaskHandle {
            task_id: task.data.id,
            status: task.data.status,
            result: None,
        })
    }

    async fn create_job(
        &self,
        upload_task_id: &str,
        convert_name: &str,
        export_name: &str,
        profile: &ConversionProfile,
    ) -> Result<String, ConvertError> {
        let mut convert_task = Map::new();
        convert_task.insert("operation".to_string(), json!("convert"));
        convert_task.insert("input".to_string(), json!(upload_task_id));
        convert_task.insert("input_format".to_string(), json!(profile.input_format));
        convert_task.insert("output_format".to_string(), json!(profile.output_format));
        for (key, value) in &profile.options {
            convert_task.insert(key.clone(), value.clone());
        }

        let mut tasks = Map::new();
        tasks.insert(convert_name.to_string(), Value::Object(convert_task));
        tasks.insert(
            export_name.to_string(),
            json!({ "operation": "export/url", "input": convert_name }),
        );

        let resp = self
            .http
            .post(self.url("/v2/jobs"))
            .bearer_auth(&self.api_key)
            .json(&json!({ "tasks": tasks }))
            .send()
            .await?;
        let job: Envelope<CreatedJob> = self.check(resp).await?.json().await?;
        Ok(job.data.id)
    }

    async fn get_job(&self, job_id: &str) -> Result<JobView, ConvertError> {
        let resp = self
            .http
            .get(self.url(&format!("/v2/jobs/{job_id}")))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let job: Envelope<JobView> = self.check(resp).await?.json().await?;
        Ok(job.data)
    }

    async fn get_task(&self, _job_id: &str, task_id: &str) -> Result<TaskHandle, ConvertError> {
        let resp = self
            .http
            .get(self.url(&format!("/v2/tasks/{task_id}")))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let task: Envelope<TaskHandle> = self.check(resp).await?.json().await?;
        Ok(task.data)
    }

    async fn download(&self, url: &str) -> Result<ByteStream, ConvertError> {
        // export URLs are pre-signed; no bearer token
        let resp = self.http.get(url).send().await?;
        let resp = self.check(resp).await?;
        Ok(Box::pin(resp.bytes_stream().map_err(ConvertError::from)))
    }

    async fn cancel_task(&self, _job_id: &str, task_id: &str) -> Result<(), ConvertError> {
        let resp = self
            .http
            .delete(self.url(&format!("/v2/tasks/{task_id}")))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        self.check(resp).await?;
        Ok(())
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), ConvertError> {
        let resp = self
            .http
            .delete(self.url(&format!("/v2/jobs/{job_id}")))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        self.check(resp).await?;
        Ok(())
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct UploadTask {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    result: Option<UploadResult>,
}

#[derive(Debug, Default, Deserialize)]
struct UploadResult {
    #[serde(default)]
    form: Option<UploadForm>,
}

#[derive(Debug, Deserialize)]
struct UploadForm {
    url: String,
    #[serde(default)]
    parameters: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct CreatedJob {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_api_key_is_rejected() {
        let err = HttpConversionService::new("  ").unwrap_err();
        assert!(err.to_string().contains("API key not configured"));
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let svc = HttpConversionService::with_base_url("key", "https://sandbox.example/").unwrap();
        assert_eq!(svc.url("/v2/jobs"), "https://sandbox.example/v2/jobs");
    }

    #[test]
    fn upload_form_decodes_from_import_task() {
        let json = r#"{
            "data": {
                "id": "import-1",
                "status": "waiting",
                "result": {
                    "form": {
                        "url": "https://upload.example/form",
                        "parameters": { "key": "abc", "expires": 1234 }
                    }
                }
            }
        }"#;
        let task: Envelope<UploadTask> = serde_json::from_str(json).unwrap();
        let form = task.data.result.unwrap().form.unwrap();
        assert_eq!(form.url, "https://upload.example/form");
        assert_eq!(form.parameters.len(), 2);
    }

    #[test]
    fn error_body_tolerates_missing_fields() {
        let body: ErrorBody = serde_json::from_str(r#"{ "message": "quota exceeded" }"#).unwrap();
        assert_eq!(body.message.as_deref(), Some("quota exceeded"));
        assert!(body.code.is_none());
        assert!(body.errors.is_none());
    }
}

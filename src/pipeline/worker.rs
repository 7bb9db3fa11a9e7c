//! The per-entry conversion state machine.
//!
//! One invocation of [`run_entry`] drives a single batch entry from `Queued`
//! to a terminal state: validate, upload, submit the two-stage job, poll
//! until the job settles, download the export, place it atomically. Steps
//! are strictly sequential; each remote call is attempted exactly once.
//!
//! The shared cancellation flag is read before every remote interaction and
//! on every poll. Cancellation never aborts an in-flight request — the entry
//! simply settles into `Canceled` at the next checkpoint.
//!
//! Every failure after entry validation is caught here and normalized into
//! the entry's message; an entry is never left in a non-terminal state.

use crate::config::BatchConfig;
use crate::entry::{BatchEntry, EntryStatus};
use crate::error::{user_message, ConvertError};
use crate::pipeline::{naming, save, validate::Validator};
use crate::remote::{ConversionService, TaskView};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Outcome of the poll loop: either the export task to download from, or a
/// cooperative stop. Cancellation is not an error.
enum PollVerdict {
    Finished { export_task_id: String },
    Canceled,
}

/// Drive one entry to a terminal state. Never returns an error — failures
/// land in the entry itself.
pub(crate) async fn run_entry(
    entry: &BatchEntry,
    service: &Arc<dyn ConversionService>,
    validator: &Validator,
    config: &BatchConfig,
    cancel: &AtomicBool,
) {
    debug!("worker started for {}", entry.input().display());

    // Re-validate even though the scheduler already did: the file may have
    // changed between submission and execution.
    if let Err(reason) = validator.validate(entry.input(), entry.profile()) {
        warn!("validation failed for {}: {reason}", entry.input().display());
        entry.mark_failed(reason);
        return;
    }
    if cancel.load(Ordering::SeqCst) {
        debug!("worker canceled before upload for {}", entry.input().display());
        entry.mark_canceled();
        return;
    }
    entry.set_status(EntryStatus::Uploading);

    if let Err(e) = execute(entry, service, config, cancel).await {
        let message = user_message(&e);
        error!("worker failed for {}: {message}", entry.input().display());
        entry.mark_failed(message);
    }
}

async fn execute(
    entry: &BatchEntry,
    service: &Arc<dyn ConversionService>,
    config: &BatchConfig,
    cancel: &AtomicBool,
) -> Result<(), ConvertError> {
    debug!("creating upload task for {}", entry.input().display());
    let upload = service.upload_file(entry.input()).await?;
    entry.set_upload_task_id(&upload.task_id);
    debug!("upload task created: task_id={}", upload.task_id);

    if cancel.load(Ordering::SeqCst) {
        debug!("worker canceled after upload for {}", entry.input().display());
        entry.mark_canceled();
        return Ok(());
    }

    let convert_name = format!("convert-{}", Uuid::new_v4());
    let export_name = format!("export-{}", Uuid::new_v4());
    let job_id = service
        .create_job(&upload.task_id, &convert_name, &export_name, entry.profile())
        .await?;
    entry.set_job_id(&job_id);
    debug!("conversion job created: job_id={job_id}");
    entry.set_status(EntryStatus::Converting);

    let export_task_id = match poll_until_complete(service, &job_id, &export_name, config, cancel)
        .await?
    {
        PollVerdict::Finished { export_task_id } => export_task_id,
        PollVerdict::Canceled => {
            entry.mark_canceled();
            return Ok(());
        }
    };
    entry.set_export_task_id(&export_task_id);

    if cancel.load(Ordering::SeqCst) {
        debug!("worker canceled during conversion for {}", entry.input().display());
        entry.mark_canceled();
        return Ok(());
    }
    entry.set_status(EntryStatus::Downloading);

    let url = export_url(service, &job_id, &export_task_id).await?;
    let output_path = naming::resolve_in_dir(entry.input(), entry.output_dir(), entry.profile());
    let base = naming::base_name(entry.input());

    let bytes = service.download(&url).await?;
    let part = save::write_part(bytes, entry.output_dir(), &base).await?;

    entry.set_status(EntryStatus::Saving);
    save::promote(&part, &output_path).await?;

    debug!(
        "worker completed for {} -> {}",
        entry.input().display(),
        output_path.display()
    );
    entry.complete(output_path);
    Ok(())
}

/// Poll the job at a fixed interval until it finishes, errors, times out, or
/// cancellation is observed.
async fn poll_until_complete(
    service: &Arc<dyn ConversionService>,
    job_id: &str,
    export_name: &str,
    config: &BatchConfig,
    cancel: &AtomicBool,
) -> Result<PollVerdict, ConvertError> {
    for attempt in 0..config.max_polls {
        if cancel.load(Ordering::SeqCst) {
            info!("polling canceled for job {job_id}");
            return Ok(PollVerdict::Canceled);
        }
        let job = service.get_job(job_id).await?;
        if attempt % 10 == 0 {
            debug!(
                "polling job {job_id} status={} (poll {}/{})",
                job.status,
                attempt + 1,
                config.max_polls
            );
        }
        if status_is(&job.status, "finished") {
            debug!("job {job_id} finished");
            let export_task_id = find_export_task_id(&job.tasks, export_name)
                .ok_or(ConvertError::MissingExportTask)?;
            return Ok(PollVerdict::Finished { export_task_id });
        }
        if status_is(&job.status, "error") {
            warn!("job {job_id} failed");
            return Err(ConvertError::JobFailed);
        }
        tokio::time::sleep(config.poll_interval).await;
    }
    if cancel.load(Ordering::SeqCst) {
        return Ok(PollVerdict::Canceled);
    }
    warn!("job {job_id} timed out after {} polls", config.max_polls);
    Err(ConvertError::JobTimedOut)
}

/// Locate the export task in a finished job's task list: match by the name
/// we assigned at submission, or fall back to the first task whose operation
/// is `export/url`. The fallback can pick an unrelated task in a job with
/// several exports; known ambiguity, kept as-is.
fn find_export_task_id(tasks: &[TaskView], export_name: &str) -> Option<String> {
    let mut by_operation: Option<String> = None;
    for task in tasks {
        if task.id.trim().is_empty() {
            continue;
        }
        if task.name == export_name {
            return Some(task.id.clone());
        }
        if by_operation.is_none() && status_is(&task.operation, "export/url") {
            by_operation = Some(task.id.clone());
        }
    }
    by_operation
}

async fn export_url(
    service: &Arc<dyn ConversionService>,
    job_id: &str,
    export_task_id: &str,
) -> Result<String, ConvertError> {
    let task = service.get_task(job_id, export_task_id).await?;
    let url = task
        .result
        .as_ref()
        .and_then(|r| r.files.iter().find(|f| !f.url.trim().is_empty()))
        .map(|f| f.url.clone());
    match url {
        Some(url) => {
            debug!("resolved export URL for job {job_id}");
            Ok(url)
        }
        None => Err(ConvertError::MissingExportUrl),
    }
}

/// Status strings from the service vary in case ("FINISHED", "finished").
fn status_is(actual: &str, expected: &str) -> bool {
    actual.eq_ignore_ascii_case(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, name: &str, operation: &str) -> TaskView {
        TaskView {
            id: id.to_string(),
            name: name.to_string(),
            operation: operation.to_string(),
        }
    }

    #[test]
    fn export_task_matched_by_name_wins() {
        let tasks = vec![
            task("t-1", "convert-abc", "convert"),
            task("t-2", "other-export", "export/url"),
            task("t-3", "export-abc", "export/url"),
        ];
        assert_eq!(
            find_export_task_id(&tasks, "export-abc").as_deref(),
            Some("t-3")
        );
    }

    #[test]
    fn fallback_is_first_export_url_task() {
        let tasks = vec![
            task("t-1", "convert-abc", "convert"),
            task("t-2", "first-export", "EXPORT/URL"),
            task("t-3", "second-export", "export/url"),
        ];
        assert_eq!(
            find_export_task_id(&tasks, "export-missing").as_deref(),
            Some("t-2")
        );
    }

    #[test]
    fn tasks_without_ids_are_ignored() {
        let tasks = vec![
            task("", "export-abc", "export/url"),
            task("  ", "export-abc", "export/url"),
        ];
        assert_eq!(find_export_task_id(&tasks, "export-abc"), None);
    }

    #[test]
    fn status_comparison_ignores_case() {
        assert!(status_is("FINISHED", "finished"));
        assert!(status_is("Error", "error"));
        assert!(!status_is("processing", "finished"));
    }
}

//! Batch entries: one file's conversion lifecycle.
//!
//! A [`BatchEntry`] is created by the caller, mutated exclusively by the one
//! worker executing it, and observed from outside through cloned
//! [`EntrySnapshot`]s — observers never see a half-written update. The input
//! path, output directory, and profile are fixed at construction; only the
//! lifecycle fields behind the mutex change.

use crate::profile::ConversionProfile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Status of a batch entry through the conversion pipeline.
///
/// The lifecycle is linear: `Queued → Uploading → Converting → Downloading →
/// Saving → Done`, with `Failed`, `Skipped`, and `Canceled` reachable from
/// any non-terminal state. The remote job's export stage is reported under
/// `Converting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    Queued,
    Uploading,
    Converting,
    Downloading,
    Saving,
    Done,
    Failed,
    Skipped,
    Canceled,
}

impl EntryStatus {
    /// Terminal states are never left once reached.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EntryStatus::Done | EntryStatus::Failed | EntryStatus::Skipped | EntryStatus::Canceled
        )
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryStatus::Queued => "Queued",
            EntryStatus::Uploading => "Uploading",
            EntryStatus::Converting => "Converting",
            EntryStatus::Downloading => "Downloading",
            EntryStatus::Saving => "Saving",
            EntryStatus::Done => "Done",
            EntryStatus::Failed => "Failed",
            EntryStatus::Skipped => "Skipped",
            EntryStatus::Canceled => "Canceled",
        };
        f.write_str(name)
    }
}

/// One file scheduled for conversion.
///
/// Shared as `Arc<BatchEntry>` between the caller (observer) and the single
/// worker that executes it.
#[derive(Debug)]
pub struct BatchEntry {
    input: PathBuf,
    output_dir: PathBuf,
    profile: ConversionProfile,
    state: Mutex<EntryState>,
}

#[derive(Debug)]
struct EntryState {
    status: EntryStatus,
    progress: f64,
    message: String,
    output_path: Option<PathBuf>,
    job_id: Option<String>,
    upload_task_id: Option<String>,
    export_task_id: Option<String>,
}

/// A consistent, read-only copy of an entry's mutable state.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySnapshot {
    pub status: EntryStatus,
    pub progress: f64,
    /// Human-readable reason; non-empty exactly when status is Failed or Skipped.
    pub message: String,
    /// Final output location; set exactly when status is Done.
    pub output_path: Option<PathBuf>,
    pub job_id: Option<String>,
    pub upload_task_id: Option<String>,
    pub export_task_id: Option<String>,
}

impl BatchEntry {
    /// Create an entry in status `Queued`.
    ///
    /// The output directory is resolved here, at submission, and never
    /// re-derived later.
    pub fn new(
        input: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        profile: ConversionProfile,
    ) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            profile,
            state: Mutex::new(EntryState {
                status: EntryStatus::Queued,
                progress: 0.0,
                message: String::new(),
                output_path: None,
                job_id: None,
                upload_task_id: None,
                export_task_id: None,
            }),
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn profile(&self) -> &ConversionProfile {
        &self.profile
    }

    /// A consistent copy of the entry's current state.
    pub fn snapshot(&self) -> EntrySnapshot {
        let state = self.lock();
        EntrySnapshot {
            status: state.status,
            progress: state.progress,
            message: state.message.clone(),
            output_path: state.output_path.clone(),
            job_id: state.job_id.clone(),
            upload_task_id: state.upload_task_id.clone(),
            export_task_id: state.export_task_id.clone(),
        }
    }

    /// Current status without the full snapshot clone.
    pub fn status(&self) -> EntryStatus {
        self.lock().status
    }

    pub(crate) fn set_status(&self, status: EntryStatus) {
        self.lock().status = status;
    }

    pub(crate) fn set_job_id(&self, job_id: &str) {
        self.lock().job_id = Some(job_id.to_string());
    }

    pub(crate) fn set_upload_task_id(&self, task_id: &str) {
        self.lock().upload_task_id = Some(task_id.to_string());
    }

    pub(crate) fn set_export_task_id(&self, task_id: &str) {
        self.lock().export_task_id = Some(task_id.to_string());
    }

    pub(crate) fn mark_skipped(&self, reason: String) {
        let mut state = self.lock();
        state.status = EntryStatus::Skipped;
        state.message = reason;
    }

    pub(crate) fn mark_failed(&self, reason: String) {
        let mut state = self.lock();
        state.status = EntryStatus::Failed;
        state.message = reason;
    }

    /// Canceled entries carry no message.
    pub(crate) fn mark_canceled(&self) {
        self.lock().status = EntryStatus::Canceled;
    }

    pub(crate) fn complete(&self, output_path: PathBuf) {
        let mut state = self.lock();
        state.output_path = Some(output_path);
        state.status = EntryStatus::Done;
        state.progress = 1.0;
    }

    // A poisoned lock only means a worker panicked mid-update; the state is
    // still a valid snapshot, so recover it rather than propagate the panic.
    fn lock(&self) -> MutexGuard<'_, EntryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile;

    fn entry() -> BatchEntry {
        let catalogue = profile::builtin();
        BatchEntry::new("holiday.mod", "/out", catalogue[0].clone())
    }

    #[test]
    fn new_entry_is_queued_with_empty_message() {
        let snap = entry().snapshot();
        assert_eq!(snap.status, EntryStatus::Queued);
        assert_eq!(snap.progress, 0.0);
        assert!(snap.message.is_empty());
        assert!(snap.output_path.is_none());
        assert!(snap.job_id.is_none());
    }

    #[test]
    fn complete_sets_path_and_full_progress() {
        let e = entry();
        e.complete(PathBuf::from("/out/holiday.mov"));
        let snap = e.snapshot();
        assert_eq!(snap.status, EntryStatus::Done);
        assert_eq!(snap.progress, 1.0);
        assert_eq!(snap.output_path.as_deref(), Some(Path::new("/out/holiday.mov")));
        assert!(snap.message.is_empty());
    }

    #[test]
    fn failed_and_skipped_carry_messages_canceled_does_not() {
        let failed = entry();
        failed.mark_failed("Job failed".to_string());
        assert_eq!(failed.snapshot().message, "Job failed");

        let skipped = entry();
        skipped.mark_skipped("File is empty".to_string());
        assert_eq!(skipped.snapshot().message, "File is empty");

        let canceled = entry();
        canceled.mark_canceled();
        let snap = canceled.snapshot();
        assert_eq!(snap.status, EntryStatus::Canceled);
        assert!(snap.message.is_empty());
    }

    #[test]
    fn terminal_classification() {
        for status in [
            EntryStatus::Done,
            EntryStatus::Failed,
            EntryStatus::Skipped,
            EntryStatus::Canceled,
        ] {
            assert!(status.is_terminal(), "{status} should be terminal");
        }
        for status in [
            EntryStatus::Queued,
            EntryStatus::Uploading,
            EntryStatus::Converting,
            EntryStatus::Downloading,
            EntryStatus::Saving,
        ] {
            assert!(!status.is_terminal(), "{status} should not be terminal");
        }
    }
}

//! # batchconv
//!
//! Batch-convert files through a remote conversion service: upload each
//! file, submit a two-stage convert + export job, poll until it settles,
//! download the result, and place it atomically in an output directory —
//! for many files concurrently, with per-entry isolation and cooperative
//! cancellation.
//!
//! ## Why this crate?
//!
//! Driving a conversion API for one file is easy; driving it for a folder
//! of mixed files is where things go wrong — one bad input poisons the run,
//! a canceled batch leaves half-written outputs, a flaky poll hangs a
//! worker forever. This crate owns exactly that coordination: every entry
//! runs its own state machine to a terminal state, failures stay local to
//! their entry, outputs appear only via atomic rename, and a single shared
//! flag cancels the whole batch at well-defined checkpoints.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Validate  existence, readability, size, extension vs. profile
//!  ├─ 2. Upload    create an import task, stream the file to it
//!  ├─ 3. Convert   submit convert+export job, poll every 3 s (≤600 polls)
//!  ├─ 4. Download  fetch the export task's result URL as a byte stream
//!  └─ 5. Save      part-file under .tmp/, atomic rename into place
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batchconv::{BatchConfig, BatchEntry, BatchRunner, HttpConversionService, profile};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalogue = profile::builtin();
//!     let chosen = profile::find(&catalogue, "jpg-webp").expect("known profile").clone();
//!
//!     let service = Arc::new(HttpConversionService::new(std::env::var("BATCHCONV_API_KEY")?)?);
//!     let runner = BatchRunner::new(service, &catalogue, BatchConfig::default());
//!
//!     let entries = vec![Arc::new(BatchEntry::new("photo.jpg", "converted", chosen))];
//!     runner.run(&entries).await;
//!
//!     for entry in &entries {
//!         let snap = entry.snapshot();
//!         println!("{}: {} {}", entry.input().display(), snap.status, snap.message);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Observing progress
//!
//! [`BatchRunner::run`] mutates the entries it was given; poll
//! [`BatchEntry::snapshot`] from any other task to render progress, and call
//! [`BatchRunner::cancel`] to stop the batch cooperatively. Snapshots are
//! consistent copies — observers never see a torn update.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `batchconv` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! batchconv = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod entry;
pub mod error;
pub mod pipeline;
pub mod profile;
pub mod remote;
pub mod runner;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BatchConfig, BatchConfigBuilder};
pub use entry::{BatchEntry, EntrySnapshot, EntryStatus};
pub use error::{user_message, ApiFailure, ConvertError};
pub use pipeline::naming::resolve_in_dir;
pub use pipeline::validate::Validator;
pub use profile::ConversionProfile;
pub use remote::http::HttpConversionService;
pub use remote::{ByteStream, ConversionService, ExportFile, JobView, TaskHandle, TaskPayload, TaskView};
pub use runner::BatchRunner;

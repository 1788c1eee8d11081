//! CSV import workflow
//!
//! Coordinates one multipart upload followed by a polled progress query
//! into a small discrete state machine:
//!
//! ```text
//! Idle -> Uploading -> Processing -> Succeeded
//!              |            |
//!              +-> Failed <-+          (deadline expiry also fails)
//! ```
//!
//! Terminal states are only left by an explicit reset or by accepting a
//! new file, which starts over at Uploading. Entering Succeeded fires
//! the success handler exactly once and stops polling immediately.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::{endpoints, CsvFile};
use crate::client::config::ClientConfig;
use crate::client::errors::{FetchError, FetchResult};
use crate::client::store::entry::QueryStatus;
use crate::client::store::QueryStore;

/// Discrete workflow state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    Uploading,
    Processing,
    Succeeded,
    Failed(UploadFailure),
}

/// Which step failed, with the underlying request error where there is
/// one. Upload and processing failures surface distinct messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFailure {
    Upload(FetchError),
    Processing(FetchError),
    DeadlineExceeded,
}

/// Subscriber-visible workflow status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStatus {
    pub phase: UploadPhase,
    /// Set once the upload resolves; never set when the upload fails
    pub import_id: Option<u64>,
    pub processed: u64,
    pub total: u64,
}

impl UploadStatus {
    fn idle() -> Self {
        Self {
            phase: UploadPhase::Idle,
            import_id: None,
            processed: 0,
            total: 0,
        }
    }

    fn uploading() -> Self {
        Self {
            phase: UploadPhase::Uploading,
            ..Self::idle()
        }
    }

    /// Fraction complete in `[0, 1]`, or `None` while the server has not
    /// sized the import. Callers render the `None` case as an
    /// indeterminate bar, not a bar stuck at zero.
    pub fn progress_fraction(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.processed as f64 / self.total as f64)
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, UploadPhase::Succeeded | UploadPhase::Failed(_))
    }
}

type SuccessHandler = Arc<dyn Fn(u64) + Send + Sync>;

/// One upload-then-process workflow instance.
///
/// Accepting a file aborts any previous run, so at most one driver task
/// exists at a time and status updates never interleave between runs.
pub struct UploadWorkflow {
    store: QueryStore,
    poll_interval: Duration,
    processing_deadline: Duration,
    status_tx: watch::Sender<UploadStatus>,
    on_success: Option<SuccessHandler>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl UploadWorkflow {
    pub fn new(store: QueryStore, config: &ClientConfig) -> Self {
        let (status_tx, _rx) = watch::channel(UploadStatus::idle());
        Self {
            store,
            poll_interval: config.poll_interval(),
            processing_deadline: config.processing_deadline(),
            status_tx,
            on_success: None,
            driver: Mutex::new(None),
        }
    }

    /// Install a handler invoked exactly once per run on entering
    /// Succeeded, with the completed import id. This is where a UI hangs
    /// its post-import navigation.
    pub fn on_success(mut self, handler: impl Fn(u64) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(handler));
        self
    }

    pub fn status(&self) -> UploadStatus {
        self.status_tx.borrow().clone()
    }

    /// Watch channel for status changes, for reactive consumers.
    pub fn watch(&self) -> watch::Receiver<UploadStatus> {
        self.status_tx.subscribe()
    }

    /// Accept a CSV file and start the workflow.
    ///
    /// Client-side validation rejects non-CSV names and empty payloads
    /// before any request is issued; in that case the state machine does
    /// not move. Otherwise any previous run is aborted and the machine
    /// enters Uploading.
    pub fn accept_file(&self, file_name: &str, bytes: Vec<u8>) -> FetchResult<()> {
        if !file_name.to_ascii_lowercase().ends_with(".csv") {
            return Err(FetchError::validation(format!(
                "'{}' is not a CSV file",
                file_name
            )));
        }
        if bytes.is_empty() {
            return Err(FetchError::validation("Uploaded file is empty"));
        }

        self.abort_driver();
        self.status_tx.send_replace(UploadStatus::uploading());

        let file = CsvFile::new(file_name, bytes);
        let store = self.store.clone();
        let status_tx = self.status_tx.clone();
        let on_success = self.on_success.clone();
        let poll_interval = self.poll_interval;
        let processing_deadline = self.processing_deadline;

        let handle = tokio::spawn(async move {
            drive(
                store,
                status_tx,
                on_success,
                poll_interval,
                processing_deadline,
                file,
            )
            .await;
        });
        let mut driver = self
            .driver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *driver = Some(handle);
        Ok(())
    }

    /// Abandon the current run and return to Idle.
    pub fn reset(&self) {
        self.abort_driver();
        self.status_tx.send_replace(UploadStatus::idle());
    }

    fn abort_driver(&self) {
        let mut driver = self
            .driver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = driver.take() {
            handle.abort();
        }
    }
}

impl Drop for UploadWorkflow {
    fn drop(&mut self) {
        self.abort_driver();
    }
}

async fn drive(
    store: QueryStore,
    status_tx: watch::Sender<UploadStatus>,
    on_success: Option<SuccessHandler>,
    poll_interval: Duration,
    processing_deadline: Duration,
    file: CsvFile,
) {
    let receipt = match store.mutate(&endpoints::upload_csv(), &file).await {
        Ok(receipt) => receipt,
        Err(error) => {
            log::warn!("csv upload failed: {}", error);
            status_tx.send_modify(|status| {
                status.phase = UploadPhase::Failed(UploadFailure::Upload(error));
            });
            return;
        }
    };

    let import_id = receipt.id;
    log::info!("csv upload accepted as import {}", import_id);
    status_tx.send_modify(|status| {
        status.phase = UploadPhase::Processing;
        status.import_id = Some(import_id);
    });

    let mut progress = match store.subscribe(&endpoints::import_progress(), &import_id) {
        Ok(subscription) => subscription,
        Err(error) => {
            status_tx.send_modify(|status| {
                status.phase = UploadPhase::Failed(UploadFailure::Processing(error));
            });
            return;
        }
    };
    progress.poll_every(poll_interval);

    let deadline = tokio::time::sleep(processing_deadline);
    tokio::pin!(deadline);

    // Dropping `progress` on any exit path below stops polling.
    loop {
        tokio::select! {
            _ = &mut deadline => {
                log::warn!(
                    "import {} still processing after {:?}, giving up",
                    import_id,
                    processing_deadline
                );
                status_tx.send_modify(|status| {
                    status.phase = UploadPhase::Failed(UploadFailure::DeadlineExceeded);
                });
                return;
            }
            view = progress.changed() => {
                if view.status == QueryStatus::Error {
                    let error = view
                        .error
                        .unwrap_or_else(|| FetchError::network("Progress poll failed"));
                    log::warn!("progress poll for import {} failed: {}", import_id, error);
                    status_tx.send_modify(|status| {
                        status.phase = UploadPhase::Failed(UploadFailure::Processing(error));
                    });
                    return;
                }
                if let Some(report) = view.data {
                    status_tx.send_modify(|status| {
                        status.processed = report.processed;
                        status.total = report.total;
                    });
                    if report.is_complete() {
                        status_tx.send_modify(|status| {
                            status.phase = UploadPhase::Succeeded;
                        });
                        if let Some(handler) = &on_success {
                            handler(import_id);
                        }
                        return;
                    }
                }
            }
        }
    }
}

//! The upload workflow: validate, upload, transform, present.
//!
//! [`UploadWorkflow`] owns all per-session state and drives the four stages
//! strictly in order. Collaborators are injected through [`Services`], so the
//! same workflow runs against the HTTP platform client or in-memory fakes.
//!
//! ```text
//! Idle -> Uploading -> Transforming -> Complete
//!            |             |
//!            +-------------+--> Failed
//! ```
//!
//! Complete and Failed return to Idle through [`UploadWorkflow::reset`] or a
//! new selection. Errors never escape: each one ends the attempt, is kept as
//! [`UploadWorkflow::last_error`] and produces exactly one notification.
//!
//! A run borrows the workflow mutably until it finishes, so nothing can
//! interleave with it. A run whose future was dropped mid-flight leaves the
//! state at Uploading or Transforming; the next action starts over from Idle.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, ServiceError};
use crate::file::{self, CandidateFile, SelectedFile, ValidationError};
use crate::input::{DropZone, InputEvent};
use crate::notify::{Notification, Notifier};
use crate::object_url::{ObjectUrl, ObjectUrlRegistry};
use crate::result::{self, ProcessedResult, ResultFetcher, SaveTarget};
use crate::session::{AuthProvider, GateMode, GateView, SessionGate};
use crate::storage::{self, ObjectStorage, UploadOptions};
use crate::transform::{ImageTransformer, ModifyImageRequest};

/// Fixed progress checkpoints. They are UI cues, not measurements.
pub mod checkpoints {
    /// Just before the storage upload is issued.
    pub const UPLOAD_STARTED: u8 = 20;
    /// Just before the AI request is issued.
    pub const TRANSFORM_STARTED: u8 = 60;
    /// The AI service answered.
    pub const TRANSFORM_RESPONDED: u8 = 90;
    /// The result is ready.
    pub const COMPLETE: u8 = 100;
}

/// Where a workflow run currently stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProcessingState {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Sending the original to object storage.
    Uploading,
    /// Waiting for the AI service.
    Transforming,
    /// A result is available.
    Complete,
    /// The last attempt failed.
    Failed,
}

impl ProcessingState {
    /// Whether a run is in flight.
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Uploading | Self::Transforming)
    }
}

/// Callback invoked on every state or progress change.
pub type StateObserver = Box<dyn Fn(ProcessingState, u8) + Send + Sync>;

/// The collaborators a workflow talks to.
#[derive(Clone)]
pub struct Services {
    /// Authentication provider.
    pub auth: Arc<dyn AuthProvider>,
    /// Object storage.
    pub storage: Arc<dyn ObjectStorage>,
    /// AI image modification.
    pub transformer: Arc<dyn ImageTransformer>,
    /// Fetches processed images for download.
    pub fetcher: Arc<dyn ResultFetcher>,
}

impl Services {
    /// Use one client for every collaborator.
    pub fn shared<P>(client: Arc<P>) -> Self
    where
        P: AuthProvider + ObjectStorage + ImageTransformer + ResultFetcher + 'static,
    {
        Self {
            auth: client.clone(),
            storage: client.clone(),
            transformer: client.clone(),
            fetcher: client,
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct Staged {
    file: SelectedFile,
    preview: ObjectUrl,
}

/// One user's upload workflow.
pub struct UploadWorkflow {
    services: Services,
    notifier: Arc<dyn Notifier>,
    gate: SessionGate,
    urls: ObjectUrlRegistry,
    drop_zone: DropZone,
    staged: Option<Staged>,
    state: ProcessingState,
    progress: u8,
    result: Option<ProcessedResult>,
    last_error: Option<Error>,
    observers: Vec<StateObserver>,
    clock: fn() -> i64,
}

impl std::fmt::Debug for UploadWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadWorkflow")
            .field("state", &self.state)
            .field("progress", &self.progress)
            .field("staged", &self.staged)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl UploadWorkflow {
    /// Create an idle workflow with the session gate enforced.
    pub fn new(services: Services, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            services,
            notifier,
            gate: SessionGate::default(),
            urls: ObjectUrlRegistry::new(),
            drop_zone: DropZone::default(),
            staged: None,
            state: ProcessingState::Idle,
            progress: 0,
            result: None,
            last_error: None,
            observers: Vec::new(),
            clock: || chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Set the session gate mode.
    #[must_use]
    pub fn with_gate(mut self, mode: GateMode) -> Self {
        self.gate = SessionGate::new(mode);
        self
    }

    /// Replace the epoch-millis clock used for storage keys.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Register a state/progress observer.
    pub fn observe(&mut self, observer: StateObserver) {
        self.observers.push(observer);
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ProcessingState {
        self.state
    }

    /// Current progress, 0 to 100.
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Whether the "upload new image" control should be disabled.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    /// The staged file, if any.
    #[must_use]
    pub fn selected(&self) -> Option<&SelectedFile> {
        self.staged.as_ref().map(|s| &s.file)
    }

    /// URL of the local preview of the staged file.
    #[must_use]
    pub fn preview_url(&self) -> Option<&str> {
        self.staged.as_ref().map(|s| s.preview.as_str())
    }

    /// The result of the last successful run.
    #[must_use]
    pub fn result(&self) -> Option<&ProcessedResult> {
        self.result.as_ref()
    }

    /// The error that ended the last attempt or action.
    #[must_use]
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Registry issuing preview and download object URLs.
    #[must_use]
    pub fn object_urls(&self) -> &ObjectUrlRegistry {
        &self.urls
    }

    /// Whether a drag is hovering the drop zone.
    #[must_use]
    pub fn drag_active(&self) -> bool {
        self.drop_zone.is_active()
    }

    /// Which screen to render for the current auth state.
    #[must_use]
    pub fn gate_view(&self) -> GateView {
        self.gate.view(&self.services.auth.current())
    }

    /// Feed a drop zone or picker event.
    ///
    /// Returns `Ok(true)` when the event staged a new file.
    ///
    /// # Errors
    ///
    /// Same as [`UploadWorkflow::select_file`].
    pub fn handle_input(&mut self, event: InputEvent) -> Result<bool, ValidationError> {
        match self.drop_zone.handle(event) {
            Some(candidate) => self.select_file(candidate).map(|()| true),
            None => Ok(false),
        }
    }

    /// Validate and stage a file, replacing any previous selection and result.
    ///
    /// On rejection nothing is changed except [`UploadWorkflow::last_error`],
    /// and one notification names the violated constraint.
    ///
    /// # Errors
    ///
    /// Returns the violated constraint, which has already been notified.
    pub fn select_file(&mut self, candidate: CandidateFile) -> Result<(), ValidationError> {
        let file = match file::validate(candidate) {
            Ok(file) => file,
            Err(e) => {
                warn!(error = %e, "file rejected");
                self.fail_action(e.clone().into());
                return Err(e);
            }
        };

        // Release the old preview before issuing a new one.
        self.staged = None;
        let preview = self.urls.create(Arc::clone(file.bytes()));
        info!(
            filename = file.name(),
            mime = file.mime(),
            size = file.size(),
            "file selected"
        );
        self.staged = Some(Staged { file, preview });
        self.result = None;
        self.last_error = None;
        self.restart();
        Ok(())
    }

    /// Drop the selection and result and return to Idle.
    pub fn reset(&mut self) {
        self.staged = None;
        self.result = None;
        self.last_error = None;
        self.restart();
    }

    /// Run the staged file through upload and transform.
    ///
    /// Returns the state the attempt ended in. A Failed or abandoned
    /// workflow restarts from Uploading; a Complete one is left alone until
    /// reset.
    pub async fn process(&mut self) -> ProcessingState {
        match self.state {
            ProcessingState::Complete => {
                debug!("result already available; reset or select a new file first");
                return self.state;
            }
            ProcessingState::Uploading | ProcessingState::Transforming => {
                debug!(state = ?self.state, "restarting abandoned run");
                self.restart();
            }
            ProcessingState::Failed => self.restart(),
            ProcessingState::Idle => {}
        }

        let Some(file) = self.selected().cloned() else {
            self.fail_action(ValidationError::NoFileSelected.into());
            return self.state;
        };

        if let Err(e) = self.gate.check(&self.services.auth.current()) {
            warn!("processing blocked: no session");
            self.fail_action(e);
            return self.state;
        }

        self.last_error = None;
        let outcome = self.run(&file).await;
        match outcome {
            Ok(result) => {
                info!(processed_url = %result.processed_url, "watermark removed");
                self.notifier.notify(Notification::success(
                    "Watermark removed",
                    format!("{} is ready to download", result.download_filename),
                ));
                self.result = Some(result);
                self.transition(ProcessingState::Complete, checkpoints::COMPLETE);
            }
            Err(e) => {
                warn!(error = %e, "workflow failed");
                self.transition(ProcessingState::Failed, self.progress);
                self.fail_action(e);
            }
        }
        self.state
    }

    async fn run(&mut self, file: &SelectedFile) -> Result<ProcessedResult, Error> {
        self.transition(ProcessingState::Uploading, self.progress);
        if self.services.auth.current().user.is_none() {
            return Err(Error::Upload(ServiceError::SessionMissing));
        }

        let key = storage::storage_key((self.clock)(), &file.extension());
        debug!(%key, "uploading original");
        self.transition(ProcessingState::Uploading, checkpoints::UPLOAD_STARTED);
        let stored = self
            .services
            .storage
            .upload(
                file.bytes().to_vec(),
                &key,
                UploadOptions {
                    upsert: false,
                    content_type: file.mime().to_string(),
                },
            )
            .await
            .map_err(Error::Upload)?;
        debug!(url = %stored.public_url, "original stored");

        self.transition(ProcessingState::Transforming, checkpoints::TRANSFORM_STARTED);
        let response = self
            .services
            .transformer
            .modify_image(ModifyImageRequest::watermark_removal(&stored.public_url))
            .await
            .map_err(|e| match e {
                ServiceError::Decode(msg) => Error::InvalidResponse(msg),
                other => Error::Transform(other),
            })?;
        self.transition(ProcessingState::Transforming, checkpoints::TRANSFORM_RESPONDED);

        let processed_url = response.first_url().map_err(Error::InvalidResponse)?;

        Ok(ProcessedResult {
            original_url: stored.public_url,
            processed_url: processed_url.to_string(),
            download_filename: result::download_filename(file.name()),
        })
    }

    /// Fetch the processed image and hand it to `target`.
    ///
    /// Returns where it was saved. A failed download leaves the state at
    /// Complete so it can be retried.
    pub async fn download(&mut self, target: &dyn SaveTarget) -> Option<String> {
        let Some(processed) = self.result.as_ref() else {
            debug!("nothing to download");
            return None;
        };

        let outcome =
            result::download(self.services.fetcher.as_ref(), &self.urls, target, processed).await;
        match outcome {
            Ok(location) => {
                info!(%location, "download saved");
                self.notifier.notify(Notification::success(
                    "Download started",
                    format!("Saved {}", processed.download_filename),
                ));
                self.last_error = None;
                Some(location)
            }
            Err(e) => {
                warn!(error = %e, "download failed");
                self.fail_action(e);
                None
            }
        }
    }

    /// Record and notify a failure.
    fn fail_action(&mut self, error: Error) {
        self.notifier.notify(Notification::from_error(&error));
        self.last_error = Some(error);
    }

    fn restart(&mut self) {
        self.state = ProcessingState::Idle;
        self.progress = 0;
        self.emit();
    }

    /// Move to `state`. Progress never decreases within a run.
    fn transition(&mut self, state: ProcessingState, progress: u8) {
        if state != self.state {
            info!(from = ?self.state, to = ?state, "state changed");
        }
        self.state = state;
        self.progress = self.progress.max(progress.min(checkpoints::COMPLETE));
        self.emit();
    }

    fn emit(&self) {
        for observer in &self.observers {
            observer(self.state, self.progress);
        }
    }
}

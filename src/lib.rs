//! Remove watermarks from images with a hosted AI service.
//!
//! This crate holds no image-processing code of its own. It validates a
//! user-selected image, uploads it to object storage, asks a remote AI
//! image-modification service to remove watermarks and overlays, and
//! presents/downloads the result. Every remote collaborator sits behind a
//! trait so the workflow can run against the HTTP [`PlatformClient`] or a
//! test double.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use watermark_eraser::{
//!     AuthProvider, CandidateFile, Config, FileSaveTarget, PlatformClient, Services,
//!     TracingNotifier, UploadWorkflow,
//! };
//!
//! # async fn run() -> watermark_eraser::Result<()> {
//! let config = Config::from_env()?;
//! let client = Arc::new(PlatformClient::new(&config)?);
//! client.login().await.ok();
//!
//! let mut workflow = UploadWorkflow::new(Services::shared(client), Arc::new(TracingNotifier));
//! workflow.select_file(CandidateFile::from_path("photo.jpg".as_ref())?)?;
//! workflow.process().await;
//! workflow.download(&FileSaveTarget::new(".")).await;
//! # Ok(())
//! # }
//! ```
//!
//! # Progress
//!
//! Progress moves through fixed [`checkpoints`]: 20 before the upload, 60
//! before the AI call, 90 when it answers, 100 when the result is ready.

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod file;
pub mod input;
pub mod notify;
pub mod object_url;
pub mod platform;
pub mod result;
pub mod session;
pub mod storage;
pub mod transform;
mod workflow;

pub use config::Config;
pub use error::{Error, Result, ServiceError};
pub use file::{CandidateFile, SelectedFile, ValidationError, MAX_FILE_SIZE};
pub use input::{DropZone, InputEvent};
pub use notify::{Level, Notification, Notifier, RecordingNotifier, TracingNotifier};
pub use object_url::{ObjectUrl, ObjectUrlRegistry};
pub use platform::PlatformClient;
pub use result::{download_filename, FileSaveTarget, ImageInfo, ProcessedResult, ResultFetcher, SaveTarget};
pub use session::{AuthProvider, AuthState, GateMode, GateView, SessionGate, User};
pub use storage::{ObjectStorage, StoredObject, UploadOptions};
pub use transform::{ImageTransformer, ModifyImageRequest, ModifyImageResponse};
pub use workflow::{checkpoints, ProcessingState, Services, StateObserver, UploadWorkflow};

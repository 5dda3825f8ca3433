pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod mime;
pub mod models;
pub mod present;
pub mod preview;
pub mod viewer;

#[cfg(test)]
mod testing;

// Types most consumers need to drive the viewer
pub use api::{ContentHint, ContentParams, ManagementApi, MetadataParams};
pub use config::ViewerConfig;
pub use error::{ApiError, DecodeError, ViewerError};
pub use fetch::{FetchedMetadata, MessageFetcher};
pub use models::{
    ContentPayload, FetchScope, MessageId, MessageMetadata, MessageReference, ObjectRef,
};
pub use present::{PresentationBuilder, PresentationModel, SlotKind, SlotRegistry};
pub use viewer::{MessageViewer, ShowOutcome, ViewerHandle, ViewerPhase, ViewerState};

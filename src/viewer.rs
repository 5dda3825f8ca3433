//! The message dialog controller.
//!
//! A `show` runs in two halves around each network call: the controller
//! mints a [`ShowToken`] before fetching and only accepts completions that
//! carry the newest token. Responses belonging to a superseded `show` (or
//! arriving after `hide`) are dropped so they can't overwrite the current view.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::api::ManagementApi;
use crate::config::ViewerConfig;
use crate::error::{ApiError, Result, ViewerError};
use crate::fetch::{FetchedMetadata, MessageFetcher};
use crate::mime;
use crate::models::{ContentPayload, FetchScope, MessageId, MessageReference, ObjectRef};
use crate::present::{PresentationBuilder, PresentationModel, PreviewPlan};
use crate::preview::{MountedPreview, PreviewMount, WidgetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerPhase {
    Hidden,
    Loading,
    Shown,
}

/// Identifies one `show` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShowToken(u64);

/// Metadata request issued by [`MessageViewer::begin_show`].
#[derive(Debug, Clone)]
pub struct ShowRequest {
    pub token: ShowToken,
    pub object: ObjectRef,
    pub reference: MessageReference,
    /// Slots blanked because the previous invocation had populated them.
    pub cleared_slots: Vec<String>,
}

/// Content request following a successful metadata fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    pub token: ShowToken,
    pub object: ObjectRef,
    pub message_id: MessageId,
    pub mime_type: String,
    pub limit: usize,
    pub total_bytes: u64,
}

#[derive(Debug, Clone)]
pub enum MetadataTransition {
    /// Fields rendered; fetch the preview if a request is attached.
    Shown(Option<PreviewRequest>),
    /// Fetch failed; the viewer went back to hidden.
    Failed(ViewerError),
    /// A newer invocation owns the view.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewTransition {
    Mounted(WidgetId),
    /// Content could not be fetched or decoded; the pane stays empty.
    Unavailable,
    Stale,
}

/// What a completed [`ViewerHandle::show`] left on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOutcome {
    Shown {
        token: ShowToken,
        preview: Option<PreviewTransition>,
    },
    /// Replaced by a later `show` or dismissed before it finished.
    Superseded,
}

/// Per-invocation render state: the populated slots and the preview pane.
#[derive(Debug, Default)]
pub struct ViewerState {
    model: Option<PresentationModel>,
    populated: Vec<String>,
    preview: PreviewMount,
}

impl ViewerState {
    pub fn model(&self) -> Option<&PresentationModel> {
        self.model.as_ref()
    }

    /// Slots currently holding content from the last render.
    pub fn populated_slots(&self) -> &[String] {
        &self.populated
    }

    pub fn preview(&self) -> Option<&MountedPreview> {
        self.preview.current()
    }

    pub fn preview_mount(&self) -> &PreviewMount {
        &self.preview
    }

    /// Forget the last render; returns the slots that must be blanked.
    fn clear(&mut self) -> Vec<String> {
        self.model = None;
        self.preview.dispose();
        std::mem::take(&mut self.populated)
    }

    fn populate(&mut self, model: PresentationModel) {
        self.populated = model.fields.iter().map(|f| f.slot.clone()).collect();
        self.model = Some(model);
    }
}

/// Viewer state machine. Owns the render state and the preview mount.
pub struct MessageViewer<A> {
    fetcher: MessageFetcher<A>,
    builder: PresentationBuilder,
    phase: ViewerPhase,
    state: ViewerState,
    latest: u64,
}

impl<A: ManagementApi> MessageViewer<A> {
    pub fn new(api: Arc<A>, builder: PresentationBuilder) -> Self {
        Self {
            fetcher: MessageFetcher::new(api),
            builder,
            phase: ViewerPhase::Hidden,
            state: ViewerState::default(),
            latest: 0,
        }
    }

    pub fn from_config(api: Arc<A>, config: &ViewerConfig) -> Self {
        Self::new(api, config.presentation_builder())
    }

    pub fn phase(&self) -> ViewerPhase {
        self.phase
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn fetcher(&self) -> &MessageFetcher<A> {
        &self.fetcher
    }

    pub fn session_scope(&self) -> FetchScope {
        self.fetcher.session_scope()
    }

    fn is_current(&self, token: ShowToken) -> bool {
        token.0 == self.latest
    }

    /// Start a new invocation: supersede any in-flight one, clear the last
    /// render and enter `Loading`.
    pub fn begin_show(&mut self, object: ObjectRef, reference: MessageReference) -> ShowRequest {
        self.latest += 1;
        let token = ShowToken(self.latest);
        let cleared_slots = self.state.clear();
        self.phase = ViewerPhase::Loading;
        log::debug!("Showing message {} (invocation {})", reference.id, token.0);
        ShowRequest {
            token,
            object,
            reference,
            cleared_slots,
        }
    }

    /// Apply the metadata fetch result of `request`.
    pub fn complete_metadata(
        &mut self,
        request: &ShowRequest,
        result: std::result::Result<FetchedMetadata, ApiError>,
    ) -> MetadataTransition {
        if !self.is_current(request.token) {
            log::warn!(
                "Discarding stale message info for {} (invocation {})",
                request.reference.id,
                request.token.0
            );
            return MetadataTransition::Stale;
        }

        let fetched = match result {
            Ok(fetched) => fetched,
            Err(e) => {
                self.phase = ViewerPhase::Hidden;
                return MetadataTransition::Failed(ViewerError::fetch(
                    request.reference.id.clone(),
                    e,
                ));
            }
        };

        let includes_confidential = fetched.includes_confidential();
        let model = self.builder.build(&fetched.metadata, includes_confidential, |id| {
            self.fetcher.download_url(&request.object, id)
        });

        let preview = match &model.preview {
            PreviewPlan::Pending {
                mime_type,
                limit,
                total_bytes,
                ..
            } => Some(PreviewRequest {
                token: request.token,
                object: request.object.clone(),
                message_id: model.message_id.clone(),
                mime_type: mime_type.clone(),
                limit: *limit,
                total_bytes: *total_bytes,
            }),
            PreviewPlan::Hidden => None,
        };

        self.state.populate(model);
        self.phase = ViewerPhase::Shown;
        MetadataTransition::Shown(preview)
    }

    /// Apply the content fetch result of `request`, replacing any mounted preview.
    pub fn complete_preview(
        &mut self,
        request: &PreviewRequest,
        result: std::result::Result<ContentPayload, ApiError>,
    ) -> PreviewTransition {
        if !self.is_current(request.token) {
            log::warn!(
                "Discarding stale preview for {} (invocation {})",
                request.message_id,
                request.token.0
            );
            return PreviewTransition::Stale;
        }

        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Preview of message {} unavailable: {e}", request.message_id);
                self.state.preview.dispose();
                return PreviewTransition::Unavailable;
            }
        };
        if let Some(declared) = payload.declared_size {
            if declared != request.total_bytes {
                log::debug!(
                    "Message {} declares {declared} bytes, info reported {}",
                    request.message_id,
                    request.total_bytes
                );
            }
        }

        let decoded = match mime::decode_or_text(&request.mime_type, &payload.bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::warn!("Preview of message {} unavailable: {e}", request.message_id);
                self.state.preview.dispose();
                return PreviewTransition::Unavailable;
            }
        };

        let preview = self
            .builder
            .build_preview(decoded, request.limit, request.total_bytes);
        PreviewTransition::Mounted(self.state.preview.mount(preview))
    }

    /// Dismiss the view. Render state is kept until the next `show`; any
    /// in-flight invocation is superseded.
    pub fn hide(&mut self) {
        self.latest += 1;
        self.phase = ViewerPhase::Hidden;
    }
}

/// Shareable front of a [`MessageViewer`]. Network calls run without holding
/// the viewer lock, so a newer `show` may start while an older one waits.
pub struct ViewerHandle<A> {
    viewer: Arc<Mutex<MessageViewer<A>>>,
    fetcher: MessageFetcher<A>,
}

impl<A> Clone for ViewerHandle<A> {
    fn clone(&self) -> Self {
        Self {
            viewer: Arc::clone(&self.viewer),
            fetcher: self.fetcher.clone(),
        }
    }
}

impl<A: ManagementApi> ViewerHandle<A> {
    pub fn new(viewer: MessageViewer<A>) -> Self {
        let fetcher = viewer.fetcher.clone();
        Self {
            viewer: Arc::new(Mutex::new(viewer)),
            fetcher,
        }
    }

    pub fn from_config(api: A, config: &ViewerConfig) -> Self {
        Self::new(MessageViewer::from_config(Arc::new(api), config))
    }

    /// Lock the viewer to read its state.
    pub async fn lock(&self) -> MutexGuard<'_, MessageViewer<A>> {
        self.viewer.lock().await
    }

    /// Fetch, render and preview one message.
    ///
    /// Only a failed metadata fetch (after the header downgrade retry) is
    /// returned as an error; preview problems leave the pane empty.
    pub async fn show(&self, object: ObjectRef, reference: MessageReference) -> Result<ShowOutcome> {
        let request = self.viewer.lock().await.begin_show(object, reference);

        let fetched = self
            .fetcher
            .fetch_metadata(&request.object, &request.reference.id)
            .await;

        let transition = self.viewer.lock().await.complete_metadata(&request, fetched);
        let preview_request = match transition {
            MetadataTransition::Stale => return Ok(ShowOutcome::Superseded),
            MetadataTransition::Failed(e) => return Err(e),
            MetadataTransition::Shown(preview) => preview,
        };

        let Some(preview_request) = preview_request else {
            return Ok(ShowOutcome::Shown {
                token: request.token,
                preview: None,
            });
        };

        let content = self
            .fetcher
            .fetch_preview(
                &preview_request.object,
                &preview_request.message_id,
                &preview_request.mime_type,
                preview_request.limit,
            )
            .await;

        match self
            .viewer
            .lock()
            .await
            .complete_preview(&preview_request, content)
        {
            PreviewTransition::Stale => Ok(ShowOutcome::Superseded),
            transition => Ok(ShowOutcome::Shown {
                token: request.token,
                preview: Some(transition),
            }),
        }
    }

    pub async fn hide(&self) {
        self.viewer.lock().await.hide();
    }
}

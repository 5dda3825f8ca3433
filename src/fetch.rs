//! Message retrieval against the management API.
//!
//! Header attributes are confidential: a principal without the privilege to
//! read them gets a 403 for the whole request. The first such refusal
//! downgrades the session to header-less requests for good, and the request
//! is retried once without headers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::api::{ContentHint, ContentParams, ManagementApi, MetadataParams};
use crate::error::ApiError;
use crate::models::{ContentPayload, FetchScope, MessageId, MessageMetadata, ObjectRef};

/// Session-wide default for header requests. Only ever moves from
/// `HeadersIncluded` to `HeadersExcluded`.
#[derive(Debug)]
pub struct SessionScope {
    headers_included: AtomicBool,
}

impl Default for SessionScope {
    fn default() -> Self {
        Self {
            headers_included: AtomicBool::new(true),
        }
    }
}

impl SessionScope {
    pub fn current(&self) -> FetchScope {
        if self.headers_included.load(Ordering::Acquire) {
            FetchScope::HeadersIncluded
        } else {
            FetchScope::HeadersExcluded
        }
    }

    /// Returns true if this call performed the downgrade.
    fn downgrade(&self) -> bool {
        self.headers_included.swap(false, Ordering::AcqRel)
    }
}

/// Metadata together with the scope it was fetched under.
#[derive(Debug, Clone)]
pub struct FetchedMetadata {
    pub metadata: MessageMetadata,
    pub scope: FetchScope,
}

impl FetchedMetadata {
    /// Confidential regions may only be shown when nothing was redacted.
    pub fn includes_confidential(&self) -> bool {
        self.scope.includes_headers()
    }
}

/// Issues metadata and content requests and applies the downgrade policy.
pub struct MessageFetcher<A> {
    api: Arc<A>,
    session: Arc<SessionScope>,
}

impl<A> Clone for MessageFetcher<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            session: Arc::clone(&self.session),
        }
    }
}

impl<A: ManagementApi> MessageFetcher<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            session: Arc::new(SessionScope::default()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn session_scope(&self) -> FetchScope {
        self.session.current()
    }

    /// Fetch message info using the session default scope.
    ///
    /// A 403 while headers were requested downgrades the session and retries
    /// exactly once without headers; whatever that retry yields is final.
    pub async fn fetch_metadata(
        &self,
        object: &ObjectRef,
        id: &MessageId,
    ) -> Result<FetchedMetadata, ApiError> {
        let scope = self.session.current();
        match self.load(object, id, scope).await {
            Err(e) if e.is_forbidden() && scope == FetchScope::HeadersIncluded => {
                if self.session.downgrade() {
                    log::info!("Header access refused for message {id}; excluding headers for this session");
                }
                self.load(object, id, FetchScope::HeadersExcluded).await
            }
            other => other,
        }
    }

    async fn load(
        &self,
        object: &ObjectRef,
        id: &MessageId,
        scope: FetchScope,
    ) -> Result<FetchedMetadata, ApiError> {
        let params = MetadataParams {
            message_id: id.clone(),
            include_headers: scope.includes_headers(),
        };
        log::debug!("Loading message {id} ({scope:?})");
        let metadata = self.api.load_metadata(object, &params).await?;
        Ok(FetchedMetadata { metadata, scope })
    }

    /// Fetch at most `limit` bytes of the body, read as text.
    pub async fn fetch_preview(
        &self,
        object: &ObjectRef,
        id: &MessageId,
        mime_type: &str,
        limit: usize,
    ) -> Result<ContentPayload, ApiError> {
        let params = ContentParams::full(id.clone()).with_limit(limit);
        let hint = ContentHint {
            content_type: mime_type.to_string(),
        };
        log::debug!("Loading preview of message {id} ({mime_type}, limit {limit})");
        let mut payload = self.api.load_content(object, &params, &hint).await?;
        if payload.bytes.len() > limit {
            log::debug!(
                "Server returned {} bytes for a {limit} byte preview; truncating",
                payload.bytes.len()
            );
            payload.bytes.truncate(limit);
        }
        Ok(payload)
    }

    /// Download URL for the complete body.
    pub fn download_url(&self, object: &ObjectRef, id: &MessageId) -> String {
        self.api
            .build_download_url(object, &ContentParams::full(id.clone()))
    }
}

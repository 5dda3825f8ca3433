//! Contract of the management API the viewer consumes.
//!
//! The surrounding console owns the HTTP client; this module only fixes the
//! request shapes and the URL layout of the broker's operation endpoints.

use std::future::Future;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::ApiError;
use crate::models::{ContentPayload, MessageId, MessageMetadata, ObjectRef};

/// Operation returning message info (and optionally headers).
pub const GET_MESSAGE_INFO: &str = "getMessageInfoById";
/// Operation returning the message body.
pub const GET_MESSAGE_CONTENT: &str = "getMessageContent";

const API_ROOT: &str = "api/latest";

/// Characters escaped inside a path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters escaped inside a query key or value.
const QUERY_COMPONENT: &AsciiSet = &PATH_SEGMENT.add(b'&').add(b'=').add(b'+');

/// Parameters of a [`GET_MESSAGE_INFO`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataParams {
    pub message_id: MessageId,
    pub include_headers: bool,
}

impl MetadataParams {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("messageId", self.message_id.to_string()),
            ("includeHeaders", self.include_headers.to_string()),
        ]
    }
}

/// Parameters of a [`GET_MESSAGE_CONTENT`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentParams {
    pub message_id: MessageId,
    /// Maximum number of body bytes to return; `None` for the whole body.
    pub limit: Option<usize>,
    /// Ask the broker to render structured bodies (lists, maps) as JSON.
    pub return_json: bool,
}

impl ContentParams {
    /// Parameters for downloading the complete body.
    pub fn full(message_id: MessageId) -> Self {
        Self {
            message_id,
            limit: None,
            return_json: true,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("messageId", self.message_id.to_string()),
            ("returnJson", self.return_json.to_string()),
        ];
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        query
    }
}

/// Request options for a content load. The body is always read as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHint {
    /// Sent as the request `Content-Type` so the broker picks the right renderer.
    pub content_type: String,
}

/// Management API provided by the surrounding application.
pub trait ManagementApi: Send + Sync {
    /// Load message info for one message.
    ///
    /// Fails with [`ApiError::Authorization`] when the principal may not see
    /// what was asked for (typically the headers).
    fn load_metadata(
        &self,
        object: &ObjectRef,
        params: &MetadataParams,
    ) -> impl Future<Output = Result<MessageMetadata, ApiError>> + Send;

    /// Load (a prefix of) the message body.
    fn load_content(
        &self,
        object: &ObjectRef,
        params: &ContentParams,
        hint: &ContentHint,
    ) -> impl Future<Output = Result<ContentPayload, ApiError>> + Send;

    /// URL from which the user can download the complete body.
    fn build_download_url(&self, object: &ObjectRef, params: &ContentParams) -> String;
}

impl ObjectRef {
    /// `<base>/api/latest/<kind>/<path...>/<operation>?<params>`
    pub fn operation_url(
        &self,
        base: &str,
        operation: &str,
        params: &[(&str, String)],
    ) -> String {
        let mut url = String::from(base.trim_end_matches('/'));
        url.push('/');
        url.push_str(API_ROOT);
        url.push('/');
        url.push_str(&encode_segment(&self.kind));
        for segment in &self.path {
            url.push('/');
            url.push_str(&encode_segment(segment));
        }
        url.push('/');
        url.push_str(&encode_segment(operation));

        let mut separator = '?';
        for (key, value) in params {
            url.push(separator);
            url.push_str(&utf8_percent_encode(key, QUERY_COMPONENT).to_string());
            url.push('=');
            url.push_str(&utf8_percent_encode(value, QUERY_COMPONENT).to_string());
            separator = '&';
        }
        url
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

//! In-memory management API for tests. Records every call it receives.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::Notify;

use crate::api::{ContentHint, ContentParams, ManagementApi, MetadataParams};
use crate::error::ApiError;
use crate::models::{ContentPayload, MessageMetadata, ObjectRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Metadata {
        id: String,
        include_headers: bool,
    },
    Content {
        id: String,
        limit: Option<usize>,
        content_type: String,
    },
}

#[derive(Default)]
pub(crate) struct RecordingApi {
    messages: HashMap<String, Value>,
    contents: HashMap<String, Vec<u8>>,
    /// Principal may not read headers: header requests fail with 403.
    forbid_headers: bool,
    /// Errors handed out to the next metadata calls, before normal handling.
    scripted: Mutex<VecDeque<ApiError>>,
    content_error: Option<ApiError>,
    /// Return the whole body even when a limit was requested.
    ignore_limit: bool,
    /// Metadata calls for these ids wait until notified.
    gates: HashMap<String, Arc<Notify>>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_message(mut self, info: Value) -> Self {
        let id = info
            .get("id")
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();
        self.messages.insert(id, info);
        self
    }

    pub(crate) fn with_content(mut self, id: &str, body: impl Into<Vec<u8>>) -> Self {
        self.contents.insert(id.to_string(), body.into());
        self
    }

    pub(crate) fn forbidding_headers(mut self) -> Self {
        self.forbid_headers = true;
        self
    }

    pub(crate) fn with_scripted_errors(self, errors: Vec<ApiError>) -> Self {
        *self.scripted.lock().unwrap() = errors.into();
        self
    }

    pub(crate) fn with_content_error(mut self, error: ApiError) -> Self {
        self.content_error = Some(error);
        self
    }

    pub(crate) fn ignoring_limit(mut self) -> Self {
        self.ignore_limit = true;
        self
    }

    pub(crate) fn gated(mut self, id: &str, gate: Arc<Notify>) -> Self {
        self.gates.insert(id.to_string(), gate);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn metadata_calls(&self) -> Vec<bool> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Metadata {
                    include_headers, ..
                } => Some(include_headers),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn content_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Content { .. }))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ManagementApi for RecordingApi {
    async fn load_metadata(
        &self,
        _object: &ObjectRef,
        params: &MetadataParams,
    ) -> Result<MessageMetadata, ApiError> {
        let id = params.message_id.to_string();
        self.record(Call::Metadata {
            id: id.clone(),
            include_headers: params.include_headers,
        });

        if let Some(gate) = self.gates.get(&id) {
            gate.notified().await;
        }

        let scripted = self.scripted.lock().unwrap().pop_front();
        if let Some(err) = scripted {
            return Err(err);
        }
        if self.forbid_headers && params.include_headers {
            return Err(ApiError::Authorization { status: 403 });
        }

        let mut info = self
            .messages
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::Transport(format!("404 message {id}")))?;
        if !params.include_headers {
            if let Value::Object(map) = &mut info {
                map.remove("headers");
            }
        }
        MessageMetadata::from_json(info)
    }

    async fn load_content(
        &self,
        _object: &ObjectRef,
        params: &ContentParams,
        hint: &ContentHint,
    ) -> Result<ContentPayload, ApiError> {
        let id = params.message_id.to_string();
        self.record(Call::Content {
            id: id.clone(),
            limit: params.limit,
            content_type: hint.content_type.clone(),
        });
        if let Some(err) = &self.content_error {
            return Err(err.clone());
        }
        let body = self
            .contents
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::Transport(format!("404 content {id}")))?;
        let declared_size = Some(body.len() as u64);
        let bytes = match params.limit {
            Some(limit) if !self.ignore_limit && body.len() > limit => body[..limit].to_vec(),
            _ => body,
        };
        Ok(ContentPayload {
            bytes,
            declared_size,
        })
    }

    fn build_download_url(&self, object: &ObjectRef, params: &ContentParams) -> String {
        object.operation_url(
            "http://broker",
            crate::api::GET_MESSAGE_CONTENT,
            &params.query(),
        )
    }
}

//! Presentation model: what the message dialog shows for one fetch.
//!
//! Display slots are registered once with an explicit kind; rendering never
//! inspects markup to decide how a value is shown.

use std::io;

use indexmap::IndexMap;
use serde_json::Value;

use crate::format::{escape_html, scalar_html, scalar_text, DateTimeStyle, UserPreferences};
use crate::mime::{self, DecodedBody};
use crate::models::{MessageId, MessageMetadata};
use crate::preview::{preview_notice, Column, ContentPreview, Row, Table};

/// Preview size used when nothing else is configured.
pub const DEFAULT_PREVIEW_LIMIT: usize = 1024;
pub const DEFAULT_TEXT_ROWS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Plain,
    /// Nested mapping rendered as a Header/Value table.
    Map,
    DateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySlot {
    pub name: String,
    pub kind: SlotKind,
    /// Only shown when the full message could be fetched.
    pub confidential: bool,
}

/// Display slots keyed by the attribute they show.
#[derive(Debug, Clone, Default)]
pub struct SlotRegistry {
    slots: IndexMap<String, DisplaySlot>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slots of the broker console's message dialog.
    pub fn standard() -> Self {
        let mut slots = Self::new();
        for name in [
            "id",
            "messageId",
            "correlationId",
            "userId",
            "encoding",
            "mimeType",
            "size",
            "priority",
            "persistent",
            "state",
            "deliveryCount",
        ] {
            slots.register(name, SlotKind::Plain);
        }
        for name in [
            "arrivalTime",
            "expirationTime",
            "timestamp",
            "initialDeliveryTime",
        ] {
            slots.register(name, SlotKind::DateTime);
        }
        slots.register_confidential("headers", SlotKind::Map);
        slots
    }

    pub fn register(&mut self, name: &str, kind: SlotKind) -> &mut Self {
        self.insert(name, kind, false)
    }

    pub fn register_confidential(&mut self, name: &str, kind: SlotKind) -> &mut Self {
        self.insert(name, kind, true)
    }

    fn insert(&mut self, name: &str, kind: SlotKind, confidential: bool) -> &mut Self {
        self.slots.insert(
            name.to_string(),
            DisplaySlot {
                name: name.to_string(),
                kind,
                confidential,
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&DisplaySlot> {
        self.slots.get(name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldContent {
    /// Slot claimed by a null attribute.
    Empty,
    Html(String),
    /// Confidential slot shown as a placeholder.
    Redacted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedField {
    pub slot: String,
    pub kind: SlotKind,
    pub content: FieldContent,
}

impl RenderedField {
    /// Markup to insert into the slot; empty for null and redacted values.
    pub fn html(&self) -> &str {
        match &self.content {
            FieldContent::Html(html) => html,
            FieldContent::Empty | FieldContent::Redacted => "",
        }
    }
}

/// Link to download the complete body. Its title is the URL itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub url: String,
}

impl DownloadLink {
    pub fn title(&self) -> &str {
        &self.url
    }

    /// Hand the link to the system browser.
    pub fn open(&self) -> io::Result<()> {
        open::that(&self.url).inspect_err(|e| {
            log::warn!("Failed to open download link {}: {e}", self.url);
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewPlan {
    /// Preview pane stays hidden; no content is fetched.
    Hidden,
    /// Preview pane is shown and its content requested.
    Pending {
        mime_type: String,
        limit: usize,
        total_bytes: u64,
        notice: String,
    },
}

/// Everything the dialog shows for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationModel {
    pub message_id: MessageId,
    pub fields: Vec<RenderedField>,
    pub includes_confidential: bool,
    pub download: Option<DownloadLink>,
    pub preview: PreviewPlan,
}

impl PresentationModel {
    pub fn field(&self, slot: &str) -> Option<&RenderedField> {
        self.fields.iter().find(|f| f.slot == slot)
    }

    pub fn show_confidential(&self) -> bool {
        self.includes_confidential
    }

    /// The "confidential information redacted" warning.
    pub fn show_redaction_warning(&self) -> bool {
        !self.includes_confidential
    }

    pub fn show_placeholders(&self) -> bool {
        !self.includes_confidential
    }

    pub fn preview_notice(&self) -> Option<&str> {
        match &self.preview {
            PreviewPlan::Pending { notice, .. } => Some(notice),
            PreviewPlan::Hidden => None,
        }
    }
}

/// Turns fetched metadata and decoded content into presentation state.
#[derive(Debug, Clone)]
pub struct PresentationBuilder {
    slots: SlotRegistry,
    preferences: UserPreferences,
    preview_limit: usize,
    text_rows: u32,
}

impl Default for PresentationBuilder {
    fn default() -> Self {
        Self::new(SlotRegistry::standard(), UserPreferences::default())
    }
}

impl PresentationBuilder {
    pub fn new(slots: SlotRegistry, preferences: UserPreferences) -> Self {
        Self {
            slots,
            preferences,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            text_rows: DEFAULT_TEXT_ROWS,
        }
    }

    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit.max(1);
        self
    }

    pub fn with_text_rows(mut self, rows: u32) -> Self {
        self.text_rows = rows;
        self
    }

    pub fn preview_limit(&self) -> usize {
        self.preview_limit
    }

    pub fn slots(&self) -> &SlotRegistry {
        &self.slots
    }

    /// Build the dialog model. `download_url` is only consulted when the
    /// confidential body may be shown.
    pub fn build(
        &self,
        metadata: &MessageMetadata,
        includes_confidential: bool,
        download_url: impl FnOnce(&MessageId) -> String,
    ) -> PresentationModel {
        let fields = metadata
            .attributes()
            .filter_map(|(name, value)| {
                let slot = self.slots.get(name)?;
                Some(RenderedField {
                    slot: slot.name.clone(),
                    kind: slot.kind,
                    content: self.render(slot, value, includes_confidential),
                })
            })
            .collect();

        let (download, preview) = if includes_confidential {
            let link = DownloadLink {
                url: download_url(metadata.id()),
            };
            (Some(link), self.plan_preview(metadata))
        } else {
            (None, PreviewPlan::Hidden)
        };

        PresentationModel {
            message_id: metadata.id().clone(),
            fields,
            includes_confidential,
            download,
            preview,
        }
    }

    fn plan_preview(&self, metadata: &MessageMetadata) -> PreviewPlan {
        match metadata.mime_type() {
            Some(mime_type) if mime::is_previewable(Some(mime_type)) => PreviewPlan::Pending {
                mime_type: mime_type.to_string(),
                limit: self.preview_limit,
                total_bytes: metadata.size_bytes(),
                notice: preview_notice(self.preview_limit as u64, metadata.size_bytes()),
            },
            _ => PreviewPlan::Hidden,
        }
    }

    fn render(&self, slot: &DisplaySlot, value: &Value, includes_confidential: bool) -> FieldContent {
        if slot.confidential && !includes_confidential {
            return FieldContent::Redacted;
        }
        if value.is_null() {
            return FieldContent::Empty;
        }
        let html = match (slot.kind, value) {
            (SlotKind::Map, Value::Object(entries)) => header_table(entries).to_html(),
            (SlotKind::DateTime, _) => match self.preferences.format_date_time(value, DateTimeStyle::FULL) {
                Some(text) => escape_html(&text),
                None => scalar_html(value),
            },
            _ => scalar_html(value),
        };
        FieldContent::Html(html)
    }

    /// Preview for content fetched under `limit` for a body of `total_bytes`.
    pub fn build_preview(&self, decoded: DecodedBody, limit: usize, total_bytes: u64) -> ContentPreview {
        ContentPreview::new(decoded, limit, total_bytes, self.text_rows)
    }
}

fn header_table(entries: &serde_json::Map<String, Value>) -> Table {
    let rows = mime::enumeration_order(entries)
        .into_iter()
        .map(|(name, value)| Row {
            id: name.to_string(),
            value: scalar_text(value),
        })
        .collect();
    Table::new(
        vec![
            Column::new("id", "Header").with_width("6em"),
            Column::new("value", "Value"),
        ],
        rows,
    )
}

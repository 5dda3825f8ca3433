//! Preview widgets and the single mount point they live in.

use crate::format::escape_html;
use crate::mime::{DecodedBody, KeyValue, ListItem};

/// Column definition of a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Row field shown in this column: `id` or `value`.
    pub field: &'static str,
    pub label: &'static str,
    pub width: Option<&'static str>,
}

impl Column {
    pub const fn new(field: &'static str, label: &'static str) -> Self {
        Self {
            field,
            label,
            width: None,
        }
    }

    pub fn with_width(mut self, width: &'static str) -> Self {
        self.width = Some(width);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: String,
    pub value: String,
}

/// Tabular rendering independent of any widget toolkit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Single `Item` column; row ids are element indices.
    pub fn item_list(items: Vec<ListItem>) -> Self {
        let rows = items
            .into_iter()
            .map(|item| Row {
                id: item.index.to_string(),
                value: item.value,
            })
            .collect();
        Self::new(vec![Column::new("value", "Item")], rows)
    }

    /// `Key` and `Value` columns.
    pub fn key_value(entries: Vec<KeyValue>) -> Self {
        let rows = entries
            .into_iter()
            .map(|entry| Row {
                id: entry.key,
                value: entry.value,
            })
            .collect();
        Self::new(
            vec![Column::new("id", "Key"), Column::new("value", "Value")],
            rows,
        )
    }

    pub fn cell<'a>(&self, row: &'a Row, column: &Column) -> &'a str {
        match column.field {
            "id" => &row.id,
            _ => &row.value,
        }
    }

    /// HTML rendering with every cell escaped.
    pub fn to_html(&self) -> String {
        let mut html = String::from("<table style='border: 1pt'><tr>");
        for column in &self.columns {
            match column.width {
                Some(width) => html.push_str(&format!(
                    "<th style='width: {width}; font-weight: bold'>"
                )),
                None => html.push_str("<th style='font-weight: bold'>"),
            }
            html.push_str(&escape_html(column.label));
            html.push_str("</th>");
        }
        html.push_str("</tr>");
        for row in &self.rows {
            html.push_str("<tr>");
            for column in &self.columns {
                html.push_str("<td>");
                html.push_str(&escape_html(self.cell(row, column)));
                html.push_str("</td>");
            }
            html.push_str("</tr>");
        }
        html.push_str("</table>");
        html
    }
}

/// Read-only text area for plain-text bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextArea {
    pub value: String,
    pub rows: u32,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewWidget {
    Text(TextArea),
    Table(Table),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayKind {
    PlainText,
    ItemList,
    KeyValueTable,
}

/// `showing the first N of M bytes` / `showing all M bytes`.
pub fn preview_notice(limit: u64, total_bytes: u64) -> String {
    if limit < total_bytes {
        format!("showing the first {limit} of {total_bytes} bytes")
    } else {
        format!("showing all {total_bytes} bytes")
    }
}

/// A decoded preview ready to mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPreview {
    pub kind: DisplayKind,
    pub widget: PreviewWidget,
    pub truncated: bool,
    pub shown_bytes: u64,
    pub total_bytes: u64,
}

impl ContentPreview {
    pub fn new(decoded: DecodedBody, limit: usize, total_bytes: u64, text_rows: u32) -> Self {
        let shown_bytes = total_bytes.min(limit as u64);
        let (kind, widget) = match decoded {
            DecodedBody::PlainText(value) => (
                DisplayKind::PlainText,
                PreviewWidget::Text(TextArea {
                    value,
                    rows: text_rows,
                    read_only: true,
                }),
            ),
            DecodedBody::ItemList(items) => {
                (DisplayKind::ItemList, PreviewWidget::Table(Table::item_list(items)))
            }
            DecodedBody::KeyValueTable(entries) => (
                DisplayKind::KeyValueTable,
                PreviewWidget::Table(Table::key_value(entries)),
            ),
        };
        Self {
            kind,
            widget,
            truncated: shown_bytes < total_bytes,
            shown_bytes,
            total_bytes,
        }
    }

    /// Table rows, or nothing for text previews.
    pub fn rows(&self) -> &[Row] {
        match &self.widget {
            PreviewWidget::Table(table) => table.rows.as_slice(),
            PreviewWidget::Text(_) => &[],
        }
    }

    pub fn notice(&self) -> String {
        preview_notice(self.shown_bytes, self.total_bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedPreview {
    pub id: WidgetId,
    pub preview: ContentPreview,
}

/// The preview pane's only mount point. At most one widget is mounted; the
/// previous one is disposed before a new one goes in.
#[derive(Debug, Default)]
pub struct PreviewMount {
    mounted: Option<MountedPreview>,
    next_id: u64,
    disposed: u64,
}

impl PreviewMount {
    pub fn current(&self) -> Option<&MountedPreview> {
        self.mounted.as_ref()
    }

    /// Number of widgets disposed over the mount's lifetime.
    pub fn disposed_count(&self) -> u64 {
        self.disposed
    }

    pub(crate) fn mount(&mut self, preview: ContentPreview) -> WidgetId {
        self.dispose();
        self.next_id += 1;
        let id = WidgetId(self.next_id);
        log::debug!("Mounting {:?} preview as widget {}", preview.kind, self.next_id);
        self.mounted = Some(MountedPreview { id, preview });
        id
    }

    pub(crate) fn dispose(&mut self) -> Option<WidgetId> {
        let old = self.mounted.take()?;
        self.disposed += 1;
        log::debug!("Disposed preview widget {}", old.id.0);
        Some(old.id)
    }
}

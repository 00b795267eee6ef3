//! Column descriptors and the cells they render.
//!
//! A table is a list of [`ColumnDef`]s run over a list of rows. Each column
//! reads one value from the row by key and produces a [`RenderedCell`]: the
//! display text plus alignment and weight hints for whatever draws it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::amount::{format_usd, parse_amount};
use crate::types::{Instance, Node};

/// Anything a column can read a value out of by key.
pub trait Row {
    fn get_value(&self, key: &str) -> Option<Value>;
}

impl Row for Value {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

fn timestamp(at: &DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339())
}

impl Row for Node {
    fn get_value(&self, key: &str) -> Option<Value> {
        let value = match key {
            "id" => json!(self.id),
            "name" => json!(self.name),
            "region" => json!(self.region),
            "status" => json!(self.status.as_str()),
            "devMode" => json!(self.dev_mode),
            "capacitySlots" => json!(self.capacity_slots),
            "usedSlots" => json!(self.used_slots),
            "lastHeartbeatAt" => timestamp(&self.last_heartbeat_at),
            "nodeVersion" => json!(self.node_version),
            "tags" => json!(self.tags),
            "baseUrl" => json!(self.base_url),
            _ => return None,
        };
        Some(value)
    }
}

impl Row for Instance {
    fn get_value(&self, key: &str) -> Option<Value> {
        let value = match key {
            "id" => json!(self.id),
            "name" => json!(self.name),
            "displayName" => json!(self.display_name),
            "state" => json!(self.state.as_str()),
            "requestedByUserId" => json!(self.requested_by_user_id),
            "node" => json!(self.node.name),
            "region" => json!(self.region),
            "tags" => json!(self.tags),
            "devModeAllowed" => json!(self.dev_mode_allowed),
            "portsJson" => json!(self.ports_json),
            "variablesJson" => json!(self.variables_json),
            "createdAt" => timestamp(&self.created_at),
            "updatedAt" => timestamp(&self.updated_at),
            "startedAt" => timestamp(self.started_at.as_ref()?),
            "stoppedAt" => timestamp(self.stopped_at.as_ref()?),
            "failureReason" => json!(self.failure_reason.as_ref()?),
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Weight {
    Normal,
    Medium,
}

/// One rendered header or body cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedCell {
    pub text: String,
    pub align: Align,
    pub weight: Weight,
}

impl RenderedCell {
    pub fn left(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            align: Align::Left,
            weight: Weight::Normal,
        }
    }

    pub fn right(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            align: Align::Right,
            weight: Weight::Normal,
        }
    }

    pub fn medium(mut self) -> Self {
        self.weight = Weight::Medium;
        self
    }

    /// Utility-class hint for HTML renderers, e.g. `"text-right font-medium"`.
    pub fn class(&self) -> String {
        let mut classes = Vec::new();
        if self.align == Align::Right {
            classes.push("text-right");
        }
        if self.weight == Weight::Medium {
            classes.push("font-medium");
        }
        classes.join(" ")
    }
}

/// A column: the key it reads, how its header looks, how each cell renders.
#[derive(Clone, Copy)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: fn() -> RenderedCell,
    pub cell: fn(&dyn Row) -> RenderedCell,
}

impl ColumnDef {
    pub fn render_header(&self) -> RenderedCell {
        (self.header)()
    }

    pub fn render_cell(&self, row: &dyn Row) -> RenderedCell {
        (self.cell)(row)
    }
}

impl std::fmt::Debug for ColumnDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnDef").field("key", &self.key).finish()
    }
}

/// Plain text of a value, or empty when the row has nothing under `key`.
fn text_of(row: &dyn Row, key: &str) -> String {
    match row.get_value(key) {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn datetime_text(row: &dyn Row, key: &str) -> String {
    let raw = text_of(row, key);
    DateTime::parse_from_rfc3339(&raw)
        .map(|at| at.with_timezone(&Utc).format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or(raw)
}

/// Right-aligned "Amount" column showing the row's `amount` as US dollars.
pub fn amount_column() -> ColumnDef {
    ColumnDef {
        key: "amount",
        header: || RenderedCell::right("Amount"),
        cell: |row| {
            let amount = parse_amount(row.get_value("amount").as_ref());
            RenderedCell::right(format_usd(amount)).medium()
        },
    }
}

pub fn instance_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef {
            key: "displayName",
            header: || RenderedCell::left("Name"),
            cell: |row| RenderedCell::left(text_of(row, "displayName")).medium(),
        },
        ColumnDef {
            key: "state",
            header: || RenderedCell::left("State"),
            cell: |row| RenderedCell::left(text_of(row, "state")),
        },
        ColumnDef {
            key: "node",
            header: || RenderedCell::left("Node"),
            cell: |row| RenderedCell::left(text_of(row, "node")),
        },
        ColumnDef {
            key: "region",
            header: || RenderedCell::left("Region"),
            cell: |row| RenderedCell::left(text_of(row, "region")),
        },
        ColumnDef {
            key: "createdAt",
            header: || RenderedCell::left("Created"),
            cell: |row| RenderedCell::left(datetime_text(row, "createdAt")),
        },
        amount_column(),
    ]
}

pub fn node_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef {
            key: "name",
            header: || RenderedCell::left("Name"),
            cell: |row| RenderedCell::left(text_of(row, "name")).medium(),
        },
        ColumnDef {
            key: "status",
            header: || RenderedCell::left("Status"),
            cell: |row| RenderedCell::left(text_of(row, "status")),
        },
        ColumnDef {
            key: "region",
            header: || RenderedCell::left("Region"),
            cell: |row| RenderedCell::left(text_of(row, "region")),
        },
        ColumnDef {
            key: "usedSlots",
            header: || RenderedCell::right("Slots"),
            cell: |row| {
                RenderedCell::right(format!(
                    "{}/{}",
                    text_of(row, "usedSlots"),
                    text_of(row, "capacitySlots")
                ))
            },
        },
        ColumnDef {
            key: "lastHeartbeatAt",
            header: || RenderedCell::left("Last heartbeat"),
            cell: |row| RenderedCell::left(datetime_text(row, "lastHeartbeatAt")),
        },
        ColumnDef {
            key: "nodeVersion",
            header: || RenderedCell::left("Version"),
            cell: |row| RenderedCell::left(text_of(row, "nodeVersion")),
        },
    ]
}

/// A fully rendered table, ready to serialize.
#[derive(Debug, Clone, Serialize)]
pub struct TableView {
    pub columns: Vec<&'static str>,
    pub headers: Vec<RenderedCell>,
    pub rows: Vec<Vec<RenderedCell>>,
}

pub fn render_table<R: Row>(columns: &[ColumnDef], rows: &[R]) -> TableView {
    TableView {
        columns: columns.iter().map(|c| c.key).collect(),
        headers: columns.iter().map(ColumnDef::render_header).collect(),
        rows: rows
            .iter()
            .map(|row| columns.iter().map(|c| c.render_cell(row)).collect())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InstanceState, NodeStatus};
    use chrono::TimeZone;

    fn node() -> Node {
        Node {
            id: "node-1".into(),
            name: "fra-worker-01".into(),
            region: "eu-central".into(),
            status: NodeStatus::Online,
            dev_mode: false,
            capacity_slots: 8,
            used_slots: 3,
            last_heartbeat_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            node_version: "1.4.2".into(),
            tags: String::new(),
            base_url: "http://10.0.0.5:8081".into(),
        }
    }

    fn instance() -> Instance {
        Instance {
            id: "inst-1".into(),
            name: "lobby-7f3a".into(),
            display_name: "Lobby".into(),
            state: InstanceState::Running,
            requested_by_user_id: "user-9".into(),
            node: node(),
            region: "eu-central".into(),
            tags: String::new(),
            dev_mode_allowed: false,
            ports_json: "[]".into(),
            variables_json: "{}".into(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 3, 1, 11, 5, 0).unwrap(),
            started_at: None,
            stopped_at: None,
            failure_reason: None,
        }
    }

    #[test]
    fn amount_header_is_right_aligned_label() {
        let header = amount_column().render_header();
        assert_eq!(header.text, "Amount");
        assert_eq!(header.align, Align::Right);
        assert_eq!(header.class(), "text-right");
    }

    #[test]
    fn amount_cell_formats_string_amounts() {
        let row = json!({ "amount": "1234.5" });
        let cell = amount_column().render_cell(&row);
        assert_eq!(cell.text, "$1,234.50");
        assert_eq!(cell.align, Align::Right);
        assert_eq!(cell.weight, Weight::Medium);
        assert_eq!(cell.class(), "text-right font-medium");
    }

    #[test]
    fn amount_cell_formats_numeric_amounts() {
        let row = json!({ "amount": -42.1 });
        assert_eq!(amount_column().render_cell(&row).text, "-$42.10");
    }

    #[test]
    fn amount_cell_falls_back_to_nan() {
        for row in [json!({ "amount": "abc" }), json!({ "amount": "" }), json!({})] {
            assert_eq!(amount_column().render_cell(&row).text, "NaN");
        }
    }

    #[test]
    fn amount_cell_is_repeatable() {
        let row = json!({ "amount": "0" });
        let column = amount_column();
        assert_eq!(column.render_cell(&row), column.render_cell(&row));
        assert_eq!(column.render_cell(&row).text, "$0.00");
    }

    #[test]
    fn instance_row_exposes_fields_by_key() {
        let instance = instance();
        assert_eq!(instance.get_value("state"), Some(json!("RUNNING")));
        assert_eq!(instance.get_value("node"), Some(json!("fra-worker-01")));
        assert_eq!(instance.get_value("startedAt"), None);
        assert_eq!(instance.get_value("amount"), None);
    }

    #[test]
    fn instance_table_renders_every_column() {
        let table = render_table(&instance_columns(), &[instance()]);
        assert_eq!(
            table.columns,
            vec!["displayName", "state", "node", "region", "createdAt", "amount"]
        );
        assert_eq!(table.headers.len(), 6);
        let row = &table.rows[0];
        assert_eq!(row[0].text, "Lobby");
        assert_eq!(row[1].text, "RUNNING");
        assert_eq!(row[2].text, "fra-worker-01");
        assert_eq!(row[4].text, "2026-03-01 11:00 UTC");
        // Instances carry no amount.
        assert_eq!(row[5].text, "NaN");
    }

    #[test]
    fn node_table_shows_slot_usage() {
        let table = render_table(&node_columns(), &[node()]);
        let row = &table.rows[0];
        assert_eq!(row[0].text, "fra-worker-01");
        assert_eq!(row[1].text, "ONLINE");
        assert_eq!(row[3].text, "3/8");
        assert_eq!(row[3].align, Align::Right);
        assert_eq!(row[4].text, "2026-03-01 12:00 UTC");
    }

    #[test]
    fn table_of_no_rows_still_has_headers() {
        let rows: Vec<Value> = Vec::new();
        let table = render_table(&[amount_column()], &rows);
        assert_eq!(table.headers[0].text, "Amount");
        assert!(table.rows.is_empty());
    }
}

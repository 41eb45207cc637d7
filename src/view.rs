//! Toolkit independent table view: a repository plus a selection set.

use std::collections::{BTreeSet, HashMap};

use tracing::{info, trace};

use crate::record::{Record, Value, field_names};
use crate::repository::Repository;

/// State of the select-all control, derived from the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectControl {
    Empty,
    Partial,
    All,
}

impl SelectControl {
    /// Action the control performs when pressed.
    pub fn label(&self) -> &'static str {
        match self {
            SelectControl::All => "Clear selection",
            SelectControl::Empty | SelectControl::Partial => "Select all",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            SelectControl::All => "✗",
            SelectControl::Empty | SelectControl::Partial => "✓",
        }
    }
}

/// One rendered body row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub key: Option<Value>,
    pub label: String,
    pub checked: bool,
    pub highlighted: bool,
    pub cells: Vec<String>,
}

/// Everything a toolkit needs to draw one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRender {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<RowView>,
    pub control: SelectControl,
    pub selected: usize,
    index: HashMap<Value, Vec<usize>>,
}

impl TableRender {
    fn empty(name: &str) -> Self {
        TableRender {
            name: name.to_string(),
            header: Vec::new(),
            rows: Vec::new(),
            control: SelectControl::Empty,
            selected: 0,
            index: HashMap::new(),
        }
    }

    /// Positions of the rows carrying `key`.
    pub fn positions(&self, key: &Value) -> &[usize] {
        self.index.get(key).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Outcome of a bulk delete, for status reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOutcome {
    pub requested: usize,
    pub deleted: Vec<Value>,
}

/// Compute the control state for `selection` against the keyed rows.
pub fn select_control(rows: &[Record], primary_key: &str, selection: &BTreeSet<Value>) -> SelectControl {
    if selection.is_empty() {
        return SelectControl::Empty;
    }
    let all_selected = rows
        .iter()
        .filter_map(|row| row.get(primary_key))
        .all(|key| selection.contains(key));
    if all_selected {
        SelectControl::All
    } else {
        SelectControl::Partial
    }
}

/// Render `rows` into a table description.
///
/// Columns are the union of all field names except `primary_key`, in
/// alphabetical order. The primary key gets the leading column.
pub fn render(
    name: &str,
    rows: &[Record],
    primary_key: &str,
    selection: &BTreeSet<Value>,
) -> TableRender {
    let mut columns = field_names(rows);
    columns.remove(primary_key);

    let mut header = Vec::with_capacity(columns.len() + 1);
    header.push(primary_key.to_string());
    header.extend(columns.iter().cloned());

    let body: Vec<RowView> = rows
        .iter()
        .map(|row| {
            let key = row.get(primary_key).cloned();
            let selected = key.as_ref().is_some_and(|k| selection.contains(k));
            RowView {
                label: key.as_ref().map(Value::to_string).unwrap_or_default(),
                key,
                checked: selected,
                highlighted: selected,
                cells: columns
                    .iter()
                    .map(|c| row.get(c).map(Value::to_string).unwrap_or_default())
                    .collect(),
            }
        })
        .collect();

    let mut index: HashMap<Value, Vec<usize>> = HashMap::new();
    for (idx, row) in body.iter().enumerate() {
        if let Some(key) = &row.key {
            index.entry(key.clone()).or_default().push(idx);
        }
    }

    TableRender {
        name: name.to_string(),
        header,
        rows: body,
        index,
        control: select_control(rows, primary_key, selection),
        selected: selection.len(),
    }
}

pub struct TableView {
    repository: Repository,
    selection: BTreeSet<Value>,
    rendered: TableRender,
}

impl TableView {
    /// Bind a view to `repository` and render it once.
    pub fn new(repository: Repository) -> Self {
        let mut view = TableView {
            rendered: TableRender::empty(repository.table_name()),
            repository,
            selection: BTreeSet::new(),
        };
        view.render();
        view
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn selection(&self) -> &BTreeSet<Value> {
        &self.selection
    }

    pub fn rendered(&self) -> &TableRender {
        &self.rendered
    }

    pub fn render(&mut self) {
        self.rendered = render(
            self.repository.table_name(),
            self.repository.rows(),
            self.repository.primary_key(),
            &self.selection,
        );
    }

    /// Re-apply check marks, highlighting, and the control state without
    /// rebuilding the cells.
    fn update_selection(&mut self) {
        for row in self.rendered.rows.iter_mut() {
            let selected = row.key.as_ref().is_some_and(|k| self.selection.contains(k));
            row.checked = selected;
            row.highlighted = selected;
        }
        self.update_control();
    }

    fn update_control(&mut self) {
        self.rendered.control = select_control(
            self.repository.rows(),
            self.repository.primary_key(),
            &self.selection,
        );
        self.rendered.selected = self.selection.len();
    }

    pub fn toggle(&mut self, key: &Value, checked: bool) {
        if checked {
            self.selection.insert(key.clone());
        } else {
            self.selection.remove(key);
        }
        trace!("Toggled {} => {}", key, checked);
        for idx in self.rendered.positions(key).to_vec() {
            let row = &mut self.rendered.rows[idx];
            row.checked = checked;
            row.highlighted = checked;
        }
        self.update_control();
    }

    /// Flip the selection state of the row at `idx`.
    pub fn toggle_row(&mut self, idx: usize) {
        let Some(key) = self.rendered.rows.get(idx).and_then(|r| r.key.clone()) else {
            return;
        };
        let checked = !self.selection.contains(&key);
        self.toggle(&key, checked);
    }

    pub fn select_all(&mut self) {
        if self.repository.size() == 0 {
            return;
        }
        let primary_key = self.repository.primary_key();
        let keys: Vec<&Value> = self
            .repository
            .rows()
            .iter()
            .filter_map(|row| row.get(primary_key))
            .collect();

        if keys.iter().all(|k| self.selection.contains(*k)) {
            self.selection.clear();
        } else {
            self.selection.extend(keys.into_iter().cloned());
        }
        self.update_selection();
    }

    pub async fn refresh(&mut self) {
        self.repository.refresh().await;
        self.prune_selection();
        self.render();
    }

    pub async fn delete_selected(&mut self) -> Option<DeleteOutcome> {
        if self.selection.is_empty() {
            return None;
        }
        let ids: Vec<Value> = self.selection.iter().cloned().collect();
        let deleted = self.repository.delete(&ids).await;
        for key in deleted.iter() {
            self.selection.remove(key);
        }
        self.prune_selection();
        self.render();
        Some(DeleteOutcome {
            requested: ids.len(),
            deleted,
        })
    }

    /// Reserved for table settings.
    pub fn settings(&mut self) {
        trace!("Settings requested for {}", self.repository.table_name());
    }

    /// Drop selected keys that no longer exist in the table.
    fn prune_selection(&mut self) {
        let keys = self.repository.keys();
        let before = self.selection.len();
        self.selection.retain(|k| keys.contains(k));
        if self.selection.len() != before {
            info!(
                "Dropped {} stale keys from the selection of {}",
                before - self.selection.len(),
                self.repository.table_name()
            );
        }
    }
}

//! Table of the cached collection: a sortable header, one line per record
//! and a delete control at the end of each row.

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

use super::bind;
use super::drag::{DragSession, DragSurface, SlotKind};
use super::renderfns::{fit, truncate};
use crate::bus::{Channel, EventBus};
use crate::store::record::{Record, RowId};
use crate::store::sort::{Direction as SortDirection, SortDescriptor};

const HANDLE: &str = "⠿ ";
const HANDLE_GAP: &str = "  ";
const DELETE_LABEL: &str = " ✕ ";
const DELETE_WIDTH: u16 = 3;
const MIN_COLUMN_WIDTH: u16 = 6;

/// What a click on the table asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableAction {
  Sort(usize),
  RemoveRow(RowId),
  Reorder(Vec<RowId>),
}

/// Part of the table under a screen cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
  Header(usize),
  /// First cell of a row, where drags start
  Handle(usize),
  Cell(usize),
  Delete(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
  pub label: String,
  pub active: bool,
  pub direction: Option<SortDirection>,
}

impl HeaderCell {
  fn new(label: &str) -> Self {
    Self {
      label: label.to_string(),
      active: false,
      direction: None,
    }
  }

  fn arrow(&self) -> &'static str {
    match self.direction {
      Some(SortDirection::Asc) if self.active => " ▲",
      Some(SortDirection::Desc) if self.active => " ▼",
      _ => "",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
  pub id: RowId,
  pub cells: Vec<String>,
}

/// Screen layout of the last draw, used for hit testing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Geometry {
  x: u16,
  header_y: u16,
  body_y: u16,
  body_height: u16,
  column_width: u16,
  delete_x: u16,
  offset: usize,
}

#[derive(Debug)]
pub struct TableView {
  max_columns: usize,
  head: Vec<HeaderCell>,
  rows: Vec<RowView>,
  /// Bumped on every collection render
  generation: u64,
  /// Original rows are hidden while a drag shows the clone list
  hidden: bool,
  column_cursor: usize,
  list_state: ListState,
  geometry: Option<Geometry>,
}

impl TableView {
  pub fn new(max_columns: usize) -> Self {
    Self {
      max_columns,
      head: Vec::new(),
      rows: Vec::new(),
      generation: 0,
      hidden: false,
      column_cursor: 0,
      list_state: ListState::default(),
      geometry: None,
    }
  }

  /// Create the view and subscribe it to collection and sort updates.
  pub fn attach(bus: &EventBus, max_columns: usize) -> Rc<RefCell<Self>> {
    let view = Rc::new(RefCell::new(Self::new(max_columns)));

    bind(bus, Channel::LocalStoreSuccess, &view, |table, payload| {
      if let Some(records) = payload.records() {
        table.render_collection(records);
      }
    });
    bind(bus, Channel::LocalStoreUpdateSort, &view, |table, payload| {
      if let Some(sort) = payload.sort() {
        table.update_sort_info(sort);
      }
    });
    bind(bus, Channel::LocalStoreClear, &view, |table, _| {
      table.clear_head()
    });

    view
  }

  /// Replace the rows. The header is built from the first record on the
  /// first render and kept until cleared.
  pub fn render_collection(&mut self, records: &[Record]) {
    let Some(first) = records.first() else {
      return;
    };

    let keys: Vec<&str> = first.field_names().take(self.max_columns).collect();
    if self.head.is_empty() {
      self.head = keys.iter().map(|key| HeaderCell::new(key)).collect();
      self.column_cursor = 0;
    }

    self.rows = records
      .iter()
      .map(|record| RowView {
        id: record.id().unwrap_or_default(),
        cells: keys.iter().map(|key| record.display(key)).collect(),
      })
      .collect();
    self.generation += 1;

    ensure_valid_selection(&mut self.list_state, self.rows.len());
    debug!(rows = self.rows.len(), columns = self.head.len(), "Rendered collection");
  }

  /// Mark the sorted column. Only one header cell is active at a time.
  pub fn update_sort_info(&mut self, sort: &SortDescriptor) {
    for cell in &mut self.head {
      cell.active = false;
      cell.direction = None;
    }
    if let Some(cell) = self.head.get_mut(sort.by) {
      cell.active = true;
      cell.direction = Some(sort.direction);
    }
  }

  /// Forget the header, so the next collection rebuilds it
  pub fn clear_head(&mut self) {
    self.head.clear();
    self.column_cursor = 0;
  }

  #[cfg(test)]
  pub fn head(&self) -> &[HeaderCell] {
    &self.head
  }

  pub fn rows(&self) -> &[RowView] {
    &self.rows
  }

  #[cfg(test)]
  pub fn is_hidden(&self) -> bool {
    self.hidden
  }

  // Keyboard

  #[cfg(test)]
  pub fn column_cursor(&self) -> usize {
    self.column_cursor
  }

  pub fn move_column(&mut self, delta: isize) {
    if self.head.is_empty() {
      return;
    }
    let last = self.head.len() - 1;
    self.column_cursor = self.column_cursor.saturating_add_signed(delta).min(last);
  }

  pub fn select_next(&mut self) {
    self.list_state.select_next();
    ensure_valid_selection(&mut self.list_state, self.rows.len());
  }

  pub fn select_previous(&mut self) {
    self.list_state.select_previous();
    ensure_valid_selection(&mut self.list_state, self.rows.len());
  }

  #[cfg(test)]
  pub fn selected_row(&self) -> Option<usize> {
    self.list_state.selected()
  }

  pub fn sort_selected_column(&self) -> Option<TableAction> {
    (self.column_cursor < self.head.len()).then_some(TableAction::Sort(self.column_cursor))
  }

  pub fn delete_selected_row(&self) -> Option<TableAction> {
    let row = self.rows.get(self.list_state.selected()?)?;
    Some(TableAction::RemoveRow(row.id))
  }

  // Mouse

  /// Locate a screen cell within the last drawn table.
  pub fn hit_test(&self, column: u16, row: u16) -> Option<HitTarget> {
    let g = self.geometry?;
    if self.hidden || column < g.x {
      return None;
    }

    if row == g.header_y {
      let index = usize::from((column - g.x) / g.column_width);
      return (index < self.head.len() && column < g.delete_x).then_some(HitTarget::Header(index));
    }

    if row < g.body_y || row >= g.body_y + g.body_height {
      return None;
    }
    let index = usize::from(row - g.body_y) + g.offset;
    if index >= self.rows.len() {
      return None;
    }

    if column >= g.delete_x {
      return (column < g.delete_x + DELETE_WIDTH).then_some(HitTarget::Delete(index));
    }
    match (column - g.x) / g.column_width {
      0 => Some(HitTarget::Handle(index)),
      _ => Some(HitTarget::Cell(index)),
    }
  }

  /// Action for a click. Clicks on the handle or a plain cell select the row.
  pub fn click(&mut self, target: HitTarget) -> Option<TableAction> {
    match target {
      HitTarget::Header(index) => {
        self.column_cursor = index;
        Some(TableAction::Sort(index))
      }
      HitTarget::Delete(index) => self.rows.get(index).map(|row| TableAction::RemoveRow(row.id)),
      HitTarget::Handle(index) | HitTarget::Cell(index) => {
        self.list_state.select(Some(index));
        None
      }
    }
  }

  // Drawing

  pub fn draw(&mut self, frame: &mut Frame, area: Rect, title: &str, drag: Option<&DragSession>) {
    let block = Block::default()
      .title(title.to_string())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height < 2 || inner.width == 0 {
      self.geometry = None;
      return;
    }

    let columns = self.head.len().max(1) as u16;
    let column_width = (inner.width.saturating_sub(DELETE_WIDTH) / columns).max(MIN_COLUMN_WIDTH);
    let header_area = Rect {
      height: 1,
      ..inner
    };
    let body_area = Rect {
      y: inner.y + 1,
      height: inner.height - 1,
      ..inner
    };

    frame.render_widget(Paragraph::new(self.header_line(column_width)), header_area);

    match drag {
      Some(session) if self.hidden => self.draw_clones(frame, body_area, column_width, session),
      _ => {
        let items: Vec<ListItem> = self
          .rows
          .iter()
          .map(|row| ListItem::new(row_line(row, column_width, Style::default())))
          .collect();
        let list = List::new(items).highlight_style(
          Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
        );
        frame.render_stateful_widget(list, body_area, &mut self.list_state);
      }
    }

    self.geometry = Some(Geometry {
      x: inner.x,
      header_y: inner.y,
      body_y: body_area.y,
      body_height: body_area.height,
      column_width,
      delete_x: inner.x.saturating_add(column_width.saturating_mul(columns)),
      offset: self.list_state.offset(),
    });
  }

  fn header_line(&self, width: u16) -> Line<'static> {
    let spans: Vec<Span> = self
      .head
      .iter()
      .enumerate()
      .map(|(i, cell)| {
        let prefix = if i == 0 { HANDLE_GAP } else { "" };
        let arrow = cell.arrow();
        let room = usize::from(width).saturating_sub(prefix.chars().count() + arrow.chars().count() + 1);
        let text = format!("{}{}{}", prefix, truncate(&cell.label, room), arrow);

        let mut style = Style::default().fg(Color::White).bold();
        if cell.active {
          style = style.fg(Color::Cyan);
        }
        if i == self.column_cursor {
          style = style.add_modifier(Modifier::UNDERLINED);
        }
        Span::styled(fit(&text, usize::from(width)), style)
      })
      .collect();

    Line::from(spans)
  }

  /// Draw the clone list of a drag: the rows in slot order, a placeholder in
  /// the dragged slot and the dragged row floating at the pointer.
  fn draw_clones(&self, frame: &mut Frame, area: Rect, width: u16, session: &DragSession) {
    let offset = self.list_state.offset() as f64;
    let line_at = |top: f64| -> Option<Rect> {
      let y = (top - offset).round();
      (y >= 0.0 && y < f64::from(area.height)).then(|| Rect {
        y: area.y + y as u16,
        height: 1,
        ..area
      })
    };

    for slot in session.slots() {
      let Some(line_area) = line_at(slot.top) else {
        continue;
      };
      let line = match slot.kind {
        SlotKind::Row(index) => match self.rows.get(index) {
          Some(row) => row_line(row, width, Style::default()),
          None => continue,
        },
        SlotKind::Placeholder => Line::from(Span::styled(
          "┄".repeat(usize::from(area.width)),
          Style::default().fg(Color::DarkGray),
        )),
      };
      frame.render_widget(Paragraph::new(line), line_area);
    }

    let floating = self.rows.get(session.dragged());
    if let (Some(row), Some(line_area)) = (floating, line_at(session.dragged_top())) {
      // Follows the pointer sideways too, but never left of the table
      let max_shift = f64::from(area.width.saturating_sub(1));
      let shift = session.dragged_left().round().clamp(0.0, max_shift) as u16;
      let line_area = Rect {
        x: line_area.x + shift,
        width: line_area.width - shift,
        ..line_area
      };
      let style = Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
      frame.render_widget(Paragraph::new(row_line(row, width, style)), line_area);
    }
  }
}

fn row_line(row: &RowView, width: u16, style: Style) -> Line<'static> {
  let width = usize::from(width);
  let mut spans: Vec<Span> = row
    .cells
    .iter()
    .enumerate()
    .map(|(i, cell)| {
      let text = if i == 0 {
        format!("{}{}", HANDLE, truncate(cell, width.saturating_sub(3)))
      } else {
        truncate(cell, width.saturating_sub(1))
      };
      Span::styled(fit(&text, width), style)
    })
    .collect();
  spans.push(Span::styled(DELETE_LABEL, style.fg(Color::Red)));
  Line::from(spans)
}

/// Keep the selection inside `len` rows, selecting the first row of a
/// non-empty list when nothing is selected.
fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    Some(_) => {}
  }
}

impl DragSurface for TableView {
  fn row_heights(&self) -> Vec<f64> {
    vec![1.0; self.rows.len()]
  }

  fn set_hidden(&mut self, hidden: bool) {
    self.hidden = hidden;
  }

  fn move_row(&mut self, from: usize, to: usize) {
    if from >= self.rows.len() || to >= self.rows.len() {
      return;
    }
    let row = self.rows.remove(from);
    self.rows.insert(to, row);
    self.list_state.select(Some(to));
  }

  fn row_ids(&self) -> Vec<RowId> {
    self.rows.iter().map(|row| row.id).collect()
  }

  fn generation(&self) -> u64 {
    self.generation
  }
}

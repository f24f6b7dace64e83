pub mod actions;
pub mod drag;
pub mod loader;
pub mod pagination;
pub mod renderfns;
pub mod table;
pub mod visibility;

use crate::app::App;
use crate::bus::{Channel, EventBus, Payload};
use chrono::Utc;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use std::cell::RefCell;
use std::rc::Rc;

use self::renderfns::{draw_footer, draw_header, utils::format_age};
use self::visibility::Region;

/// Subscribe a component method to a channel. The handler is skipped once the
/// component is dropped.
pub(crate) fn bind<T, F>(bus: &EventBus, channel: Channel, target: &Rc<RefCell<T>>, handler: F)
where
  T: 'static,
  F: Fn(&mut T, &Payload) + 'static,
{
  let target = Rc::downgrade(target);
  bus.subscribe(channel, move |payload| {
    if let Some(target) = target.upgrade() {
      handler(&mut target.borrow_mut(), payload);
    }
  });
}

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(3),    // Table or placeholder
      Constraint::Length(1), // Pagination and status
    ])
    .split(frame.area());

  draw_header(frame, chunks[0], app.title(), app.api_url(), &app.shortcuts());
  draw_body(frame, chunks[1], app);

  let pagination = app.pagination().borrow();
  draw_footer(
    frame,
    chunks[2],
    pagination.has_previous(),
    pagination.has_next(),
    status(app),
  );
}

fn draw_body(frame: &mut Frame, area: Rect, app: &App) {
  let visibility = app.visibility().borrow();

  if visibility.is_shown(Region::Table) {
    let title = match app.cached_at() {
      Some(at) => format!(
        " {} ({}) · cached {} ",
        app.title(),
        app.table().borrow().rows().len(),
        format_age(Utc::now() - at)
      ),
      None => format!(" {} ", app.title()),
    };
    app
      .table()
      .borrow_mut()
      .draw(frame, area, &title, app.drag().session());
    return;
  }

  let block = Block::default()
    .title(format!(" {} ", app.title()))
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let mut lines = Vec::new();
  if visibility.is_shown(Region::ErrorBanner) {
    lines.push(Line::styled(
      "Failed to load data.",
      Style::default().fg(Color::Red).bold(),
    ));
  }
  if visibility.is_shown(Region::Placeholder) {
    lines.push(Line::styled(
      "No data cached.",
      Style::default().fg(Color::DarkGray),
    ));
  }
  if visibility.is_shown(Region::FetchControl) {
    lines.push(Line::styled(
      "Press 'f' to fetch a page.",
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(lines)
    .block(block)
    .wrap(Wrap { trim: true });
  frame.render_widget(paragraph, area);
}

fn status(app: &App) -> Option<Span<'static>> {
  if let Some(spinner) = app.loader().borrow().spinner() {
    return Some(Span::styled(
      format!("{} loading", spinner),
      Style::default().fg(Color::Yellow),
    ));
  }
  if !app.drag().is_idle() {
    return Some(Span::styled(
      "dragging",
      Style::default().fg(Color::Cyan),
    ));
  }
  None
}

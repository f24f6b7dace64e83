use crate::api::client::{remote_source, FetchQueue, Transport};
use crate::bus::EventBus;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::store::storage::Storage;
use crate::store::RecordStore;
use crate::ui;
use crate::ui::actions::Trigger;
use crate::ui::drag::{DragReorderController, Point};
use crate::ui::loader::Loader;
use crate::ui::pagination::PaginationView;
use crate::ui::renderfns::Shortcut;
use crate::ui::table::{HitTarget, TableAction, TableView};
use crate::ui::visibility::{Region, VisibilityController};
use chrono::{DateTime, Utc};
use color_eyre::Result;
use crossterm::event::{
  DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyModifiers, MouseButton,
  MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::cell::RefCell;
use std::io::{stdout, Stdout};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Main application state
pub struct App {
  /// Application configuration
  config: Config,

  bus: EventBus,
  store: Rc<RecordStore>,

  /// Fetch outcomes waiting to be published
  fetches: FetchQueue,

  table: Rc<RefCell<TableView>>,
  visibility: Rc<RefCell<VisibilityController>>,
  pagination: Rc<RefCell<PaginationView>>,
  loader: Rc<RefCell<Loader>>,
  drag: DragReorderController,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  /// Wire the store and UI components to a fresh bus and replay the cached
  /// state so the first frame shows it.
  pub fn new(config: Config, storage: Storage, transport: Arc<dyn Transport>) -> Self {
    let bus = EventBus::new();
    let (remote, fetches) = remote_source(transport, bus.clone());

    let store = RecordStore::new(bus.clone(), storage, remote, &config.api_url);
    store.init();

    let visibility = VisibilityController::attach(&bus);
    let table = TableView::attach(&bus, config.max_columns);
    store.check_data();
    store.check_sort_data();

    let loader = Loader::attach(&bus);
    let pagination = PaginationView::attach(&bus);
    store.announce_pagination();

    info!(url = %store.url(), "Started");

    Self {
      config,
      bus,
      store,
      fetches,
      table,
      visibility,
      pagination,
      loader,
      drag: DragReorderController::new(),
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Cleanup terminal
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(100));

    while !self.should_quit {
      // Draw UI
      terminal.draw(|frame| ui::draw(frame, self))?;

      // Handle events
      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Mouse(mouse) => self.handle_mouse(mouse),
      Event::Resize => {}
      Event::Tick => self.loader.borrow_mut().tick(),
    }
    self.publish_fetches();
  }

  /// Publish fetch outcomes that arrived since the last event
  fn publish_fetches(&mut self) {
    let delivered = self.fetches.poll();
    if delivered > 0 {
      debug!(delivered, "Published fetch outcomes");
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // Keys wait until a drag is released
    if !self.drag.is_idle() {
      return;
    }

    if let Some(trigger) = Trigger::from_key(key) {
      let enabled = trigger.enabled(&self.visibility.borrow(), &self.pagination.borrow());
      if enabled {
        trigger.fire(&self.bus);
      } else {
        debug!(trigger = trigger.label(), "Control is disabled");
      }
      return;
    }

    match key.code {
      KeyCode::Char('q') | KeyCode::Esc => {
        self.should_quit = true;
        return;
      }
      _ if !self.visibility.borrow().is_shown(Region::Table) => return,
      _ => {}
    }

    let action = {
      let mut table = self.table.borrow_mut();
      match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
          table.select_next();
          None
        }
        KeyCode::Char('k') | KeyCode::Up => {
          table.select_previous();
          None
        }
        KeyCode::Char('h') | KeyCode::Left => {
          table.move_column(-1);
          None
        }
        KeyCode::Char('l') | KeyCode::Right => {
          table.move_column(1);
          None
        }
        KeyCode::Char('s') | KeyCode::Enter => table.sort_selected_column(),
        KeyCode::Char('d') | KeyCode::Delete => table.delete_selected_row(),
        _ => None,
      }
    };

    if let Some(action) = action {
      self.dispatch(action);
    }
  }

  fn handle_mouse(&mut self, mouse: MouseEvent) {
    let point = Point::new(f64::from(mouse.column), f64::from(mouse.row));

    match mouse.kind {
      MouseEventKind::Down(MouseButton::Left) => {
        if !self.visibility.borrow().is_shown(Region::Table) {
          return;
        }
        let target = self.table.borrow().hit_test(mouse.column, mouse.row);
        let Some(target) = target else {
          return;
        };

        if let HitTarget::Handle(row) = target {
          self.drag.pointer_down(row, point);
        }
        let action = self.table.borrow_mut().click(target);
        if let Some(action) = action {
          self.dispatch(action);
        }
      }
      MouseEventKind::Drag(MouseButton::Left) => {
        self.drag.pointer_move(&mut *self.table.borrow_mut(), point);
      }
      MouseEventKind::Up(MouseButton::Left) => {
        let order = self.drag.pointer_up(&mut *self.table.borrow_mut());
        if let Some(ids) = order {
          self.dispatch(TableAction::Reorder(ids));
        }
      }
      _ => {}
    }
  }

  /// Hand a table action to the store. No component may be borrowed here:
  /// the store answers on the bus.
  fn dispatch(&self, action: TableAction) {
    debug!(?action, "Table action");
    match action {
      TableAction::Sort(index) => self.store.sort_data(index, None),
      TableAction::RemoveRow(id) => self.store.remove_row(id),
      TableAction::Reorder(ids) => self.store.set_custom_sort(&ids),
    }
  }

  // Accessors for drawing

  pub fn title(&self) -> &str {
    self.config.title()
  }

  pub fn api_url(&self) -> &str {
    &self.config.api_url
  }

  pub fn cached_at(&self) -> Option<DateTime<Utc>> {
    self.store.cached_at()
  }

  pub fn table(&self) -> &RefCell<TableView> {
    &self.table
  }

  pub fn visibility(&self) -> &RefCell<VisibilityController> {
    &self.visibility
  }

  pub fn pagination(&self) -> &RefCell<PaginationView> {
    &self.pagination
  }

  pub fn loader(&self) -> &RefCell<Loader> {
    &self.loader
  }

  pub fn drag(&self) -> &DragReorderController {
    &self.drag
  }

  /// Header hints; disabled controls are dimmed
  pub fn shortcuts(&self) -> Vec<Shortcut> {
    let visibility = self.visibility.borrow();
    let pagination = self.pagination.borrow();

    let mut shortcuts: Vec<Shortcut> = Trigger::ALL
      .into_iter()
      .map(|trigger| Shortcut {
        key: trigger.key(),
        label: trigger.label(),
        enabled: trigger.enabled(&visibility, &pagination),
      })
      .collect();

    let table_shown = visibility.is_shown(Region::Table);
    shortcuts.push(Shortcut {
      key: 's',
      label: "sort",
      enabled: table_shown,
    });
    shortcuts.push(Shortcut {
      key: 'd',
      label: "delete",
      enabled: table_shown,
    });
    shortcuts.push(Shortcut {
      key: 'q',
      label: "quit",
      enabled: true,
    });
    shortcuts
  }
}

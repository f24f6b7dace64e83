//! Row reordering by pointer drag.
//!
//! The controller is a small state machine:
//!
//! ```text
//! Idle --down on handle--> Armed --first move--> Dragging --up--> Settling --> Idle
//!                            |                      ^  |
//!                            +--up (no move)--> Idle   +--move (slot swaps)
//! ```
//!
//! While dragging, the rows are represented by a clone list: the dragged
//! clone floats at its pointer-translated position and a placeholder of the
//! same height keeps its slot in the flow. The original rows stay hidden
//! until the drop, when the dragged row is moved to the final slot and the
//! resulting id order is returned. Rows replaced during the drag invalidate
//! it: the release then only restores the rows.

use tracing::debug;

use crate::store::record::RowId;

/// Something whose rows can be reordered by dragging.
pub trait DragSurface {
  /// Heights of the rows, top to bottom
  fn row_heights(&self) -> Vec<f64>;

  /// Hide or restore the original rows while the clone list is shown
  fn set_hidden(&mut self, hidden: bool);

  /// Move the row at `from` so it ends up at index `to`
  fn move_row(&mut self, from: usize, to: usize);

  /// Row ids, top to bottom
  fn row_ids(&self) -> Vec<RowId>;

  /// Changes whenever the rows are replaced
  fn generation(&self) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  pub fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }
}

/// Slot change caused by one pointer move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swap {
  Up,
  Down,
}

/// What occupies a slot of the clone list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
  /// Clone of the original row at this index
  Row(usize),
  /// Space held for the dragged row
  Placeholder,
}

/// A positioned entry of the clone list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloneSlot {
  pub kind: SlotKind,
  pub top: f64,
  pub height: f64,
}

/// Clone list of an ongoing drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
  /// Original index of the dragged row
  origin: usize,
  heights: Vec<f64>,
  /// Clone order as original row indices; the dragged clone is at `position`
  order: Vec<usize>,
  position: usize,
  /// Top and left offset of the floating clone
  top: f64,
  left: f64,
  pointer: Point,
  /// Surface generation the clone list was built from
  generation: u64,
}

impl DragSession {
  fn start(origin: usize, heights: Vec<f64>, pointer: Point, generation: u64) -> Self {
    let order: Vec<usize> = (0..heights.len()).collect();
    let mut session = Self {
      origin,
      heights,
      order,
      position: origin,
      top: 0.0,
      left: 0.0,
      pointer,
      generation,
    };
    session.top = session.flow_top(origin);
    session
  }

  /// Top of the slot at `position` in the flow. The placeholder holds the
  /// dragged clone's slot, with the same height.
  fn flow_top(&self, position: usize) -> f64 {
    self.order[..position].iter().map(|&i| self.heights[i]).sum()
  }

  fn center_of(&self, position: usize) -> f64 {
    self.flow_top(position) + self.heights[self.order[position]] / 2.0
  }

  fn dragged_center(&self) -> f64 {
    self.top + self.heights[self.origin] / 2.0
  }

  /// Translate the dragged clone and swap at most one neighbour.
  fn track(&mut self, pointer: Point) -> Option<Swap> {
    self.top += pointer.y - self.pointer.y;
    self.left += pointer.x - self.pointer.x;
    self.pointer = pointer;

    let position = self.position;
    if position > 0 && self.dragged_center() < self.center_of(position - 1) {
      self.order.swap(position - 1, position);
      self.position -= 1;
      return Some(Swap::Up);
    }

    if position + 1 < self.order.len() && self.center_of(position + 1) < self.dragged_center() {
      self.order.swap(position, position + 1);
      self.position += 1;
      return Some(Swap::Down);
    }

    None
  }

  /// Original index of the dragged row
  pub fn dragged(&self) -> usize {
    self.origin
  }

  /// Slot the dragged row would drop into
  pub fn slot(&self) -> usize {
    self.position
  }

  pub fn dragged_top(&self) -> f64 {
    self.top
  }

  pub fn dragged_left(&self) -> f64 {
    self.left
  }

  /// Flow layout of the clone list, the placeholder in the dragged slot
  pub fn slots(&self) -> Vec<CloneSlot> {
    let mut top = 0.0;
    self
      .order
      .iter()
      .map(|&row| {
        let height = self.heights[row];
        let kind = if row == self.origin {
          SlotKind::Placeholder
        } else {
          SlotKind::Row(row)
        };
        let slot = CloneSlot { kind, top, height };
        top += height;
        slot
      })
      .collect()
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
  #[default]
  Idle,
  Armed {
    origin: usize,
    pointer: Point,
  },
  Dragging(DragSession),
  Settling {
    origin: usize,
    slot: usize,
    generation: u64,
  },
}

#[derive(Debug, Default)]
pub struct DragReorderController {
  state: DragState,
}

impl DragReorderController {
  pub fn new() -> Self {
    Self::default()
  }

  #[cfg(test)]
  pub fn state(&self) -> &DragState {
    &self.state
  }

  pub fn is_idle(&self) -> bool {
    matches!(self.state, DragState::Idle)
  }

  pub fn session(&self) -> Option<&DragSession> {
    match &self.state {
      DragState::Dragging(session) => Some(session),
      _ => None,
    }
  }

  /// Pointer pressed on the drag handle of row `origin`.
  pub fn pointer_down(&mut self, origin: usize, pointer: Point) {
    if self.is_idle() {
      self.state = DragState::Armed { origin, pointer };
    }
  }

  /// Pointer moved. The first move after arming builds the clone list.
  pub fn pointer_move<S>(&mut self, surface: &mut S, pointer: Point) -> Option<Swap>
  where
    S: DragSurface + ?Sized,
  {
    match std::mem::take(&mut self.state) {
      DragState::Armed {
        origin,
        pointer: start,
      } => {
        let heights = surface.row_heights();
        if origin >= heights.len() {
          return None;
        }
        surface.set_hidden(true);
        let mut session = DragSession::start(origin, heights, start, surface.generation());
        let swap = session.track(pointer);
        self.state = DragState::Dragging(session);
        swap
      }
      DragState::Dragging(mut session) => {
        let swap = session.track(pointer);
        self.state = DragState::Dragging(session);
        swap
      }
      other => {
        self.state = other;
        None
      }
    }
  }

  /// Pointer released. A drag commits at the current slot and returns the
  /// new row id order, unless the rows were replaced since it started.
  /// Releasing an armed handle does nothing.
  pub fn pointer_up<S>(&mut self, surface: &mut S) -> Option<Vec<RowId>>
  where
    S: DragSurface + ?Sized,
  {
    match std::mem::take(&mut self.state) {
      DragState::Dragging(session) => {
        self.state = DragState::Settling {
          origin: session.dragged(),
          slot: session.slot(),
          generation: session.generation,
        };
        self.settle(surface)
      }
      _ => None,
    }
  }

  fn settle<S>(&mut self, surface: &mut S) -> Option<Vec<RowId>>
  where
    S: DragSurface + ?Sized,
  {
    let DragState::Settling {
      origin,
      slot,
      generation,
    } = std::mem::take(&mut self.state)
    else {
      return None;
    };

    surface.set_hidden(false);
    if surface.generation() != generation {
      debug!(origin, slot, "Rows replaced during drag, nothing to commit");
      return None;
    }
    surface.move_row(origin, slot);
    Some(surface.row_ids())
  }
}

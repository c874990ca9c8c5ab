use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// Key hint listed in the header.
///
/// Hints are sorted by `order`. Overlay hints replace the normal set while
/// a prompt or confirmation is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
  pub key: &'static str,
  pub label: &'static str,
  pub overlay: bool,
  pub order: u8,
}

impl Shortcut {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      overlay: false,
      order: 100,
    }
  }

  pub const fn order(mut self, order: u8) -> Self {
    self.order = order;
    self
  }

  pub const fn in_overlay(mut self) -> Self {
    self.overlay = true;
    self
  }
}

/// What the app should do with the view stack after a key press
pub enum ViewAction {
  None,
  /// Open a view on top of this one
  Push(Box<dyn View>),
  /// Close this view
  Pop,
}

/// A screen in the view stack.
///
/// Data is loaded through `Query<T>` handles polled from `tick()`, and
/// writes through `Mutation<T>` handles polled the same way. Prompts and
/// confirmations are owned by the view.
pub trait View {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Label shown in the footer breadcrumb
  fn breadcrumb_label(&self) -> String;

  /// Tenant shown in the header, if this view is tenant-scoped
  fn tenant(&self) -> Option<&str> {
    None
  }

  /// True while a prompt or confirmation owns the keyboard, so `:` is
  /// typed rather than opening the command line.
  fn is_capturing_input(&self) -> bool {
    false
  }

  /// Checked after each tick; a view returning true is popped.
  fn wants_close(&self) -> bool {
    false
  }

  fn tick(&mut self) {}

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").order(10),
      Shortcut::new("q", "back").order(90),
    ]
  }
}

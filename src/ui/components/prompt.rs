use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by a prompt that the parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
  Submitted(String),
  Cancelled,
}

/// One-line input overlay used for titles, paths and tenant names
#[derive(Debug, Clone, Default)]
pub struct Prompt {
  input: TextInput,
  title: String,
  active: bool,
}

impl Prompt {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn value(&self) -> &str {
    self.input.value()
  }

  /// Open the prompt with `title`, pre-filled with `initial`.
  pub fn open(&mut self, title: &str, initial: &str) {
    self.title = title.to_string();
    self.input = TextInput::with_value(initial);
    self.active = true;
  }

  pub fn set_title(&mut self, title: &str) {
    self.title = title.to_string();
  }

  pub fn close(&mut self) {
    self.active = false;
    self.input.clear();
  }

  /// Handle a key while open. Returns `NotHandled` when closed.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PromptEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(value) => {
        self.close();
        KeyResult::Event(PromptEvent::Submitted(value))
      }
      InputResult::Cancelled => {
        self.close();
        KeyResult::Event(PromptEvent::Cancelled)
      }
      InputResult::Consumed | InputResult::NotHandled => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 70 / 100).clamp(30, 80).min(area.width);
    let height = 3.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let (before, after) = self.input.split_at_cursor();
    let line = Line::from(vec![
      Span::raw(before),
      Span::styled("_", Style::default().fg(Color::Yellow)),
      Span::raw(after),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::{KeyCode, KeyModifiers};

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_closed_prompt_ignores_keys() {
    let mut prompt = Prompt::new();
    assert_eq!(prompt.handle_key(key(KeyCode::Char('a'))), KeyResult::NotHandled);
  }

  #[test]
  fn test_prefilled_submit() {
    let mut prompt = Prompt::new();
    prompt.open("Tenant", "dev");
    prompt.handle_key(key(KeyCode::Char('2')));

    assert_eq!(
      prompt.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(PromptEvent::Submitted("dev2".to_string()))
    );
    assert!(!prompt.is_active());
  }

  #[test]
  fn test_cancel_closes() {
    let mut prompt = Prompt::new();
    prompt.open("Path", "");
    assert_eq!(
      prompt.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(PromptEvent::Cancelled)
    );
    assert!(!prompt.is_active());
  }
}

use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// Answer to a yes/no question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmEvent {
  Yes,
  No,
}

/// Centered y/n overlay
#[derive(Debug, Clone, Default)]
pub struct Confirm {
  message: String,
  active: bool,
}

impl Confirm {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn ask(&mut self, message: String) {
    self.message = message;
    self.active = true;
  }

  /// `y` confirms, `n`/Esc/`q` declines; anything else is swallowed.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<ConfirmEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Char('y') | KeyCode::Char('Y') => {
        self.active = false;
        KeyResult::Event(ConfirmEvent::Yes)
      }
      KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Char('q') => {
        self.active = false;
        KeyResult::Event(ConfirmEvent::No)
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (self.message.chars().count() as u16 + 4)
      .clamp(30, 70)
      .min(area.width);
    let height = 4.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red))
      .title(" Confirm ");

    let text = vec![
      Line::from(self.message.as_str()),
      Line::from(vec![
        Span::styled("<y>", Style::default().fg(Color::Cyan)),
        Span::styled(" yes   ", Style::default().fg(Color::DarkGray)),
        Span::styled("<n>", Style::default().fg(Color::Cyan)),
        Span::styled(" no", Style::default().fg(Color::DarkGray)),
      ]),
    ];
    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, overlay_area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_yes_and_no() {
    let mut confirm = Confirm::new();
    confirm.ask("Delete incident 7?".to_string());
    assert_eq!(confirm.handle_key(key(KeyCode::Char('x'))), KeyResult::Handled);
    assert!(confirm.is_active());
    assert_eq!(
      confirm.handle_key(key(KeyCode::Char('y'))),
      KeyResult::Event(ConfirmEvent::Yes)
    );
    assert!(!confirm.is_active());

    confirm.ask("Delete incident 8?".to_string());
    assert_eq!(
      confirm.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(ConfirmEvent::No)
    );
  }

  #[test]
  fn test_inactive_passes_through() {
    let mut confirm = Confirm::new();
    assert_eq!(confirm.handle_key(key(KeyCode::Char('y'))), KeyResult::NotHandled);
  }
}

use crate::api::types::{IncidentStatus, Priority};
use crate::api::ApiError;
use ratatui::prelude::*;

/// Truncate to at most `max_len` characters, ending in "..." if cut
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

pub fn status_color(status: IncidentStatus) -> Color {
  match status {
    IncidentStatus::Open => Color::Red,
    IncidentStatus::InProgress => Color::Yellow,
    IncidentStatus::Closed => Color::Green,
  }
}

pub fn priority_color(priority: Priority) -> Color {
  match priority {
    Priority::P1 => Color::LightRed,
    Priority::P2 => Color::LightYellow,
    Priority::P3 => Color::White,
  }
}

/// Error as display lines: the message, then one line per field error.
pub fn error_text(err: &ApiError) -> Vec<Line<'static>> {
  let mut lines = vec![Line::styled(
    err.message.clone(),
    Style::default().fg(Color::Red).bold(),
  )];
  lines.extend(
    err
      .error_lines()
      .into_iter()
      .map(|l| Line::styled(format!("  {}", l), Style::default().fg(Color::Red))),
  );
  lines
}

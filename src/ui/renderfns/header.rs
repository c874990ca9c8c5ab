use crate::ui::view::Shortcut;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar: logo, backend host, tenant and the current view's
/// shortcuts. While an overlay owns the keyboard (`overlay_open`) only the
/// overlay's shortcuts are listed.
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  base_url: &str,
  tenant: &str,
  shortcuts: &[Shortcut],
  overlay_open: bool,
) {
  let mut spans = vec![
    Span::styled(" inc9s ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", extract_host(base_url)),
      Style::default().fg(Color::White),
    ),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", tenant),
      Style::default().fg(Color::Yellow).bold(),
    ),
    Span::raw("  "),
  ];

  for shortcut in visible_shortcuts(shortcuts, overlay_open) {
    // Keys and brackets highlighted, descriptions dimmed
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}   ", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

/// Hints for the current mode, in display order.
fn visible_shortcuts(shortcuts: &[Shortcut], overlay_open: bool) -> Vec<&Shortcut> {
  let mut visible: Vec<&Shortcut> = shortcuts
    .iter()
    .filter(|s| s.overlay == overlay_open)
    .collect();
  visible.sort_by_key(|s| s.order);
  visible
}

/// Host (and port) part of the backend URL
fn extract_host(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_host() {
    assert_eq!(extract_host("https://ops.example.com"), "ops.example.com");
    assert_eq!(extract_host("https://ops.example.com/api/"), "ops.example.com");
    assert_eq!(extract_host("http://localhost:5084"), "localhost:5084");
  }

  #[test]
  fn test_overlay_hints_replace_normal_ones() {
    let shortcuts = [
      Shortcut::new("r", "refresh").order(50),
      Shortcut::new(":", "command").order(10),
      Shortcut::new("Esc", "cancel").in_overlay(),
    ];

    let normal: Vec<_> = visible_shortcuts(&shortcuts, false).iter().map(|s| s.key).collect();
    assert_eq!(normal, [":", "r"]);

    let overlay: Vec<_> = visible_shortcuts(&shortcuts, true).iter().map(|s| s.key).collect();
    assert_eq!(overlay, ["Esc"]);
  }
}

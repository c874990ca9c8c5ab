use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::api::status::status_key;
use crate::api::types::ServiceStatus;
use crate::app::AppContext;
use crate::query::{Query, QueryState};
use crate::ui::renderfns::error_text;
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Backend health check with optional auto-refresh
pub struct StatusView {
  base_url: String,
  query: Query<ServiceStatus>,
  interval: Duration,
  auto_refresh: bool,
  next_check: Option<Instant>,
  last_checked: Option<DateTime<Local>>,
}

impl StatusView {
  pub fn new(ctx: AppContext) -> Self {
    let client = ctx.status.clone();
    let mut query = Query::new(ctx.cache.clone(), status_key(), move || {
      let client = client.clone();
      async move { client.get().await }
    });
    query.fetch();

    Self {
      base_url: ctx.config.api.base_url.clone(),
      query,
      interval: Duration::from_secs(ctx.config.status.auto_refresh_secs.max(1)),
      auto_refresh: false,
      next_check: None,
      last_checked: None,
    }
  }

  fn check(&mut self) {
    self.query.refetch();
    if self.auto_refresh {
      self.next_check = Some(Instant::now() + self.interval);
    }
  }

  fn toggle_auto_refresh(&mut self) {
    self.auto_refresh = !self.auto_refresh;
    self.next_check = if self.auto_refresh {
      Some(Instant::now() + self.interval)
    } else {
      None
    };
  }

  fn lines(&self) -> Vec<Line<'static>> {
    let label = |s: &'static str| Span::styled(format!("{:<14}", s), Style::default().fg(Color::DarkGray));

    let mut lines = vec![Line::from(vec![label("Backend"), Span::raw(self.base_url.clone())])];

    match self.query.state() {
      QueryState::Success(status) => {
        let local = status.server_time_utc.with_timezone(&Local);
        lines.extend([
          Line::from(vec![
            label("Service"),
            Span::styled(status.service_name.clone(), Style::default().fg(Color::Green)),
          ]),
          Line::from(vec![label("Version"), Span::raw(status.version.clone())]),
          Line::from(vec![
            label("Server time"),
            Span::raw(format!(
              "{} (local {})",
              status.server_time_utc.format("%Y-%m-%d %H:%M:%S UTC"),
              local.format("%H:%M:%S")
            )),
          ]),
        ]);
      }
      QueryState::Error(err) => {
        lines.push(Line::from(vec![
          label("Service"),
          Span::styled("unreachable", Style::default().fg(Color::Red)),
        ]));
        lines.extend(error_text(err));
      }
      QueryState::Loading | QueryState::Idle => {
        lines.push(Line::styled("Checking...", Style::default().fg(Color::Yellow)));
      }
    }

    lines.push(Line::from(""));
    let checked = self
      .last_checked
      .map(|t| t.format("%H:%M:%S").to_string())
      .unwrap_or_else(|| "never".to_string());
    lines.push(Line::from(vec![label("Last checked"), Span::raw(checked)]));
    let auto = if self.auto_refresh {
      format!("on (every {}s)", self.interval.as_secs())
    } else {
      "off".to_string()
    };
    lines.push(Line::from(vec![label("Auto-refresh"), Span::raw(auto)]));

    lines
  }
}

impl View for StatusView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => self.check(),
      KeyCode::Char('a') => self.toggle_auto_refresh(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let busy = if self.query.is_fetching() { " ⟳" } else { "" };
    let block = Block::default()
      .title(format!(" Status{} ", busy))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let paragraph = Paragraph::new(self.lines())
      .block(block)
      .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Status".to_string()
  }

  fn tick(&mut self) {
    let was_fetching = self.query.is_fetching();
    self.query.poll();
    if was_fetching && !self.query.is_fetching() {
      self.last_checked = Some(Local::now());
    }

    if let Some(due) = self.next_check {
      if Instant::now() >= due && !self.query.is_fetching() {
        self.check();
      }
    }
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").order(10),
      Shortcut::new("r", "check").order(20),
      Shortcut::new("a", "auto-refresh").order(30),
    ]
  }
}

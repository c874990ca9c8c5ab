use crate::api::types::Incident;
use crate::api::ApiError;
use crate::app::AppContext;
use crate::incidents::{Draft, IncidentDetailController};
use crate::query::{Mutation, MutationState, Query};
use crate::ui::components::{Confirm, ConfirmEvent, KeyResult, Prompt, PromptEvent};
use crate::ui::renderfns::{error_text, priority_color, status_color};
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Edit form for one incident
pub struct IncidentDetailView {
  controller: IncidentDetailController,
  query: Query<Incident>,
  title_prompt: Prompt,
  confirm: Confirm,
  save: Mutation<Incident>,
  delete: Mutation<()>,
  closed: bool,
}

impl IncidentDetailView {
  /// Fails on an invalid id, before anything is fetched.
  pub fn open(raw_id: &str, ctx: AppContext) -> Result<Self, ApiError> {
    let controller = IncidentDetailController::open(raw_id, ctx.incidents, ctx.cache.clone())?;
    let mut query = Query::new(ctx.cache, controller.key(), controller.fetcher());
    query.fetch();

    Ok(Self {
      controller,
      query,
      title_prompt: Prompt::new(),
      confirm: Confirm::new(),
      save: Mutation::new(),
      delete: Mutation::new(),
      closed: false,
    })
  }

  fn submit_save(&mut self) {
    match self.controller.submit_save() {
      Ok(request) => {
        self.save.start(request);
      }
      Err(err) => self.save.reject(err),
    }
  }

  fn poll_mutations(&mut self) {
    if let Some(MutationState::Success(_)) = self.save.poll() {
      self.controller.saved();
    }
    if let Some(MutationState::Success(())) = self.delete.poll() {
      self.closed = true;
    }
  }

  fn field<'a>(label: &'a str, value: Span<'a>) -> Line<'a> {
    Line::from(vec![
      Span::styled(format!("{:<10}", label), Style::default().fg(Color::DarkGray)),
      value,
    ])
  }

  fn render_form(&self, draft: &Draft, incident: &Incident) -> Vec<Line<'static>> {
    let updated = incident
      .updated_utc
      .with_timezone(&chrono::Local)
      .format("%Y-%m-%d %H:%M:%S")
      .to_string();

    let mut lines = vec![Self::field("Title", Span::raw(draft.title.clone()))];
    if let Some(err) = self.save.error() {
      for message in err.field_errors("title") {
        lines.push(Line::styled(
          format!("{:<10}{}", "", message),
          Style::default().fg(Color::Red),
        ));
      }
    }
    lines.extend([
      Self::field(
        "Status",
        Span::styled(
          draft.status.as_str(),
          Style::default().fg(status_color(draft.status)),
        ),
      ),
      Self::field(
        "Priority",
        Span::styled(
          draft.priority.as_str(),
          Style::default().fg(priority_color(draft.priority)),
        ),
      ),
      Self::field("Updated", Span::raw(updated)),
      Line::from(""),
    ]);

    if self.save.is_pending() {
      lines.push(Line::styled("Saving...", Style::default().fg(Color::Yellow)));
    } else if self.delete.is_pending() {
      lines.push(Line::styled("Deleting...", Style::default().fg(Color::Yellow)));
    } else if let Some(err) = self.save.error().or(self.delete.error()) {
      lines.extend(error_text(err));
    } else if self.controller.is_dirty() {
      lines.push(Line::styled(
        "Unsaved changes. 'w' to save, 'u' to undo.",
        Style::default().fg(Color::Yellow),
      ));
    } else if let MutationState::Success(_) = self.save.state() {
      lines.push(Line::styled("Saved.", Style::default().fg(Color::Green)));
    }

    lines
  }
}

impl View for IncidentDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.confirm.is_active() {
      if let KeyResult::Event(ConfirmEvent::Yes) = self.confirm.handle_key(key) {
        self.delete.start(self.controller.delete());
      }
      return ViewAction::None;
    }

    if self.title_prompt.is_active() {
      if let KeyResult::Event(PromptEvent::Submitted(title)) = self.title_prompt.handle_key(key) {
        self.controller.edit(|d| d.title = title);
      }
      return ViewAction::None;
    }

    let busy = self.save.is_pending() || self.delete.is_pending();
    match key.code {
      KeyCode::Char('e') if !busy => {
        if let Some(draft) = self.controller.current() {
          self.title_prompt.open("Title", &draft.title);
        }
      }
      KeyCode::Char('s') if !busy => self.controller.edit(|d| d.status = d.status.cycle()),
      KeyCode::Char('p') if !busy => self.controller.edit(|d| d.priority = d.priority.cycle()),
      KeyCode::Char('u') if !busy => {
        self.controller.discard();
        self.save.reset();
      }
      KeyCode::Char('w') if !busy => self.submit_save(),
      KeyCode::Char('x') if !busy => {
        if self.controller.loaded().is_some() {
          self
            .confirm
            .ask(format!("Delete incident #{}?", self.controller.id()));
        }
      }
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let mut title = format!(" Incident #{} ", self.controller.id());
    if self.controller.is_dirty() {
      title = format!(" Incident #{} (modified) ", self.controller.id());
    }
    if self.query.is_fetching() && self.query.data().is_some() {
      title.push_str("⟳ ");
    }

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let content: Vec<Line> = match (self.query.data(), self.controller.current()) {
      (Some(incident), Some(draft)) => self.render_form(&draft, incident),
      _ => match self.query.error() {
        Some(err) if err.is_not_found() => vec![Line::styled(
          format!("Incident #{} was not found.", self.controller.id()),
          Style::default().fg(Color::Red),
        )],
        Some(err) => {
          let mut lines = error_text(err);
          lines.push(Line::from("Press 'r' to retry."));
          lines
        }
        None => vec![Line::styled(
          "Loading incident...",
          Style::default().fg(Color::DarkGray),
        )],
      },
    };

    let paragraph = Paragraph::new(content)
      .block(block)
      .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);

    self.title_prompt.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("#{}", self.controller.id())
  }

  fn is_capturing_input(&self) -> bool {
    self.title_prompt.is_active() || self.confirm.is_active()
  }

  fn wants_close(&self) -> bool {
    self.closed
  }

  fn tick(&mut self) {
    self.query.poll();
    self.poll_mutations();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").order(10),
      Shortcut::new("e", "title").order(20),
      Shortcut::new("s", "status").order(21),
      Shortcut::new("p", "priority").order(22),
      Shortcut::new("w", "save").order(30),
      Shortcut::new("u", "undo").order(31),
      Shortcut::new("x", "delete").order(40),
      Shortcut::new("r", "refresh").order(50),
      Shortcut::new("q", "back").order(90),
      Shortcut::new("Enter", "apply").in_overlay(),
      Shortcut::new("Esc", "cancel").in_overlay(),
    ]
  }
}

use crate::api::types::Incident;
use crate::app::AppContext;
use crate::incidents::{IncidentListController, IncidentPage};
use crate::query::{Mutation, MutationState, Query, QueryState};
use crate::ui::components::{Confirm, ConfirmEvent, KeyResult, Prompt, PromptEvent};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{error_text, priority_color, status_color, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::IncidentDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};

/// Paged, sortable incident table with create and delete
pub struct IncidentListView {
  ctx: AppContext,
  controller: IncidentListController,
  query: Query<IncidentPage>,
  table_state: TableState,
  create_prompt: Prompt,
  confirm: Confirm,
  create: Mutation<Incident>,
  delete: Mutation<()>,
  /// Incident waiting on the delete confirmation
  pending_delete: Option<u64>,
  notice: Option<String>,
}

impl IncidentListView {
  pub fn new(ctx: AppContext) -> Self {
    let controller = IncidentListController::new(
      ctx.incidents.clone(),
      ctx.cache.clone(),
      ctx.config.incidents.page_size,
    );
    let mut query = Query::new(ctx.cache.clone(), controller.key(), controller.fetcher());
    query.fetch();

    Self {
      ctx,
      controller,
      query,
      table_state: TableState::default(),
      create_prompt: Prompt::new(),
      confirm: Confirm::new(),
      create: Mutation::new(),
      delete: Mutation::new(),
      pending_delete: None,
      notice: None,
    }
  }

  fn incidents(&self) -> &[Incident] {
    self.query.data().map(|p| p.items.as_slice()).unwrap_or(&[])
  }

  fn total_pages(&self) -> u32 {
    self.query.data().map(|p| p.total_pages).unwrap_or(1)
  }

  fn selected(&self) -> Option<&Incident> {
    self
      .table_state
      .selected()
      .and_then(|idx| self.incidents().get(idx))
  }

  /// Re-point the query after paging or sort state changed.
  fn reload(&mut self) {
    self
      .query
      .switch(self.controller.key(), self.controller.fetcher());
  }

  fn create_title(&self) -> String {
    format!("New incident [{}]  Tab: priority", self.controller.form.priority)
  }

  fn submit_create(&mut self, title: String) {
    self.controller.form.title = title;
    match self.controller.submit_create() {
      Ok(request) => {
        self.create.start(request);
      }
      Err(err) => self.create.reject(err),
    }
  }

  fn ask_delete(&mut self) {
    if self.delete.is_pending() {
      self.notice = Some("A delete is still in progress".to_string());
      return;
    }
    let Some(incident) = self.selected() else {
      return;
    };
    let (id, title) = (incident.id, truncate(&incident.title, 40));
    self.pending_delete = Some(id);
    self.confirm.ask(format!("Delete incident #{} \"{}\"?", id, title));
  }

  fn poll_mutations(&mut self) {
    if let Some(state) = self.create.poll() {
      if let MutationState::Success(created) = state {
        self.notice = Some(format!("Created incident #{}", created.id));
        self.controller.created();
        self.table_state.select(Some(0));
        self.reload();
      }
    }

    if let Some(MutationState::Success(())) = self.delete.poll() {
      self.notice = Some("Incident deleted".to_string());
    }
  }

  /// Pull the page back in range once a fetch shows the list shrank.
  fn clamp_page(&mut self) {
    if self.query.is_placeholder() {
      return;
    }
    let total_pages = match self.query.data() {
      Some(page) => page.total_pages,
      None => return,
    };
    if self.controller.clamp_to(total_pages) {
      self.reload();
    }
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.incidents().len();
    ensure_valid_selection(&mut self.table_state, len);

    let query = self.controller.query();
    let sort = format!("{} {}", query.sort_by.label(), query.sort_dir);
    let title = match self.query.state() {
      QueryState::Loading if self.query.data().is_none() => " Incidents (loading...) ".to_string(),
      QueryState::Error(_) => " Incidents (error) ".to_string(),
      _ => {
        let total = self.query.data().map(|p| p.total).unwrap_or(0);
        let busy = if self.query.is_fetching() { " ⟳" } else { "" };
        format!(
          " Incidents  Page {} / {}  Total {}  Sort: {}{} ",
          self.controller.page(),
          self.total_pages(),
          total,
          sort,
          busy
        )
      }
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.incidents().is_empty() {
      let content: Vec<Line> = if let Some(err) = self.query.error() {
        let mut lines = error_text(err);
        lines.push(Line::from("Press 'r' to retry."));
        lines
      } else if self.query.is_loading() {
        vec![Line::from("Loading incidents...")]
      } else {
        vec![Line::from("No incidents. Press 'c' to create one.")]
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let rows: Vec<Row> = self
      .incidents()
      .iter()
      .map(|incident| {
        let updated = incident
          .updated_utc
          .with_timezone(&chrono::Local)
          .format("%Y-%m-%d %H:%M")
          .to_string();
        Row::new(vec![
          Cell::from(format!("#{}", incident.id)).style(Style::default().fg(Color::Cyan)),
          Cell::from(truncate(&incident.title, 60)),
          Cell::from(incident.status.as_str())
            .style(Style::default().fg(status_color(incident.status))),
          Cell::from(incident.priority.as_str())
            .style(Style::default().fg(priority_color(incident.priority))),
          Cell::from(updated).style(Style::default().fg(Color::DarkGray)),
        ])
      })
      .collect();

    let widths = [
      Constraint::Length(8),
      Constraint::Min(20),
      Constraint::Length(12),
      Constraint::Length(4),
      Constraint::Length(17),
    ];
    let header = Row::new(vec!["ID", "TITLE", "STATUS", "PRI", "UPDATED"])
      .style(Style::default().fg(Color::Yellow).bold());

    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }

  /// Bottom strip: latest mutation error, or a notice.
  fn render_status(&self, frame: &mut Frame, area: Rect) {
    let lines = if let Some(err) = self.create.error().or(self.delete.error()) {
      error_text(err)
    } else if let Some(notice) = &self.notice {
      vec![Line::styled(notice.clone(), Style::default().fg(Color::Green))]
    } else {
      Vec::new()
    };
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
  }

  fn status_height(&self) -> u16 {
    match self.create.error().or(self.delete.error()) {
      Some(err) => 1 + err.error_lines().len() as u16,
      None => u16::from(self.notice.is_some()),
    }
  }
}

impl View for IncidentListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.confirm.is_active() {
      if let KeyResult::Event(ConfirmEvent::Yes) = self.confirm.handle_key(key) {
        if let Some(id) = self.pending_delete.take() {
          self.notice = None;
          self.delete.start(self.controller.delete(id));
        }
      } else if !self.confirm.is_active() {
        self.pending_delete = None;
      }
      return ViewAction::None;
    }

    if self.create_prompt.is_active() {
      if key.code == KeyCode::Tab {
        self.controller.form.priority = self.controller.form.priority.cycle();
        let title = self.create_title();
        self.create_prompt.set_title(&title);
        return ViewAction::None;
      }
      match self.create_prompt.handle_key(key) {
        KeyResult::Event(PromptEvent::Submitted(title)) => self.submit_create(title),
        KeyResult::Event(PromptEvent::Cancelled) => {
          self.controller.form.title.clear();
        }
        _ => {}
      }
      return ViewAction::None;
    }

    let fetching = self.query.is_fetching();
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('n') | KeyCode::Right => {
        if self.controller.next_page(self.total_pages(), fetching) {
          self.reload();
        }
      }
      KeyCode::Char('p') | KeyCode::Left => {
        if self.controller.prev_page(fetching) {
          self.reload();
        }
      }
      KeyCode::Char('s') => {
        let next = self.controller.query().sort_by.cycle();
        self.controller.set_sort_by(next);
        self.reload();
      }
      KeyCode::Char('d') => {
        let next = self.controller.query().sort_dir.toggle();
        self.controller.set_sort_dir(next);
        self.reload();
      }
      KeyCode::Char('c') => {
        if !self.create.is_pending() {
          self.create.reset();
          self.notice = None;
          let title = self.create_title();
          let initial = self.controller.form.title.clone();
          self.create_prompt.open(&title, &initial);
        }
      }
      KeyCode::Char('x') | KeyCode::Delete => self.ask_delete(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Enter => {
        if let Some(incident) = self.selected() {
          let raw_id = incident.id.to_string();
          if let Ok(view) = IncidentDetailView::open(&raw_id, self.ctx.clone()) {
            return ViewAction::Push(Box::new(view));
          }
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(3), Constraint::Length(self.status_height())])
      .split(area);

    self.render_table(frame, chunks[0]);
    self.render_status(frame, chunks[1]);
    self.create_prompt.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Incidents".to_string()
  }

  fn is_capturing_input(&self) -> bool {
    self.create_prompt.is_active() || self.confirm.is_active()
  }

  fn tick(&mut self) {
    self.query.poll();
    self.clamp_page();
    self.poll_mutations();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").order(10),
      Shortcut::new("n/p", "page").order(20),
      Shortcut::new("s", "sort").order(30),
      Shortcut::new("d", "direction").order(31),
      Shortcut::new("c", "create").order(40),
      Shortcut::new("x", "delete").order(41),
      Shortcut::new("r", "refresh").order(50),
      Shortcut::new("Enter", "submit").in_overlay(),
      Shortcut::new("Tab", "priority").in_overlay(),
      Shortcut::new("Esc", "cancel").in_overlay(),
    ]
  }
}

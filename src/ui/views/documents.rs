use std::path::PathBuf;

use crate::api::types::{DocumentSummary, IngestResponse};
use crate::api::ApiError;
use crate::app::AppContext;
use crate::documents::{read_ingest_file, DocumentsController};
use crate::query::{Mutation, MutationState, Query};
use crate::ui::components::{KeyResult, Prompt, PromptEvent};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{error_text, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptFor {
  Ingest,
  Tenant,
}

/// Tenant document list with file ingestion
pub struct DocumentsView {
  controller: DocumentsController,
  query: Query<Vec<DocumentSummary>>,
  table_state: TableState,
  prompt: Prompt,
  prompt_for: PromptFor,
  ingest: Mutation<IngestResponse>,
  tenant_error: Option<ApiError>,
}

impl DocumentsView {
  pub fn new(ctx: AppContext) -> Self {
    let controller = DocumentsController::new(
      ctx.documents.clone(),
      ctx.cache.clone(),
      ctx.config.api.tenant_id.clone(),
    );
    let mut query = Query::new(ctx.cache, controller.key(), controller.fetcher());
    query.fetch();

    Self {
      controller,
      query,
      table_state: TableState::default(),
      prompt: Prompt::new(),
      prompt_for: PromptFor::Ingest,
      ingest: Mutation::new(),
      tenant_error: None,
    }
  }

  fn documents(&self) -> &[DocumentSummary] {
    self.query.data().map(|d| d.as_slice()).unwrap_or(&[])
  }

  fn open_prompt(&mut self, prompt_for: PromptFor) {
    self.prompt_for = prompt_for;
    match prompt_for {
      PromptFor::Ingest => self.prompt.open("File to ingest", ""),
      PromptFor::Tenant => {
        let tenant = self.controller.tenant().to_string();
        self.prompt.open("Tenant", &tenant);
      }
    }
  }

  fn submit(&mut self, value: String) {
    match self.prompt_for {
      PromptFor::Ingest => self.start_ingest(value),
      PromptFor::Tenant => match self.controller.set_tenant(&value) {
        Ok(()) => {
          self.tenant_error = None;
          self.ingest.reset();
          self
            .query
            .switch(self.controller.key(), self.controller.fetcher());
        }
        Err(err) => self.tenant_error = Some(err),
      },
    }
  }

  fn start_ingest(&mut self, path: String) {
    let path = path.trim();
    if path.is_empty() {
      self.ingest.reject(ApiError::validation("File path is required"));
      return;
    }

    let path = PathBuf::from(path);
    let controller = self.controller.clone();
    self.ingest.start(async move {
      let req = read_ingest_file(&path).await?;
      controller.submit_ingest(req)?.await
    });
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.documents().len();
    ensure_valid_selection(&mut self.table_state, len);

    let busy = if self.query.is_fetching() { " ⟳" } else { "" };
    let title = format!(
      " Documents [{}] ({}){} ",
      self.controller.tenant(),
      len,
      busy
    );
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 {
      let content: Vec<Line> = match self.query.error() {
        Some(err) => error_text(err),
        None if self.query.is_loading() => vec![Line::from("Loading documents...")],
        None => vec![Line::from("No documents. Press 'i' to ingest a file.")],
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let rows: Vec<Row> = self
      .documents()
      .iter()
      .map(|doc| {
        let created = doc
          .created_utc
          .with_timezone(&chrono::Local)
          .format("%Y-%m-%d %H:%M")
          .to_string();
        Row::new(vec![
          Cell::from(truncate(&doc.id, 12)).style(Style::default().fg(Color::Cyan)),
          Cell::from(truncate(&doc.file_name, 40)),
          Cell::from(doc.source.clone().unwrap_or_default()),
          Cell::from(doc.original_length.to_string()),
          Cell::from(created).style(Style::default().fg(Color::DarkGray)),
        ])
      })
      .collect();

    let widths = [
      Constraint::Length(12),
      Constraint::Min(20),
      Constraint::Length(10),
      Constraint::Length(10),
      Constraint::Length(17),
    ];
    let header = Row::new(vec!["ID", "FILE", "SOURCE", "LENGTH", "CREATED"])
      .style(Style::default().fg(Color::Yellow).bold());

    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .row_highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }

  fn status_lines(&self) -> Vec<Line<'static>> {
    if let Some(err) = &self.tenant_error {
      return error_text(err);
    }
    match self.ingest.state() {
      MutationState::Idle => Vec::new(),
      MutationState::Pending => vec![Line::styled(
        "Ingesting...",
        Style::default().fg(Color::Yellow),
      )],
      MutationState::Error(err) => error_text(err),
      MutationState::Success(done) => vec![Line::styled(
        format!(
          "Ingested {} as {}: {} chunks from {} chars (tenant {})",
          done.file_name, done.document_id, done.chunk_count, done.original_length, done.tenant_id
        ),
        Style::default().fg(Color::Green),
      )],
    }
  }
}

impl View for DocumentsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.prompt.is_active() {
      if let KeyResult::Event(PromptEvent::Submitted(value)) = self.prompt.handle_key(key) {
        self.submit(value);
      }
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('i') if !self.ingest.is_pending() => self.open_prompt(PromptFor::Ingest),
      KeyCode::Char('t') => self.open_prompt(PromptFor::Tenant),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let status = self.status_lines();
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Min(3),
        Constraint::Length(status.len() as u16),
      ])
      .split(area);

    self.render_table(frame, chunks[0]);
    frame.render_widget(Paragraph::new(status).wrap(Wrap { trim: true }), chunks[1]);
    self.prompt.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("Documents [{}]", self.controller.tenant())
  }

  fn tenant(&self) -> Option<&str> {
    Some(self.controller.tenant())
  }

  fn is_capturing_input(&self) -> bool {
    self.prompt.is_active()
  }

  fn tick(&mut self) {
    self.query.poll();
    self.ingest.poll();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").order(10),
      Shortcut::new("i", "ingest").order(20),
      Shortcut::new("t", "tenant").order(30),
      Shortcut::new("r", "refresh").order(40),
      Shortcut::new("Enter", "submit").in_overlay(),
      Shortcut::new("Esc", "cancel").in_overlay(),
    ]
  }
}

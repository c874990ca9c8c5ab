use crate::api::{DocumentsClient, Gateway, IncidentsClient, StatusClient};
use crate::cache::QueryCache;
use crate::commands::Invocation;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{DocumentsView, IncidentDetailView, IncidentListView, StatusView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{info, warn};

/// Everything a view needs to build controllers: config, the shared cache
/// and the resource clients.
#[derive(Clone)]
pub struct AppContext {
  pub config: Config,
  pub cache: QueryCache,
  pub incidents: IncidentsClient,
  pub documents: DocumentsClient,
  pub status: StatusClient,
}

impl AppContext {
  pub fn new(config: Config, gateway: Gateway) -> Self {
    Self {
      config,
      cache: QueryCache::new(),
      incidents: IncidentsClient::new(gateway.clone()),
      documents: DocumentsClient::new(gateway.clone()),
      status: StatusClient::new(gateway),
    }
  }
}

/// Main application state
pub struct App {
  ctx: AppContext,

  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  command_input: CommandInput,

  /// Result of the last command, shown in the footer
  message: Option<String>,

  should_quit: bool,
}

impl App {
  pub fn new(ctx: AppContext) -> Self {
    let root: Box<dyn View> = Box::new(IncidentListView::new(ctx.clone()));
    Self {
      ctx,
      view_stack: vec![root],
      command_input: CommandInput::new(),
      message: None,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.main_loop(&mut terminal).await;

    // Restore the terminal even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(250));

    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Resize) => {}
        Some(Event::Tick) => {}
        None => break,
      }
      self.tick();
    }

    Ok(())
  }

  fn tick(&mut self) {
    if let Some(view) = self.view_stack.last_mut() {
      view.tick();
      if view.wants_close() {
        self.pop_view();
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let capturing = self
      .view_stack
      .last()
      .map(|v| v.is_capturing_input())
      .unwrap_or(false);

    if !capturing {
      match self.command_input.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(invocation)) => {
          self.execute_command(invocation);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };

    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        self.message = None;
        self.view_stack.push(view);
      }
      ViewAction::Pop => self.pop_view(),
    }
  }

  /// Go back; popping the root view quits.
  fn pop_view(&mut self) {
    if self.view_stack.len() > 1 {
      self.view_stack.pop();
    } else {
      self.should_quit = true;
    }
  }

  fn set_root(&mut self, view: Box<dyn View>) {
    self.view_stack.clear();
    self.view_stack.push(view);
  }

  fn execute_command(&mut self, invocation: Invocation) {
    self.message = None;
    match invocation.name.as_str() {
      "incidents" => self.set_root(Box::new(IncidentListView::new(self.ctx.clone()))),
      "incident" => match IncidentDetailView::open(&invocation.args, self.ctx.clone()) {
        Ok(view) => self.view_stack.push(Box::new(view)),
        Err(err) => self.message = Some(err.to_string()),
      },
      "documents" => self.set_root(Box::new(DocumentsView::new(self.ctx.clone()))),
      "status" => self.set_root(Box::new(StatusView::new(self.ctx.clone()))),
      "reset" => {
        info!("cache reset");
        self.ctx.cache.clear();
        self.set_root(Box::new(IncidentListView::new(self.ctx.clone())));
        self.message = Some("Cache cleared".to_string());
      }
      "quit" => self.should_quit = true,
      "" => {}
      other => {
        warn!(command = other, "unknown command");
        self.message = Some(format!("Unknown command: {}", other));
      }
    }
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Main content
        Constraint::Length(1), // Footer
      ])
      .split(frame.area());

    let breadcrumb: Vec<String> = self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect();

    if let Some(view) = self.view_stack.last_mut() {
      let tenant = view
        .tenant()
        .unwrap_or(&self.ctx.config.api.tenant_id)
        .to_string();
      let overlay_open = view.is_capturing_input();
      draw_header(
        frame,
        chunks[0],
        &self.ctx.config.api.base_url,
        &tenant,
        &view.shortcuts(),
        overlay_open,
      );
      view.render(frame, chunks[1]);
    }

    draw_footer(frame, chunks[2], &breadcrumb, self.message.as_deref());
    self.command_input.render_overlay(frame, chunks[1]);
  }
}

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use minigpt_session::StorageBackend;

use crate::controller::{Controller, ControllerError};

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];
const PAGE_ROWS: usize = 10;

/// Terminal-side state around the [`Controller`]
pub struct App<B: StorageBackend> {
    pub controller: Controller<B>,
    pub input: String,
    pub status: Option<String>,
    pub server_url: String,
    /// Rows scrolled up from the bottom of the message pane
    pub scroll_offset: usize,
    tick: usize,
}

impl<B: StorageBackend> App<B> {
    pub fn new(controller: Controller<B>, server_url: impl Into<String>) -> Self {
        Self {
            controller,
            input: String::new(),
            status: None,
            server_url: server_url.into(),
            scroll_offset: 0,
            tick: 0,
        }
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER[self.tick % SPINNER.len()]
    }

    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn scroll_page_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(PAGE_ROWS);
    }

    pub fn scroll_page_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(PAGE_ROWS);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    /// Apply finished work from background tasks
    pub fn process_events(&mut self) {
        if self.controller.drain_events() > 0 {
            if let Some(error) = self.controller.last_error() {
                self.status = Some(format!("Error: {}", error));
            }
        }
    }

    pub fn send_message(&mut self) {
        match self.controller.send_message(&self.input) {
            Ok(()) => {
                self.input.clear();
                self.status = None;
                self.scroll_to_bottom();
            }
            Err(ControllerError::EmptyMessage) => {}
            Err(e @ ControllerError::Busy) => self.status = Some(e.to_string()),
        }
    }

    /// Returns `true` when the app should quit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => return true,
            KeyCode::Char('n') if ctrl => {
                self.controller.new_conversation();
                self.status = None;
                self.scroll_to_bottom();
            }
            KeyCode::Char('d') if ctrl => {
                if let Some(id) = self.controller.current().map(|c| c.id.clone()) {
                    self.controller.delete_conversation(&id);
                    self.scroll_to_bottom();
                }
            }
            KeyCode::Up => {
                self.controller.select_relative(-1);
                self.scroll_to_bottom();
            }
            KeyCode::Down => {
                self.controller.select_relative(1);
                self.scroll_to_bottom();
            }
            KeyCode::PageUp => self.scroll_page_up(),
            KeyCode::PageDown => self.scroll_page_down(),
            KeyCode::Tab => {
                self.controller.cycle_model();
                self.status = Some(format!("Model: {}", self.controller.model()));
            }
            KeyCode::Enter => self.send_message(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Esc => self.input.clear(),
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
        false
    }
}

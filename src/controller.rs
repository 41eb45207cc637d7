use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, PanelConfig, PanelError};
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &PanelConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self) -> Result<Option<Message>, PanelError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => self.handle_key(key),
                Event::Resize(width, height) => {
                    Some(Message::Resize(width as usize, height as usize))
                }
                _ => None,
            });
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(Message::MoveDown),
            (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(Message::MoveUp),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::Char('g'), _) | (KeyCode::Home, _) => Some(Message::MoveBeginning),
            (KeyCode::Char('G'), _) | (KeyCode::End, _) => Some(Message::MoveEnd),
            (KeyCode::Tab, _) => Some(Message::NextTable),
            (KeyCode::BackTab, _) => Some(Message::PreviousTable),
            (KeyCode::Char(' '), _) => Some(Message::ToggleSelection),
            (KeyCode::Char('a'), _) => Some(Message::SelectAll),
            (KeyCode::Char('r'), _) => Some(Message::Refresh),
            (KeyCode::Char('d'), _) | (KeyCode::Delete, _) => Some(Message::DeleteSelected),
            (KeyCode::Char('s'), _) => Some(Message::Settings),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

use std::io;

use derive_setters::Setters;
use serde::Deserialize;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Unable to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Unable to read seed data: {0}")]
    SeedError(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

/// UI knobs. Loaded from the `[ui]` section of the config file.
#[derive(Debug, Clone, Deserialize, Setters)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct PanelConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    NextTable,
    PreviousTable,
    ToggleSelection,
    SelectAll,
    Refresh,
    DeleteSelected,
    Settings,
    Help,
    Exit,
    Resize(usize, usize),
}

pub const HELP_TEXT: &str = "\
 q            Quit
 j / Down     Move down
 k / Up       Move up
 PgDn / PgUp  Move one page
 g / G        First / last row
 Tab          Next table
 Shift+Tab    Previous table
 Space        Select / deselect row
 a            Select all / clear selection
 r            Refresh table
 d / Del      Delete selected rows
 s            Settings
 ?            This help
 Esc          Close popup";

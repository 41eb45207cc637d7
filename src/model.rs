use tracing::{info, trace};

use crate::domain::{HELP_TEXT, Message, PanelConfig, PanelError};
use crate::ui::{STATUSLINE_HEIGHT, TABLE_HEADER_HEIGHT, TABS_HEIGHT, TOOLBAR_HEIGHT};
use crate::view::{TableRender, TableView};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let table_height = ui_height
            .saturating_sub(TABS_HEIGHT + TOOLBAR_HEIGHT + TABLE_HEADER_HEIGHT + STATUSLINE_HEIGHT)
            .max(1);
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_height,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

/// Borrowed snapshot of everything the UI draws.
pub struct UIData<'a> {
    pub tables: Vec<&'a str>,
    pub active: usize,
    pub table: &'a TableRender,
    pub cursor: usize,
    pub status_message: &'a str,
    pub popup_message: Option<&'a str>,
}

pub struct Model {
    config: PanelConfig,
    pub status: Status,
    modus: Modus,
    views: Vec<TableView>,
    cursors: Vec<usize>, // Cursor row per table
    active: usize,
    uilayout: UILayout,
    status_message: String,
}

impl Model {
    pub fn init(
        config: &PanelConfig,
        views: Vec<TableView>,
        ui_width: usize,
        ui_height: usize,
    ) -> Result<Self, PanelError> {
        if views.is_empty() {
            return Err(PanelError::ConfigError("no tables to show".into()));
        }
        let loaded: usize = views.iter().map(|v| v.repository().size()).sum();
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            cursors: vec![0; views.len()],
            views,
            active: 0,
            uilayout: UILayout::from_values(ui_width, ui_height),
            status_message: String::new(),
        };
        model.set_status_message(format!(
            "Loaded {} rows from {} tables",
            loaded,
            model.views.len()
        ));
        Ok(model)
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn get_uidata(&self) -> UIData<'_> {
        UIData {
            tables: self
                .views
                .iter()
                .map(|v| v.repository().table_name())
                .collect(),
            active: self.active,
            table: self.views[self.active].rendered(),
            cursor: self.cursors[self.active],
            status_message: &self.status_message,
            popup_message: (self.modus == Modus::POPUP).then_some(HELP_TEXT),
        }
    }

    pub fn active_view(&self) -> &TableView {
        &self.views[self.active]
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        trace!("Status: {}", self.status_message);
    }

    pub async fn update(&mut self, message: Option<Message>) -> Result<(), PanelError> {
        let Some(msg) = message else {
            return Ok(());
        };
        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_selection_down(1),
                Message::MoveUp => self.move_selection_up(1),
                Message::MovePageDown => self.move_selection_down(self.uilayout.table_height),
                Message::MovePageUp => self.move_selection_up(self.uilayout.table_height),
                Message::MoveBeginning => self.cursors[self.active] = 0,
                Message::MoveEnd => self.move_selection_end(),
                Message::NextTable => self.switch_table(1),
                Message::PreviousTable => self.switch_table(self.views.len() - 1),
                Message::ToggleSelection => {
                    let cursor = self.cursors[self.active];
                    self.views[self.active].toggle_row(cursor);
                }
                Message::SelectAll => self.views[self.active].select_all(),
                Message::Refresh => self.refresh().await,
                Message::DeleteSelected => self.delete_selected().await,
                Message::Settings => self.views[self.active].settings(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit => {}
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help => self.exit_popup(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    async fn refresh(&mut self) {
        let view = &mut self.views[self.active];
        view.refresh().await;
        let message = format!(
            "Loaded {} rows from {}",
            view.repository().size(),
            view.repository().table_name()
        );
        self.clamp_cursor();
        self.set_status_message(message);
    }

    async fn delete_selected(&mut self) {
        let view = &mut self.views[self.active];
        let message = match view.delete_selected().await {
            Some(outcome) => {
                info!(
                    "Deleted {} of {} selected rows from {}",
                    outcome.deleted.len(),
                    outcome.requested,
                    view.repository().table_name()
                );
                format!(
                    "Deleted {} of {} selected rows",
                    outcome.deleted.len(),
                    outcome.requested
                )
            }
            None => "Nothing selected".to_string(),
        };
        self.clamp_cursor();
        self.set_status_message(message);
    }

    fn show_help(&mut self) {
        self.modus = Modus::POPUP;
    }

    fn exit_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = Modus::TABLE;
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
    }

    fn switch_table(&mut self, step: usize) {
        self.active = (self.active + step) % self.views.len();
        self.set_status_message(format!(
            "Showing {}",
            self.views[self.active].repository().table_name()
        ));
    }

    fn nrows(&self) -> usize {
        self.views[self.active].rendered().rows.len()
    }

    fn clamp_cursor(&mut self) {
        let last = self.nrows().saturating_sub(1);
        let cursor = &mut self.cursors[self.active];
        *cursor = (*cursor).min(last);
    }

    fn move_selection_up(&mut self, size: usize) {
        let cursor = &mut self.cursors[self.active];
        *cursor = cursor.saturating_sub(size);
    }

    fn move_selection_down(&mut self, size: usize) {
        let last = self.nrows().saturating_sub(1);
        let cursor = &mut self.cursors[self.active];
        *cursor = std::cmp::min(*cursor + size, last);
    }

    fn move_selection_end(&mut self) {
        self.cursors[self.active] = self.nrows().saturating_sub(1);
    }
}
